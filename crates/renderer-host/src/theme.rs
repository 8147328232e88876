//! Color theme location, reading and conversion to editor rules.
//!
//! A theme is found by name among extension `themes` contributions. Its file
//! may pull token colors from another file (`tokenColors` as a path) and may
//! `include` a parent theme whose rules are appended after its own. The
//! resolved token colors are then flattened into one rule per scope key.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use futures::future::BoxFuture;
use log::{debug, info, warn};
use regex::Regex;
use renderer_protocol::{ThemeBase, ThemeDefinition, TokenRule};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::manifest::{find_package_manifests, ExtensionManifest};
use crate::resolver::{cached, read_json, ResolveError, Resolver};

/// Where a theme's root file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeLocation {
    pub root_file: PathBuf,
    /// The contribution declared `uiTheme: vs-dark`.
    pub is_dark: bool,
}

/// A theme file's classification, UI colors and token colors, with any
/// include chain already appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedColors {
    /// Raw `type` field (`dark`, `light`, `hc`, ...).
    pub kind: Option<String>,
    pub colors: BTreeMap<String, String>,
    pub token_colors: Vec<TokenColor>,
}

impl ResolvedColors {
    /// What an unreadable theme file resolves to.
    pub fn unreadable() -> Self {
        Self {
            kind: Some("vs".to_string()),
            colors: BTreeMap::new(),
            token_colors: Vec::new(),
        }
    }

    pub fn base(&self) -> ThemeBase {
        if self.kind.as_deref() == Some("dark") {
            ThemeBase::VsDark
        } else {
            ThemeBase::Vs
        }
    }
}

/// One `tokenColors` entry. A field of the wrong JSON type reads as absent,
/// so a bad color drops only that color and not the entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenColor {
    #[serde(default, deserialize_with = "lenient_scope")]
    pub scope: Option<ScopeValue>,
    #[serde(default, deserialize_with = "lenient_settings")]
    pub settings: Option<TokenSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeValue {
    /// Comma separated scope list.
    List(String),
    /// Scope names; non-string items are skipped when reading.
    Array(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSettings {
    #[serde(default, deserialize_with = "string_only")]
    pub foreground: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub background: Option<String>,
    #[serde(default, deserialize_with = "string_only")]
    pub font_style: Option<String>,
}

fn string_only<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_scope<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ScopeValue>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(list) => Some(ScopeValue::List(list)),
        Value::Array(items) => Some(ScopeValue::Array(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(scope) => Some(scope),
                    _ => None,
                })
                .collect(),
        )),
        _ => None,
    })
}

fn lenient_settings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<TokenSettings>, D::Error> {
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

impl TokenColor {
    /// Individual scope names, trimmed, empty ones dropped.
    pub fn scopes(&self) -> Vec<&str> {
        let parts: Vec<&str> = match &self.scope {
            Some(ScopeValue::List(list)) => list.split(',').collect(),
            Some(ScopeValue::Array(scopes)) => scopes.iter().map(String::as_str).collect(),
            None => Vec::new(),
        };
        parts
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// The fields of a theme file the reader uses. Polymorphic fields stay raw.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeFile {
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    #[serde(default)]
    colors: Option<Value>,
    #[serde(default)]
    token_colors: Option<Value>,
    #[serde(default)]
    settings: Option<Value>,
    #[serde(default)]
    include: Option<String>,
}

fn monaco_color() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#?([0-9A-Fa-f]{6})([0-9A-Fa-f]{2})?$").expect("valid regex"))
}

fn short_color() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#?([0-9A-Fa-f])([0-9A-Fa-f])([0-9A-Fa-f])$").expect("valid regex")
    })
}

/// Normalize a foreground color for the editor.
///
/// Six or eight hex digits pass through unchanged. Three digit shorthand is
/// expanded to `#rrggbb`. Anything else is dropped.
pub fn normalize_color(color: &str) -> Option<String> {
    if monaco_color().is_match(color) {
        return Some(color.to_string());
    }
    let caps = short_color().captures(color)?;
    let mut expanded = String::from("#");
    for digit in [&caps[1], &caps[2], &caps[3]] {
        expanded.push_str(digit);
        expanded.push_str(digit);
    }
    Some(expanded)
}

/// Extra key registered alongside `token`, with identical styling.
fn punctuation_alias(token: &str) -> Option<&'static str> {
    match token {
        "comment" => Some("punctuation.definition.comment"),
        "string" => Some("punctuation.definition.string"),
        _ => None,
    }
}

/// Convert resolved colors into the editor's theme definition.
pub fn generate(resolved: &ResolvedColors) -> ThemeDefinition {
    let mut seen: HashSet<String> = HashSet::new();
    let mut rules = Vec::new();

    for entry in &resolved.token_colors {
        let Some(settings) = &entry.settings else {
            continue;
        };
        let foreground = settings.foreground.as_deref().and_then(normalize_color);

        for scope in entry.scopes() {
            if !seen.insert(scope.to_string()) {
                continue;
            }
            let rule = TokenRule {
                token: scope.to_string(),
                foreground: foreground.clone(),
                background: settings.background.clone(),
                font_style: settings.font_style.clone(),
            };
            let alias = punctuation_alias(scope)
                .filter(|alias| seen.insert(alias.to_string()))
                .map(|alias| rule.with_token(alias));
            rules.push(rule);
            rules.extend(alias);
        }
    }

    rules.sort_by(|a, b| a.token.cmp(&b.token));

    ThemeDefinition {
        base: resolved.base(),
        inherit: false,
        colors: resolved.colors.clone(),
        rules,
    }
}

impl Resolver {
    /// Editor theme definition for `theme_name`, or the fallback definition
    /// when the theme cannot be found.
    pub async fn generate_theme(&self, theme_name: &str) -> ThemeDefinition {
        match self.find_token_colors(theme_name).await {
            Some(resolved) => {
                let theme = generate(&resolved);
                info!(
                    "[renderer-host] Generated theme {:?}: {} rules, {} colors",
                    theme_name,
                    theme.rules.len(),
                    theme.colors.len()
                );
                theme
            }
            None => {
                info!("[renderer-host] Theme {:?} not found, using fallback", theme_name);
                ThemeDefinition::fallback()
            }
        }
    }

    /// Resolved colors for `theme_name`. `None` when no root file is found
    /// or the root file is not a theme.
    pub async fn find_token_colors(&self, theme_name: &str) -> Option<ResolvedColors> {
        let location = self.find_theme(theme_name).await?;
        debug!(
            "[renderer-host] Loading theme {:?} from {:?} (dark: {})",
            theme_name, location.root_file, location.is_dark
        );
        match colors_from_root(&location.root_file, theme_name).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("[renderer-host] Failed to read theme {:?}: {}", theme_name, e);
                None
            }
        }
    }

    /// Locate the root file of `theme_name`. Memoized, failures included.
    pub async fn find_theme(&self, theme_name: &str) -> Option<ThemeLocation> {
        cached(&self.themes, theme_name, "theme", || async move {
            self.find_matching_theme(theme_name).await
        })
        .await
    }

    async fn find_matching_theme(
        &self,
        theme_name: &str,
    ) -> Result<Option<ThemeLocation>, ResolveError> {
        for extension in self.extensions.extensions() {
            if let Some(found) = theme_location(&extension.manifest, &extension.root, theme_name) {
                return found.map(Some);
            }
        }

        let manifests = find_package_manifests(&self.builtin_extensions_dir)
            .await
            .map_err(|source| ResolveError::Io {
                path: self.builtin_extensions_dir.clone(),
                source,
            })?;
        for path in manifests {
            let manifest = match ExtensionManifest::load(&path).await {
                Ok(manifest) => manifest,
                Err(e) => {
                    debug!("[renderer-host] Skipping {:?}: {}", path, e);
                    continue;
                }
            };
            let Some(dir) = path.parent() else {
                continue;
            };
            if let Some(found) = theme_location(&manifest, dir, theme_name) {
                return found.map(Some);
            }
        }
        Ok(None)
    }
}

/// Match `theme_name` against one manifest's theme contributions.
///
/// `Some(Err(_))` when a contribution matches but names no file.
pub fn theme_location(
    manifest: &ExtensionManifest,
    manifest_dir: &Path,
    theme_name: &str,
) -> Option<Result<ThemeLocation, ResolveError>> {
    let theme = manifest
        .contributions()?
        .themes
        .iter()
        .find(|theme| theme.matches(theme_name))?;
    let location = match &theme.path {
        Some(path) => Ok(ThemeLocation {
            root_file: manifest_dir.join(path),
            is_dark: theme.is_dark(),
        }),
        None => Err(ResolveError::MissingPath(format!("theme {:?}", theme_name))),
    };
    Some(location)
}

/// Read the theme's root file.
///
/// A root without `contributes` is itself a theme file. Otherwise its
/// `contributes.themes` entry with a matching `id` or `name` points at the
/// theme file.
pub async fn colors_from_root(
    root_file: &Path,
    theme_name: &str,
) -> Result<Option<ResolvedColors>, ResolveError> {
    let root: Value = read_json(root_file).await?;

    let Some(contributes) = root.get("contributes").filter(|c| !c.is_null()) else {
        let is_theme = ["tokenColors", "settings", "include"]
            .iter()
            .any(|key| root.get(*key).is_some_and(|v| !v.is_null()));
        if !is_theme {
            return Ok(None);
        }
        return Ok(Some(read_colors(root_file).await));
    };

    let entry = contributes
        .get("themes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|entry| {
            entry.get("id").and_then(Value::as_str) == Some(theme_name)
                || entry.get("name").and_then(Value::as_str) == Some(theme_name)
        });
    let Some(relative) = entry.and_then(|e| e.get("path")).and_then(Value::as_str) else {
        return Ok(None);
    };

    let dir = root_file.parent().unwrap_or_else(|| Path::new(""));
    let theme_file = dir.join(relative);
    info!("[renderer-host] Reading colors from {:?}", theme_file);
    Ok(Some(read_colors(&theme_file).await))
}

/// Read a theme file and its include chain. Never fails: an unreadable file
/// resolves to [`ResolvedColors::unreadable`].
pub async fn read_colors(theme_file: &Path) -> ResolvedColors {
    let mut visited = HashSet::new();
    read_colors_guarded(theme_file.to_path_buf(), &mut visited).await
}

fn read_colors_guarded(
    theme_file: PathBuf,
    visited: &mut HashSet<PathBuf>,
) -> BoxFuture<'_, ResolvedColors> {
    Box::pin(async move {
        match try_read_colors(&theme_file, visited).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("[renderer-host] Error reading theme file: {}", e);
                ResolvedColors::unreadable()
            }
        }
    })
}

async fn try_read_colors(
    theme_file: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<ResolvedColors, ResolveError> {
    let key = tokio::fs::canonicalize(theme_file)
        .await
        .unwrap_or_else(|_| theme_file.to_path_buf());
    if !visited.insert(key) {
        return Err(ResolveError::IncludeCycle(theme_file.to_path_buf()));
    }

    let theme: ThemeFile = read_json(theme_file).await?;
    let dir = theme_file.parent().unwrap_or_else(|| Path::new(""));

    let mut token_colors = match theme.token_colors {
        Some(Value::String(relative)) => {
            let referenced: Value = read_json(&dir.join(relative)).await?;
            token_colors_from(referenced)
        }
        Some(inline) => entries(inline),
        None => Vec::new(),
    };
    if token_colors.is_empty() {
        if let Some(settings) = theme.settings {
            token_colors = entries(settings);
        }
    }

    if let Some(include) = theme.include {
        let included = read_colors_guarded(dir.join(include), visited).await;
        token_colors.extend(included.token_colors);
    }

    Ok(ResolvedColors {
        kind: theme.kind.and_then(|k| k.as_str().map(str::to_string)),
        colors: string_colors(theme.colors),
        token_colors,
    })
}

/// Token colors from a referenced file: a bare array, or an object with
/// `tokenColors` or `settings`.
fn token_colors_from(value: Value) -> Vec<TokenColor> {
    match value {
        Value::Array(_) => entries(value),
        Value::Object(mut map) => {
            let colors = map.remove("tokenColors").map(entries).unwrap_or_default();
            if colors.is_empty() {
                map.remove("settings").map(entries).unwrap_or_default()
            } else {
                colors
            }
        }
        _ => Vec::new(),
    }
}

/// Well-formed entries of a JSON array.
fn entries(value: Value) -> Vec<TokenColor> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

fn string_colors(value: Option<Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(color) => Some((key, color)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{InstalledExtension, StaticExtensions};
    use serde_json::json;
    use std::sync::Arc;

    fn write_json(path: &Path, value: Value) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn token(scope: Value, foreground: &str) -> TokenColor {
        serde_json::from_value(json!({ "scope": scope, "settings": { "foreground": foreground } }))
            .unwrap()
    }

    fn resolved(kind: &str, token_colors: Vec<TokenColor>) -> ResolvedColors {
        ResolvedColors {
            kind: Some(kind.to_string()),
            colors: BTreeMap::new(),
            token_colors,
        }
    }

    fn theme_extension(root: &Path, label: &str, file: &str, contents: Value) -> InstalledExtension {
        write_json(&root.join(file), contents);
        let manifest = json!({
            "name": "test-theme",
            "publisher": "tests",
            "contributes": { "themes": [
                { "label": label, "uiTheme": "vs-dark", "path": format!("./{}", file) }
            ] }
        });
        write_json(&root.join("package.json"), manifest.clone());
        InstalledExtension::new(
            root,
            ExtensionManifest::parse(&manifest.to_string()).unwrap(),
        )
    }

    fn resolver(extensions: Vec<InstalledExtension>, builtin: &Path) -> Resolver {
        Resolver::new(Arc::new(StaticExtensions(extensions)), builtin.to_path_buf())
    }

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color("abc").as_deref(), Some("#aabbcc"));
        assert_eq!(normalize_color("#F0a").as_deref(), Some("#FF00aa"));
        assert_eq!(normalize_color("#AABBCC").as_deref(), Some("#AABBCC"));
        assert_eq!(normalize_color("aabbccdd").as_deref(), Some("aabbccdd"));
        assert_eq!(normalize_color("zzzzzz"), None);
        assert_eq!(normalize_color("#abcd"), None);
        assert_eq!(normalize_color(""), None);
    }

    #[test]
    fn test_scopes_split_and_trim() {
        let entry = token(json!("comment, string.quoted ,,keyword"), "#fff");
        assert_eq!(entry.scopes(), vec!["comment", "string.quoted", "keyword"]);

        let entry = token(json!(["a", " b ", ""]), "#fff");
        assert_eq!(entry.scopes(), vec!["a", "b"]);

        let entry = TokenColor::default();
        assert!(entry.scopes().is_empty());
    }

    #[test]
    fn test_generate_base_and_inherit() {
        assert_eq!(generate(&resolved("dark", vec![])).base, ThemeBase::VsDark);
        assert_eq!(generate(&resolved("light", vec![])).base, ThemeBase::Vs);
        assert_eq!(generate(&ResolvedColors::default()).base, ThemeBase::Vs);
        assert!(!generate(&resolved("dark", vec![])).inherit);
    }

    #[test]
    fn test_generate_first_occurrence_wins() {
        let theme = generate(&resolved(
            "dark",
            vec![token(json!("comment"), "#111111"), token(json!("comment"), "#222222")],
        ));

        let tokens: Vec<_> = theme.rules.iter().map(|r| r.token.as_str()).collect();
        assert_eq!(tokens, vec!["comment", "punctuation.definition.comment"]);
        for rule in &theme.rules {
            assert_eq!(rule.foreground.as_deref(), Some("#111111"));
        }
    }

    #[test]
    fn test_generate_string_alias_and_sorting() {
        let theme = generate(&resolved(
            "dark",
            vec![
                token(json!("variable, string"), "#123"),
                token(json!(["keyword", "constant"]), "#abcdef"),
            ],
        ));

        let tokens: Vec<_> = theme.rules.iter().map(|r| r.token.as_str()).collect();
        assert_eq!(
            tokens,
            vec![
                "constant",
                "keyword",
                "punctuation.definition.string",
                "string",
                "variable"
            ]
        );
        assert_eq!(
            theme.rule("punctuation.definition.string").unwrap().foreground.as_deref(),
            Some("#112233")
        );
    }

    #[test]
    fn test_generate_explicit_alias_keeps_its_own_styling() {
        let theme = generate(&resolved(
            "dark",
            vec![
                token(json!("punctuation.definition.comment"), "#000000"),
                token(json!("comment"), "#ffffff"),
            ],
        ));
        assert_eq!(theme.rules.len(), 2);
        assert_eq!(
            theme.rule("punctuation.definition.comment").unwrap().foreground.as_deref(),
            Some("#000000")
        );
    }

    #[test]
    fn test_generate_drops_invalid_foreground_only() {
        let entry: TokenColor = serde_json::from_value(json!({
            "scope": "markup.bold",
            "settings": { "foreground": "bold-red", "background": "#000000", "fontStyle": "bold" }
        }))
        .unwrap();
        let theme = generate(&resolved("light", vec![entry]));

        let rule = theme.rule("markup.bold").unwrap();
        assert_eq!(rule.foreground, None);
        assert_eq!(rule.background.as_deref(), Some("#000000"));
        assert_eq!(rule.font_style.as_deref(), Some("bold"));
        assert_eq!(
            serde_json::to_value(rule).unwrap(),
            json!({ "token": "markup.bold", "background": "#000000", "fontStyle": "bold" })
        );
    }

    #[tokio::test]
    async fn test_non_string_fields_drop_only_that_field() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("theme.json");
        write_json(
            &file,
            json!({
                "type": "dark",
                "tokenColors": [
                    { "scope": "comment", "settings": { "foreground": 123, "fontStyle": "italic" } },
                    { "scope": ["keyword", 7, "storage"], "settings": { "foreground": "#ffffff" } },
                    { "scope": "string", "settings": { "foreground": "#ce9178", "background": false } }
                ]
            }),
        );

        let theme = generate(&read_colors(&file).await);

        let tokens: Vec<_> = theme.rules.iter().map(|r| r.token.as_str()).collect();
        assert_eq!(
            tokens,
            vec![
                "comment",
                "keyword",
                "punctuation.definition.comment",
                "punctuation.definition.string",
                "storage",
                "string"
            ]
        );
        for token in ["comment", "punctuation.definition.comment"] {
            assert_eq!(
                serde_json::to_value(theme.rule(token).unwrap()).unwrap(),
                json!({ "token": token, "fontStyle": "italic" })
            );
        }
        assert_eq!(
            theme.rule("storage").unwrap().foreground.as_deref(),
            Some("#ffffff")
        );
        let string = theme.rule("string").unwrap();
        assert_eq!(string.foreground.as_deref(), Some("#ce9178"));
        assert_eq!(string.background, None);
    }

    #[test]
    fn test_generate_skips_entries_without_scope_or_settings() {
        let entries: Vec<TokenColor> = serde_json::from_value(json!([
            { "settings": { "foreground": "#ffffff", "background": "#000000" } },
            { "scope": "keyword" }
        ]))
        .unwrap();
        assert!(generate(&resolved("dark", entries)).rules.is_empty());
    }

    #[tokio::test]
    async fn test_read_colors_inline() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("theme.json");
        write_json(
            &file,
            json!({
                "type": "dark",
                "colors": { "editor.background": "#1e1e1e", "editor.invalid": 7 },
                "tokenColors": [ { "scope": "comment", "settings": { "foreground": "#6a9955" } } ]
            }),
        );

        let resolved = read_colors(&file).await;
        assert_eq!(resolved.kind.as_deref(), Some("dark"));
        assert_eq!(resolved.colors.len(), 1);
        assert_eq!(resolved.colors["editor.background"], "#1e1e1e");
        assert_eq!(resolved.token_colors.len(), 1);
    }

    #[tokio::test]
    async fn test_read_colors_token_colors_path_is_relative_to_theme() {
        let temp = tempfile::tempdir().unwrap();
        let themes = temp.path().join("themes");
        write_json(
            &themes.join("theme.json"),
            json!({ "type": "light", "tokenColors": "./colors/tokens.json" }),
        );
        write_json(
            &themes.join("colors").join("tokens.json"),
            json!([ { "scope": "string", "settings": { "foreground": "#a31515" } } ]),
        );

        let resolved = read_colors(&themes.join("theme.json")).await;
        assert_eq!(resolved.token_colors.len(), 1);
        assert_eq!(resolved.token_colors[0].scopes(), vec!["string"]);
    }

    #[tokio::test]
    async fn test_read_colors_settings_format() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("old.json");
        write_json(
            &file,
            json!({
                "type": "dark",
                "tokenColors": [],
                "settings": [ { "scope": "keyword", "settings": { "foreground": "#569cd6" } } ]
            }),
        );

        let resolved = read_colors(&file).await;
        assert_eq!(resolved.kind.as_deref(), Some("dark"));
        assert_eq!(resolved.token_colors.len(), 1);
    }

    #[tokio::test]
    async fn test_read_colors_include_appends_parent_rules() {
        let temp = tempfile::tempdir().unwrap();
        write_json(
            &temp.path().join("child.json"),
            json!({
                "type": "dark",
                "include": "./parent.json",
                "tokenColors": [
                    { "scope": "comment", "settings": { "foreground": "#111111" } },
                    { "scope": "keyword", "settings": { "foreground": "#222222" } }
                ]
            }),
        );
        write_json(
            &temp.path().join("parent.json"),
            json!({
                "type": "dark",
                "tokenColors": [
                    { "scope": "comment", "settings": { "foreground": "#999999" } },
                    { "scope": "string", "settings": { "foreground": "#333333" } }
                ]
            }),
        );

        let resolved = read_colors(&temp.path().join("child.json")).await;
        assert_eq!(resolved.token_colors.len(), 4);
        assert_eq!(resolved.token_colors[0].scopes(), vec!["comment"]);
        assert_eq!(resolved.token_colors[3].scopes(), vec!["string"]);

        let theme = generate(&resolved);
        let tokens: Vec<_> = theme.rules.iter().map(|r| r.token.as_str()).collect();
        assert_eq!(
            tokens,
            vec![
                "comment",
                "keyword",
                "punctuation.definition.comment",
                "punctuation.definition.string",
                "string"
            ]
        );
        assert_eq!(
            theme.rule("comment").unwrap().foreground.as_deref(),
            Some("#111111")
        );
        assert_eq!(
            theme.rule("string").unwrap().foreground.as_deref(),
            Some("#333333")
        );
    }

    #[tokio::test]
    async fn test_read_colors_include_without_own_rules() {
        let temp = tempfile::tempdir().unwrap();
        write_json(
            &temp.path().join("plus.json"),
            json!({ "type": "dark", "include": "./base.json" }),
        );
        write_json(
            &temp.path().join("base.json"),
            json!({ "tokenColors": [ { "scope": "keyword", "settings": { "foreground": "#569cd6" } } ] }),
        );

        let resolved = read_colors(&temp.path().join("plus.json")).await;
        assert_eq!(resolved.kind.as_deref(), Some("dark"));
        assert_eq!(resolved.token_colors.len(), 1);
    }

    #[tokio::test]
    async fn test_read_colors_include_cycle_keeps_own_rules() {
        let temp = tempfile::tempdir().unwrap();
        write_json(
            &temp.path().join("a.json"),
            json!({
                "type": "dark",
                "include": "./b.json",
                "tokenColors": [ { "scope": "a", "settings": { "foreground": "#aaaaaa" } } ]
            }),
        );
        write_json(
            &temp.path().join("b.json"),
            json!({
                "include": "./a.json",
                "tokenColors": [ { "scope": "b", "settings": { "foreground": "#bbbbbb" } } ]
            }),
        );

        let resolved = read_colors(&temp.path().join("a.json")).await;
        let scopes: Vec<_> = resolved
            .token_colors
            .iter()
            .flat_map(|t| t.scopes())
            .collect();
        assert_eq!(scopes, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_read_colors_unreadable_file() {
        let temp = tempfile::tempdir().unwrap();
        let missing = read_colors(&temp.path().join("missing.json")).await;
        assert_eq!(missing, ResolvedColors::unreadable());

        std::fs::write(temp.path().join("broken.json"), "{ not json").unwrap();
        let broken = read_colors(&temp.path().join("broken.json")).await;
        assert_eq!(broken.kind.as_deref(), Some("vs"));
        assert_eq!(generate(&broken).base, ThemeBase::Vs);
    }

    #[tokio::test]
    async fn test_generate_theme_from_installed_extension() {
        let temp = tempfile::tempdir().unwrap();
        let ext = theme_extension(
            &temp.path().join("monokai"),
            "Monokai",
            "themes/monokai.json",
            json!({
                "type": "dark",
                "colors": { "editor.background": "#272822" },
                "tokenColors": [ { "scope": "string", "settings": { "foreground": "#E6DB74" } } ]
            }),
        );
        let resolver = resolver(vec![ext], &temp.path().join("builtin"));

        let location = resolver.find_theme("Monokai").await.unwrap();
        assert!(location.is_dark);

        let theme = resolver.generate_theme("Monokai").await;
        assert_eq!(theme.base, ThemeBase::VsDark);
        assert_eq!(theme.colors["editor.background"], "#272822");
        assert_eq!(theme.rules.len(), 2);
        assert_eq!(
            theme.rule("string").unwrap().foreground.as_deref(),
            Some("#E6DB74")
        );
    }

    #[tokio::test]
    async fn test_generate_theme_falls_back_to_builtin_scan() {
        let temp = tempfile::tempdir().unwrap();
        let builtin = temp.path().join("builtin");
        theme_extension(
            &builtin.join("theme-defaults"),
            "Light+",
            "themes/light_plus.json",
            json!({
                "type": "light",
                "tokenColors": [ { "scope": "keyword", "settings": { "foreground": "#0000ff" } } ]
            }),
        );
        std::fs::write(builtin.join("package.json"), "{ broken").unwrap();

        let resolver = resolver(vec![], &builtin);
        let theme = resolver.generate_theme("Light+").await;
        assert_eq!(theme.base, ThemeBase::Vs);
        assert_eq!(theme.rules.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_theme_unknown_name_is_fallback() {
        let temp = tempfile::tempdir().unwrap();
        let resolver = resolver(vec![], &temp.path().join("builtin"));

        let theme = resolver.generate_theme("Nope").await;
        assert_eq!(theme, ThemeDefinition::fallback());
        assert_eq!(
            serde_json::to_value(&theme).unwrap(),
            json!({ "base": "vs-dark", "inherit": false, "rules": [], "colors": {} })
        );
    }

    #[tokio::test]
    async fn test_root_file_with_contributes_section() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("package.json");
        write_json(
            &root,
            json!({
                "contributes": { "themes": [
                    { "id": "Other", "path": "./other.json" },
                    { "id": "Solarized", "path": "./solarized.json" }
                ] }
            }),
        );
        write_json(
            &temp.path().join("solarized.json"),
            json!({ "type": "dark", "tokenColors": [] }),
        );

        let resolved = colors_from_root(&root, "Solarized").await.unwrap().unwrap();
        assert_eq!(resolved.kind.as_deref(), Some("dark"));
        assert!(colors_from_root(&root, "Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_root_file_that_is_not_a_theme() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("plain.json");
        write_json(&root, json!({ "name": "nothing here" }));
        assert!(colors_from_root(&root, "Any").await.unwrap().is_none());
        assert!(matches!(
            colors_from_root(&temp.path().join("gone.json"), "Any").await,
            Err(ResolveError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_theme_location_is_cached() {
        let temp = tempfile::tempdir().unwrap();
        let builtin = temp.path().join("builtin");
        let resolver = resolver(vec![], &builtin);

        assert!(resolver.find_theme("Late").await.is_none());
        theme_extension(
            &builtin.join("late"),
            "Late",
            "late.json",
            json!({ "type": "dark", "tokenColors": [] }),
        );
        assert!(resolver.find_theme("Late").await.is_none());
    }

    #[test]
    fn test_theme_location_without_path() {
        let manifest = ExtensionManifest::parse(
            &json!({ "name": "x", "contributes": { "themes": [ { "id": "NoPath" } ] } }).to_string(),
        )
        .unwrap();
        assert!(matches!(
            theme_location(&manifest, Path::new("/ext"), "NoPath"),
            Some(Err(ResolveError::MissingPath(_)))
        ));
        assert!(theme_location(&manifest, Path::new("/ext"), "Other").is_none());
    }
}
