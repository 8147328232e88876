//! Payload types exchanged between the renderer client and the resolver host.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Grammar bundle for one language, as resolved by the host.
///
/// `language_json` is empty when no installed extension contributes a grammar
/// for the language; the scope name is synthesized either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LanguageGrammar {
    pub language_id: String,
    pub scope_name: String,
    /// Raw grammar file contents.
    #[serde(rename = "languageJSON")]
    pub language_json: String,
    /// Raw language-configuration text as a JSON string, or `{}` when absent.
    #[ts(type = "string | Record<string, never>")]
    pub language_configuration: serde_json::Value,
    /// File extensions associated with the language. Always empty for now.
    pub extensions: Vec<String>,
}

impl LanguageGrammar {
    /// Scope name synthesized for a language id.
    pub fn scope_name_for(language_id: &str) -> String {
        format!("scope.{}", language_id)
    }

    /// Grammar result carrying no grammar and no configuration.
    pub fn empty(language_id: &str) -> Self {
        Self {
            language_id: language_id.to_string(),
            scope_name: Self::scope_name_for(language_id),
            language_json: String::new(),
            language_configuration: serde_json::Value::Object(serde_json::Map::new()),
            extensions: Vec::new(),
        }
    }

    pub fn has_grammar(&self) -> bool {
        !self.language_json.is_empty()
    }
}

/// Built-in editor theme a definition is layered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ThemeBase {
    #[serde(rename = "vs")]
    Vs,
    #[serde(rename = "vs-dark")]
    VsDark,
}

impl std::fmt::Display for ThemeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeBase::Vs => write!(f, "vs"),
            ThemeBase::VsDark => write!(f, "vs-dark"),
        }
    }
}

/// A color theme in the editor widget's format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ThemeDefinition {
    pub base: ThemeBase,
    /// Never inherit rules from the built-in base theme.
    pub inherit: bool,
    /// UI color key to hex color.
    pub colors: BTreeMap<String, String>,
    /// Scope rules, sorted ascending by token.
    pub rules: Vec<TokenRule>,
}

impl ThemeDefinition {
    /// The definition used when a theme cannot be located at all.
    pub fn fallback() -> Self {
        Self {
            base: ThemeBase::VsDark,
            inherit: false,
            colors: BTreeMap::new(),
            rules: Vec::new(),
        }
    }

    /// First rule registered for `token`, if any.
    pub fn rule(&self, token: &str) -> Option<&TokenRule> {
        self.rules.iter().find(|r| r.token == token)
    }
}

impl Default for ThemeDefinition {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Styling for one scope key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TokenRule {
    pub token: String,
    /// `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub foreground: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub font_style: Option<String>,
}

impl TokenRule {
    /// Same styling, registered under another token.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..self.clone()
        }
    }
}
