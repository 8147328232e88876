//! Typed extension manifests and the providers that enumerate them.
//!
//! Manifests are parsed once, when an extension is loaded. Only the
//! contribution points the resolver cares about are kept: `grammars` and
//! `themes`. A field or contribution entry of the wrong shape is dropped
//! rather than failing the whole manifest.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::resolver::{read_text, ResolveError};

/// The parts of a `package.json` the resolver reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensionManifest {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub publisher: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub contributes: Option<Contributions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contributions {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub grammars: Vec<GrammarContribution>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub themes: Vec<ThemeContribution>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarContribution {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub scope_name: Option<String>,
    /// Grammar file, relative to the extension root.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeContribution {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub ui_theme: Option<String>,
    /// Theme file, relative to the extension root.
    #[serde(default)]
    pub path: Option<String>,
}

impl ThemeContribution {
    /// A theme is addressed by its label or its id.
    pub fn matches(&self, theme_name: &str) -> bool {
        self.label.as_deref() == Some(theme_name) || self.id.as_deref() == Some(theme_name)
    }

    pub fn is_dark(&self) -> bool {
        self.ui_theme.as_deref() == Some("vs-dark")
    }
}

impl ExtensionManifest {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Contributions, for manifests that declare both a name and a
    /// `contributes` section.
    pub fn contributions(&self) -> Option<&Contributions> {
        self.name.as_ref()?;
        self.contributes.as_ref()
    }

    /// Read and parse `path`.
    pub async fn load(path: &Path) -> Result<Self, ResolveError> {
        let text = read_text(path).await?;
        Self::parse(&text).map_err(|source| ResolveError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `None` for a value that does not deserialize as `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    let Value::Array(entries) = raw else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

/// One installed extension.
#[derive(Debug, Clone)]
pub struct InstalledExtension {
    /// `publisher.name`, or the directory name when either is missing.
    pub id: String,
    /// Directory holding the extension's `package.json`.
    pub root: PathBuf,
    pub manifest: ExtensionManifest,
}

impl InstalledExtension {
    pub fn new(root: impl Into<PathBuf>, manifest: ExtensionManifest) -> Self {
        let root = root.into();
        let id = match (&manifest.publisher, &manifest.name) {
            (Some(publisher), Some(name)) => format!("{}.{}", publisher, name),
            _ => root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        };
        Self { id, root, manifest }
    }

    /// Load the extension rooted at `root`.
    pub async fn load(root: &Path) -> Result<Self, ResolveError> {
        let manifest = ExtensionManifest::load(&root.join("package.json")).await?;
        Ok(Self::new(root, manifest))
    }
}

/// Enumerates installed extensions in the host's order.
///
/// Lookups take the first match in this order; it is never re-sorted.
pub trait ExtensionProvider: Send + Sync {
    fn extensions(&self) -> &[InstalledExtension];
}

/// A fixed, in-memory list of extensions.
#[derive(Debug, Clone, Default)]
pub struct StaticExtensions(pub Vec<InstalledExtension>);

impl ExtensionProvider for StaticExtensions {
    fn extensions(&self) -> &[InstalledExtension] {
        &self.0
    }
}

/// Extensions discovered on disk, one per child directory with a
/// `package.json`.
#[derive(Debug, Clone, Default)]
pub struct ExtensionDirectory {
    extensions: Vec<InstalledExtension>,
}

impl ExtensionDirectory {
    /// Scan `dirs` in order. Within a directory, children are visited by
    /// name. Missing directories and unreadable manifests are skipped.
    pub async fn scan(dirs: &[PathBuf]) -> Self {
        let mut extensions = Vec::new();
        for dir in dirs {
            let mut children = match child_dirs(dir).await {
                Ok(children) => children,
                Err(e) => {
                    debug!("[renderer-host] Skipping extensions dir {:?}: {}", dir, e);
                    continue;
                }
            };
            children.sort();

            for child in children {
                if !child.join("package.json").exists() {
                    continue;
                }
                match InstalledExtension::load(&child).await {
                    Ok(extension) => extensions.push(extension),
                    Err(e) => warn!("[renderer-host] Skipping extension {:?}: {}", child, e),
                }
            }
        }
        info!("[renderer-host] Found {} installed extensions", extensions.len());
        Self { extensions }
    }
}

impl ExtensionProvider for ExtensionDirectory {
    fn extensions(&self) -> &[InstalledExtension] {
        &self.extensions
    }
}

async fn child_dirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            children.push(entry.path());
        }
    }
    Ok(children)
}

/// Every `package.json` under `root`, depth first, siblings by name.
/// `node_modules` directories are not entered. A missing root yields nothing.
pub async fn find_package_manifests(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if root.is_dir() {
        collect_package_manifests(root, &mut found).await?;
    }
    Ok(found)
}

async fn collect_package_manifests(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let manifest = dir.join("package.json");
    if manifest.is_file() {
        found.push(manifest);
    }

    let mut children = child_dirs(dir).await?;
    children.sort();
    for child in children {
        if child.file_name().is_some_and(|n| n == "node_modules") {
            continue;
        }
        Box::pin(collect_package_manifests(&child, found)).await?;
    }
    Ok(())
}
