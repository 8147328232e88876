//! Host configuration and default locations.

use std::path::{Path, PathBuf};

/// Overrides the application root the built-in extensions are found under.
pub const APP_ROOT_ENV: &str = "RENDERER_HOST_APP_ROOT";
/// Path list (platform separator) of directories holding installed extensions.
pub const EXTENSIONS_DIR_ENV: &str = "RENDERER_HOST_EXTENSIONS_DIR";
/// Path of the tokenizer engine binary.
pub const TOKENIZER_ENV: &str = "RENDERER_HOST_TOKENIZER";

/// Configuration for the resolver host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Installation directory of the editor whose built-in extensions are used.
    pub app_root: PathBuf,
    /// Directories of installed extensions, one extension per child directory.
    /// Scanned after the built-in extensions, in order.
    pub extension_dirs: Vec<PathBuf>,
    /// Tokenizer engine binary sent in reply to the tokenizer request.
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            app_root: default_app_root(),
            extension_dirs: default_user_extensions_dir().into_iter().collect(),
            tokenizer_path: None,
        }
    }
}

impl HostConfig {
    /// Defaults overridden by the `RENDERER_HOST_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(root) = std::env::var_os(APP_ROOT_ENV) {
            config.app_root = PathBuf::from(root);
        }
        if let Some(dirs) = std::env::var_os(EXTENSIONS_DIR_ENV) {
            config.extension_dirs = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(path) = std::env::var_os(TOKENIZER_ENV) {
            config.tokenizer_path = Some(PathBuf::from(path));
        }
        config
    }

    pub fn builtin_extensions_dir(&self) -> PathBuf {
        builtin_extensions_dir(&self.app_root)
    }
}

/// Directory of the running executable.
pub fn default_app_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `~/.vscode/extensions`
pub fn default_user_extensions_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vscode").join("extensions"))
}

/// Built-in extensions live under `resources/app/extensions`, either in the
/// application root or one directory above it.
pub fn builtin_extensions_dir(app_root: &Path) -> PathBuf {
    let extensions = app_root.join("resources").join("app").join("extensions");
    if extensions.exists() {
        return extensions;
    }
    app_root
        .join("..")
        .join("resources")
        .join("app")
        .join("extensions")
}
