//! The resolver service: answers client requests from installed extensions.
//!
//! Lookups are memoized per language id and per theme name. Each key is
//! resolved once, even when requests for it arrive concurrently. A failed
//! lookup is logged once and remembered as "no result", so a broken
//! extension is never rescanned on every request.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use log::{error, info, warn};
use renderer_protocol::{ClientMessage, HostMessage, MAX_FRAME_SIZE};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OnceCell};

use crate::config::HostConfig;
use crate::manifest::{ExtensionDirectory, ExtensionProvider};
use crate::theme::ThemeLocation;

/// Error type for a single resolution step.
///
/// These never reach the client. The resolver logs them and answers with
/// an empty or default payload instead.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no path for {0}")]
    MissingPath(String),

    #[error("theme include cycle at {0:?}")]
    IncludeCycle(PathBuf),

    #[error("{path:?} is {size} bytes, over the {max} byte reply limit")]
    TooLarge { path: PathBuf, size: u64, max: u64 },
}

/// Largest tokenizer binary that fits in one reply frame next to its type
/// byte.
pub const MAX_TOKENIZER_SIZE: u64 = (MAX_FRAME_SIZE - 1) as u64;

/// Per-key lookup results. The cell for a key is created on first request
/// and filled by exactly one lookup.
pub(crate) type Cache<T> = Mutex<HashMap<String, Arc<OnceCell<Option<T>>>>>;

/// Answers tokenizer, grammar and theme requests.
pub struct Resolver {
    pub(crate) extensions: Arc<dyn ExtensionProvider>,
    pub(crate) builtin_extensions_dir: PathBuf,
    tokenizer_path: Option<PathBuf>,
    /// Language id -> raw grammar text.
    pub(crate) grammars: Cache<String>,
    /// Language id -> raw language-configuration text.
    pub(crate) configurations: Cache<String>,
    /// Theme name -> located root file.
    pub(crate) themes: Cache<ThemeLocation>,
}

impl Resolver {
    pub fn new(extensions: Arc<dyn ExtensionProvider>, builtin_extensions_dir: PathBuf) -> Self {
        Self {
            extensions,
            builtin_extensions_dir,
            tokenizer_path: None,
            grammars: Mutex::default(),
            configurations: Mutex::default(),
            themes: Mutex::default(),
        }
    }

    pub fn with_tokenizer(mut self, path: impl Into<PathBuf>) -> Self {
        self.tokenizer_path = Some(path.into());
        self
    }

    /// Scan the built-in extensions, then the configured extension
    /// directories, and build a resolver over the result.
    pub async fn from_config(config: &HostConfig) -> Self {
        let builtin = config.builtin_extensions_dir();
        let mut dirs = vec![builtin.clone()];
        dirs.extend(config.extension_dirs.iter().cloned());

        let extensions = ExtensionDirectory::scan(&dirs).await;
        let mut resolver = Self::new(Arc::new(extensions), builtin);
        resolver.tokenizer_path = config.tokenizer_path.clone();
        resolver
    }

    pub fn extensions(&self) -> &dyn ExtensionProvider {
        self.extensions.as_ref()
    }

    pub fn builtin_extensions_dir(&self) -> &Path {
        &self.builtin_extensions_dir
    }

    /// The tokenizer engine binary. Files too large for one reply frame are
    /// refused before they are read.
    pub async fn tokenizer_data(&self) -> Result<Bytes, ResolveError> {
        let path = self
            .tokenizer_path
            .as_ref()
            .ok_or_else(|| ResolveError::MissingPath("tokenizer".to_string()))?;
        let io_error = |source: std::io::Error| ResolveError::Io {
            path: path.clone(),
            source,
        };

        let size = tokio::fs::metadata(path).await.map_err(io_error)?.len();
        if size > MAX_TOKENIZER_SIZE {
            return Err(ResolveError::TooLarge {
                path: path.clone(),
                size,
                max: MAX_TOKENIZER_SIZE,
            });
        }
        let data = tokio::fs::read(path).await.map_err(io_error)?;
        Ok(Bytes::from(data))
    }

    /// Answer one client request. `None` means no reply is sent.
    pub async fn handle_request(&self, request: ClientMessage) -> Option<HostMessage> {
        match request {
            ClientMessage::TokenizerRequest => match self.tokenizer_data().await {
                Ok(data) => {
                    info!("[renderer-host] Sending tokenizer ({} bytes)", data.len());
                    Some(HostMessage::TokenizerData(data))
                }
                Err(e) => {
                    error!("[renderer-host] Tokenizer unavailable: {}", e);
                    None
                }
            },
            ClientMessage::LanguageRequest { language_id } => Some(HostMessage::LanguageGrammar(
                self.request_tm_language(&language_id).await,
            )),
            ClientMessage::ThemeRequest { theme_name } => {
                Some(HostMessage::ThemeData(self.generate_theme(&theme_name).await))
            }
        }
    }
}

/// Memoize `lookup` under `key`. Errors are logged and cached as `None`.
///
/// Concurrent callers for the same key wait on the first caller's lookup;
/// the map lock is only held to fetch the key's cell.
pub(crate) async fn cached<T, F, Fut>(
    cache: &Cache<T>,
    key: &str,
    what: &str,
    lookup: F,
) -> Option<T>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, ResolveError>>,
{
    let cell = cache
        .lock()
        .await
        .entry(key.to_string())
        .or_default()
        .clone();

    cell.get_or_init(|| async move {
        match lookup().await {
            Ok(value) => value,
            Err(e) => {
                warn!("[renderer-host] Failed to resolve {} {:?}: {}", what, key, e);
                None
            }
        }
    })
    .await
    .clone()
}

/// Read a file as text, replacing invalid UTF-8.
pub(crate) async fn read_text(path: &Path) -> Result<String, ResolveError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ResolveError> {
    let text = read_text(path).await?;
    serde_json::from_str(&text).map_err(|source| ResolveError::Json {
        path: path.to_path_buf(),
        source,
    })
}
