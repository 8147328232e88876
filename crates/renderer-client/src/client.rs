//! Bootstrap sequencing and request coalescing.
//!
//! At activation the client posts one tokenizer request and one theme request.
//! Grammars are requested lazily, per language, the first time an output in
//! that language is rendered. While a grammar request is in flight, further
//! callers for the same language share the in-flight [`Deferred`] instead of
//! posting a second request.
//!
//! There is no timeout by default: a request the host never answers keeps its
//! render pending.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use renderer_protocol::{ClientMessage, HostMessage, LanguageGrammar, ThemeBase, ThemeDefinition};

use crate::deferred::{Abandoned, Deferred, Waiter};
use crate::port::MessagePort;
use crate::widget::{EditorView, EditorWidget};
use crate::{language_id_from_mime, OutputItem, RendererEnvironment};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("message channel to the host is closed")]
    ChannelClosed,

    #[error("no language id in mime type {0:?}")]
    UnsupportedMime(String),

    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    #[error("renderer state dropped while waiting: {0}")]
    Abandoned(#[from] Abandoned),
}

/// Client behavior knobs.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Give up on a host reply after this long. `None` waits forever.
    pub reply_timeout: Option<Duration>,
}

#[derive(Default)]
struct LanguageState {
    /// Languages whose grammar has been registered with the widget.
    loaded: HashSet<String>,
    /// At most one in-flight request per language.
    pending: HashMap<String, Deferred<()>>,
}

/// The renderer-side half of the channel.
pub struct RendererClient {
    port: Arc<dyn MessagePort>,
    widget: Arc<dyn EditorWidget>,
    config: ClientConfig,
    environment: RendererEnvironment,
    registered_theme: String,
    tokenizer: Deferred<()>,
    theme: Deferred<ThemeDefinition>,
    languages: Mutex<LanguageState>,
}

impl RendererClient {
    /// Create the client and post the one-time tokenizer and theme requests.
    pub fn activate(
        environment: RendererEnvironment,
        port: Arc<dyn MessagePort>,
        widget: Arc<dyn EditorWidget>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let client = Self {
            registered_theme: environment.registered_theme_name(),
            port,
            widget,
            config,
            environment,
            tokenizer: Deferred::new(),
            theme: Deferred::new(),
            languages: Mutex::new(LanguageState::default()),
        };

        client.port.post(ClientMessage::TokenizerRequest)?;
        client.port.post(ClientMessage::ThemeRequest {
            theme_name: client.environment.theme_name.clone(),
        })?;
        info!(
            "[renderer-client] Activated, requested tokenizer and theme {:?}",
            client.environment.theme_name
        );

        Ok(client)
    }

    pub fn environment(&self) -> &RendererEnvironment {
        &self.environment
    }

    /// Name the host theme is registered under with the widget.
    pub fn registered_theme_name(&self) -> &str {
        &self.registered_theme
    }

    pub fn is_tokenizer_loaded(&self) -> bool {
        self.tokenizer.is_resolved()
    }

    /// The theme definition, once the host has sent it.
    pub fn theme(&self) -> Option<ThemeDefinition> {
        self.theme.get()
    }

    pub fn has_language(&self, language_id: &str) -> bool {
        self.languages.lock().unwrap().loaded.contains(language_id)
    }

    /// Number of grammar requests still waiting for a reply.
    pub fn pending_languages(&self) -> usize {
        self.languages.lock().unwrap().pending.len()
    }

    /// Make sure the grammar for `language_id` is registered.
    ///
    /// Completes immediately for a cached language. Otherwise joins the
    /// in-flight request for that language, or posts a new one.
    pub async fn load_language(&self, language_id: &str) -> Result<(), ClientError> {
        match self.request_language(language_id)? {
            Some(waiter) => self.wait(waiter, format!("language {}", language_id)).await,
            None => Ok(()),
        }
    }

    fn request_language(&self, language_id: &str) -> Result<Option<Waiter<()>>, ClientError> {
        let mut state = self.languages.lock().unwrap();
        if state.loaded.contains(language_id) {
            return Ok(None);
        }
        if let Some(pending) = state.pending.get(language_id) {
            debug!(
                "[renderer-client] Joining in-flight request for {}",
                language_id
            );
            return Ok(Some(pending.waiter()));
        }

        let deferred = Deferred::new();
        let waiter = deferred.waiter();
        state.pending.insert(language_id.to_string(), deferred);

        let request = ClientMessage::LanguageRequest {
            language_id: language_id.to_string(),
        };
        if let Err(e) = self.port.post(request) {
            state.pending.remove(language_id);
            return Err(e);
        }
        info!("[renderer-client] Requested language {}", language_id);
        Ok(Some(waiter))
    }

    async fn wait_theme(&self) -> Result<(), ClientError> {
        if self.theme.is_resolved() {
            return Ok(());
        }
        self.wait(self.theme.waiter(), "theme".to_string())
            .await
            .map(|_| ())
    }

    async fn wait_tokenizer(&self) -> Result<(), ClientError> {
        self.wait(self.tokenizer.waiter(), "tokenizer".to_string())
            .await
    }

    async fn wait<T: Clone>(&self, waiter: Waiter<T>, what: String) -> Result<T, ClientError> {
        match self.config.reply_timeout {
            Some(limit) => match tokio::time::timeout(limit, waiter.wait()).await {
                Ok(result) => Ok(result?),
                Err(_) => {
                    warn!("[renderer-client] Timed out waiting for {}", what);
                    Err(ClientError::Timeout { what })
                }
            },
            None => Ok(waiter.wait().await?),
        }
    }

    /// Render one output.
    ///
    /// The display area is reserved first; the editor is shown only after the
    /// tokenizer, the theme and the output's grammar are all loaded.
    pub async fn render(&self, item: &OutputItem) -> Result<EditorView, ClientError> {
        let language_id = language_id_from_mime(&item.mime)
            .ok_or_else(|| ClientError::UnsupportedMime(item.mime.clone()))?;

        let base = if self.environment.is_dark {
            ThemeBase::VsDark
        } else {
            ThemeBase::Vs
        };
        self.widget.reserve_display(&item.id, base);

        tokio::try_join!(
            self.wait_tokenizer(),
            self.wait_theme(),
            self.load_language(language_id),
        )?;

        let view = EditorView {
            output_id: item.id.clone(),
            language_id: language_id.to_string(),
            text: item.text.clone(),
            theme_name: self.registered_theme.clone(),
        };
        self.widget.show(&view);
        Ok(view)
    }

    /// Tear down one output, or all of them.
    pub fn dispose_output(&self, output_id: Option<&str>) {
        self.widget.dispose(output_id);
    }

    /// Apply one reply from the host.
    pub fn handle_message(&self, message: HostMessage) {
        match message {
            HostMessage::TokenizerData(engine) => {
                if self.tokenizer.is_resolved() {
                    debug!("[renderer-client] Ignoring repeated tokenizer data");
                    return;
                }
                self.widget.load_tokenizer(&engine);
                self.tokenizer.resolve(());
                info!(
                    "[renderer-client] Tokenizer loaded ({} bytes)",
                    engine.len()
                );
            }
            HostMessage::LanguageGrammar(grammar) => self.language_loaded(grammar),
            HostMessage::ThemeData(theme) => {
                self.widget.define_theme(&self.registered_theme, &theme);
                info!(
                    "[renderer-client] Theme {} loaded ({} rules)",
                    self.registered_theme,
                    theme.rules.len()
                );
                self.theme.resolve(theme);
            }
        }
    }

    fn language_loaded(&self, grammar: LanguageGrammar) {
        self.widget.register_language(&grammar);
        if !grammar.has_grammar() {
            warn!(
                "[renderer-client] Host has no grammar for {}",
                grammar.language_id
            );
        }

        let pending = {
            let mut state = self.languages.lock().unwrap();
            state.loaded.insert(grammar.language_id.clone());
            state.pending.remove(&grammar.language_id)
        };
        match pending {
            Some(deferred) => {
                deferred.resolve(());
                info!("[renderer-client] Language {} loaded", grammar.language_id);
            }
            None => debug!(
                "[renderer-client] Registered unrequested language {}",
                grammar.language_id
            ),
        }
    }
}
