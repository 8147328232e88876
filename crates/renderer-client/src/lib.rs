//! Renderer client for highlighted, read-only code outputs.
//!
//! The client lives in the output webview. It derives a language id from an
//! output's mime type and holds each render until three prerequisites are in
//! place: the tokenizer engine, the active color theme, and the grammar for
//! the output's language. All three come from the resolver host over the
//! message channel, and each is requested at most once.

pub mod client;
pub mod deferred;
pub mod port;
pub mod transport;
pub mod widget;

pub use client::{ClientConfig, ClientError, RendererClient};
pub use deferred::{Abandoned, Deferred, Waiter};
pub use port::{ChannelPort, MessagePort};
pub use transport::{connect, Connection};
pub use widget::{EditorView, EditorWidget};

/// Host-supplied environment read once at activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererEnvironment {
    /// Display name of the host's active color theme.
    pub theme_name: String,
    /// Whether the host is currently using a dark UI.
    pub is_dark: bool,
}

impl RendererEnvironment {
    pub fn new(theme_name: impl Into<String>, is_dark: bool) -> Self {
        Self {
            theme_name: theme_name.into(),
            is_dark,
        }
    }

    /// Name the theme is registered under with the editor widget.
    pub fn registered_theme_name(&self) -> String {
        sanitize_theme_name(&self.theme_name)
    }
}

/// One output to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputItem {
    pub id: String,
    pub mime: String,
    pub text: String,
}

impl OutputItem {
    pub fn new(id: impl Into<String>, mime: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mime: mime.into(),
            text: text.into(),
        }
    }
}

/// Replace every character that is not ASCII alphanumeric with `-` and
/// prefix the result, e.g. `Default Dark+` becomes `notebook-Default-Dark-`.
pub fn sanitize_theme_name(theme_name: &str) -> String {
    let sanitized: String = theme_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("notebook-{}", sanitized)
}

/// Language id encoded in an output mime type.
///
/// `text/x-python` yields `python`. Other mime types fall back to their
/// subtype with any `x-` prefix removed. Parameters are ignored.
pub fn language_id_from_mime(mime: &str) -> Option<&str> {
    let id = match mime.strip_prefix("text/x-") {
        Some(rest) => rest,
        None => {
            let (_, subtype) = mime.split_once('/')?;
            subtype.strip_prefix("x-").unwrap_or(subtype)
        }
    };
    let id = id.split(';').next().unwrap_or_default().trim();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
