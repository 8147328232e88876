//! Shared message types for the notebook code renderer channel.
//!
//! The renderer client (running inside the output webview) and the resolver
//! host (running with access to installed extensions) exchange three kinds of
//! messages, tagged by a small integer:
//!
//! | tag | client → host          | host → client                |
//! |-----|------------------------|------------------------------|
//! | 1   | tokenizer request      | raw tokenizer engine bytes   |
//! | 2   | language id            | [`LanguageGrammar`]          |
//! | 3   | theme name             | [`ThemeDefinition`]          |
//!
//! Messages travel either as binary frames (see [`connection`]) or as JSON
//! envelopes for webview `postMessage` transports (see [`Envelope`]).

mod base64;
pub mod connection;
mod envelope;
mod message;
mod types;

pub use base64::Base64Payload;
pub use connection::{MAX_CONTROL_FRAME_SIZE, MAX_FRAME_SIZE};
pub use envelope::Envelope;
pub use message::{ClientMessage, HostMessage, MessageType, ProtocolError};
pub use types::{LanguageGrammar, ThemeBase, ThemeDefinition, TokenRule};
