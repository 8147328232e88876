//! Tagged messages and their binary encoding.
//!
//! A binary message is `[1 byte: message type] [payload bytes]`. The payload
//! is empty for the tokenizer request, raw bytes for the tokenizer data, and
//! JSON for everything else.

use bytes::Bytes;

use crate::types::{LanguageGrammar, ThemeDefinition};

/// Error type for message encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty message frame")]
    EmptyFrame,

    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),

    #[error("message type {0:?} carries no data")]
    MissingData(MessageType),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Integer tag shared by a request and its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Tokenizer engine bootstrap.
    Tokenizer = 1,
    /// Per-language grammar.
    Language = 2,
    /// Active color theme.
    Theme = 3,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::Tokenizer),
            2 => Ok(MessageType::Language),
            3 => Ok(MessageType::Theme),
            k => Err(ProtocolError::UnknownMessageType(k)),
        }
    }
}

/// Messages sent by the renderer client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Readiness ping asking for the tokenizer engine.
    TokenizerRequest,
    /// Ask for the grammar of one language.
    LanguageRequest { language_id: String },
    /// Ask for the generated definition of a named theme.
    ThemeRequest { theme_name: String },
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ClientMessage::TokenizerRequest => MessageType::Tokenizer,
            ClientMessage::LanguageRequest { .. } => MessageType::Language,
            ClientMessage::ThemeRequest { .. } => MessageType::Theme,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut frame = vec![self.message_type() as u8];
        match self {
            ClientMessage::TokenizerRequest => {}
            ClientMessage::LanguageRequest { language_id } => {
                frame.extend(serde_json::to_vec(language_id)?);
            }
            ClientMessage::ThemeRequest { theme_name } => {
                frame.extend(serde_json::to_vec(theme_name)?);
            }
        }
        Ok(frame)
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (kind, payload) = split_frame(frame)?;
        match kind {
            MessageType::Tokenizer => Ok(ClientMessage::TokenizerRequest),
            MessageType::Language => Ok(ClientMessage::LanguageRequest {
                language_id: json_payload(kind, payload)?,
            }),
            MessageType::Theme => Ok(ClientMessage::ThemeRequest {
                theme_name: json_payload(kind, payload)?,
            }),
        }
    }
}

/// Messages sent by the resolver host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// The tokenizer engine binary.
    TokenizerData(Bytes),
    LanguageGrammar(LanguageGrammar),
    ThemeData(ThemeDefinition),
}

impl HostMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            HostMessage::TokenizerData(_) => MessageType::Tokenizer,
            HostMessage::LanguageGrammar(_) => MessageType::Language,
            HostMessage::ThemeData(_) => MessageType::Theme,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut frame = vec![self.message_type() as u8];
        match self {
            HostMessage::TokenizerData(data) => frame.extend_from_slice(data),
            HostMessage::LanguageGrammar(grammar) => frame.extend(serde_json::to_vec(grammar)?),
            HostMessage::ThemeData(theme) => frame.extend(serde_json::to_vec(theme)?),
        }
        Ok(frame)
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (kind, payload) = split_frame(frame)?;
        match kind {
            MessageType::Tokenizer => Ok(HostMessage::TokenizerData(Bytes::copy_from_slice(
                payload,
            ))),
            MessageType::Language => Ok(HostMessage::LanguageGrammar(json_payload(
                kind, payload,
            )?)),
            MessageType::Theme => Ok(HostMessage::ThemeData(json_payload(kind, payload)?)),
        }
    }
}

fn split_frame(frame: &[u8]) -> Result<(MessageType, &[u8]), ProtocolError> {
    match frame.split_first() {
        Some((tag, payload)) => Ok((MessageType::try_from(*tag)?, payload)),
        None => Err(ProtocolError::EmptyFrame),
    }
}

fn json_payload<T: serde::de::DeserializeOwned>(
    kind: MessageType,
    payload: &[u8],
) -> Result<T, ProtocolError> {
    if payload.is_empty() {
        return Err(ProtocolError::MissingData(kind));
    }
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ThemeBase, TokenRule};

    #[test]
    fn test_message_type_tags() {
        assert_eq!(MessageType::Tokenizer as u8, 1);
        assert_eq!(MessageType::Language as u8, 2);
        assert_eq!(MessageType::Theme as u8, 3);
        assert!(matches!(
            MessageType::try_from(9),
            Err(ProtocolError::UnknownMessageType(9))
        ));
    }

    #[test]
    fn test_tokenizer_request_has_no_payload() {
        let frame = ClientMessage::TokenizerRequest.encode().unwrap();
        assert_eq!(frame, vec![1]);
        assert_eq!(
            ClientMessage::decode(&frame).unwrap(),
            ClientMessage::TokenizerRequest
        );
    }

    #[test]
    fn test_language_request_payload_is_json_string() {
        let msg = ClientMessage::LanguageRequest {
            language_id: "python".into(),
        };
        let frame = msg.encode().unwrap();
        assert_eq!(frame[0], 2);
        assert_eq!(&frame[1..], b"\"python\"");
        assert_eq!(ClientMessage::decode(&frame).unwrap(), msg);
    }

    #[test]
    fn test_theme_request_without_payload_is_rejected() {
        assert!(matches!(
            ClientMessage::decode(&[3]),
            Err(ProtocolError::MissingData(MessageType::Theme))
        ));
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        assert!(matches!(
            HostMessage::decode(&[]),
            Err(ProtocolError::EmptyFrame)
        ));
    }

    #[test]
    fn test_tokenizer_data_is_raw_bytes() {
        let msg = HostMessage::TokenizerData(Bytes::from_static(b"\0asm\x01\0\0\0"));
        let frame = msg.encode().unwrap();
        assert_eq!(&frame[1..], b"\0asm\x01\0\0\0");
        assert_eq!(HostMessage::decode(&frame).unwrap(), msg);
    }

    #[test]
    fn test_theme_data_decodes() {
        let theme = ThemeDefinition {
            base: ThemeBase::Vs,
            inherit: false,
            colors: [("editor.background".to_string(), "#ffffff".to_string())]
                .into_iter()
                .collect(),
            rules: vec![TokenRule {
                token: "comment".into(),
                foreground: Some("#008000".into()),
                background: None,
                font_style: None,
            }],
        };
        let frame = HostMessage::ThemeData(theme.clone()).encode().unwrap();
        match HostMessage::decode(&frame).unwrap() {
            HostMessage::ThemeData(decoded) => assert_eq!(decoded, theme),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_grammar_json() {
        let mut frame = vec![2u8];
        frame.extend_from_slice(b"{not json");
        assert!(matches!(
            HostMessage::decode(&frame),
            Err(ProtocolError::Json(_))
        ));
    }
}
