//! JSON envelope form for webview `postMessage` transports.
//!
//! ```json
//! { "type": 2, "data": "python" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::base64::Base64Payload;
use crate::message::{ClientMessage, HostMessage, MessageType, ProtocolError};

/// A message as seen by a JSON transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Envelope {
    fn message_type(&self) -> Result<MessageType, ProtocolError> {
        MessageType::try_from(self.kind)
    }

    fn take_data(self, kind: MessageType) -> Result<Value, ProtocolError> {
        if self.data.is_null() {
            return Err(ProtocolError::MissingData(kind));
        }
        Ok(self.data)
    }
}

impl TryFrom<&ClientMessage> for Envelope {
    type Error = ProtocolError;

    fn try_from(msg: &ClientMessage) -> Result<Self, Self::Error> {
        let data = match msg {
            ClientMessage::TokenizerRequest => Value::Null,
            ClientMessage::LanguageRequest { language_id } => Value::String(language_id.clone()),
            ClientMessage::ThemeRequest { theme_name } => Value::String(theme_name.clone()),
        };
        Ok(Envelope {
            kind: msg.message_type() as u8,
            data,
        })
    }
}

impl TryFrom<Envelope> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let kind = envelope.message_type()?;
        match kind {
            MessageType::Tokenizer => Ok(ClientMessage::TokenizerRequest),
            MessageType::Language => Ok(ClientMessage::LanguageRequest {
                language_id: serde_json::from_value(envelope.take_data(kind)?)?,
            }),
            MessageType::Theme => Ok(ClientMessage::ThemeRequest {
                theme_name: serde_json::from_value(envelope.take_data(kind)?)?,
            }),
        }
    }
}

impl TryFrom<&HostMessage> for Envelope {
    type Error = ProtocolError;

    fn try_from(msg: &HostMessage) -> Result<Self, Self::Error> {
        let data = match msg {
            HostMessage::TokenizerData(bytes) => {
                serde_json::to_value(Base64Payload(bytes.clone()))?
            }
            HostMessage::LanguageGrammar(grammar) => serde_json::to_value(grammar)?,
            HostMessage::ThemeData(theme) => serde_json::to_value(theme)?,
        };
        Ok(Envelope {
            kind: msg.message_type() as u8,
            data,
        })
    }
}

impl TryFrom<Envelope> for HostMessage {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let kind = envelope.message_type()?;
        let data = envelope.take_data(kind)?;
        match kind {
            MessageType::Tokenizer => {
                let payload: Base64Payload = serde_json::from_value(data)?;
                Ok(HostMessage::TokenizerData(payload.0))
            }
            MessageType::Language => Ok(HostMessage::LanguageGrammar(serde_json::from_value(
                data,
            )?)),
            MessageType::Theme => Ok(HostMessage::ThemeData(serde_json::from_value(data)?)),
        }
    }
}
