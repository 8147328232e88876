//! Base64 serialization for binary payloads carried inside JSON envelopes.

use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Binary payload that serializes as a single base64 string.
///
/// The tokenizer engine is the only binary payload on the channel; JSON
/// transports cannot carry it raw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Base64Payload(
    #[serde(
        serialize_with = "serialize_payload",
        deserialize_with = "deserialize_payload"
    )]
    pub Bytes,
);

/// Serialize bytes as a base64-encoded string.
///
/// Used with `#[serde(serialize_with = "serialize_payload")]`
pub fn serialize_payload<S>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    BASE64_STANDARD.encode(data).serialize(serializer)
}

/// Deserialize a base64-encoded string into Bytes.
///
/// `null` decodes to an empty payload.
pub fn deserialize_payload<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded: Option<String> = Option::deserialize(deserializer)?;
    match encoded {
        Some(s) => BASE64_STANDARD
            .decode(s)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom),
        None => Ok(Bytes::new()),
    }
}
