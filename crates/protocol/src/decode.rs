//! Singer message decoding
//!
//! Each input line decodes to an object with a `type` discriminator plus
//! type-specific fields. Decoding is two-phase: parse the line to a generic
//! JSON value (malformed JSON is fatal), then dispatch on `type` into a
//! strongly typed payload. Types we do not recognize are carried through as
//! [`Message::Unknown`] so the caller can warn and move on.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// A decoded Singer message
#[derive(Debug, Clone)]
pub enum Message {
    /// Declares (or replaces) the schema for a stream
    Schema(SchemaMessage),

    /// One record belonging to a stream
    Record(RecordMessage),

    /// An opaque checkpoint payload
    State(StateMessage),

    /// Version activation marker (no-op for this target)
    ActivateVersion(ActivateVersionMessage),

    /// A message type this target does not understand
    Unknown {
        /// The unrecognized `type` value
        message_type: String,
        /// The full message object, for diagnostics
        raw: Value,
    },
}

/// SCHEMA message payload
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaMessage {
    /// Stream name
    pub stream: String,

    /// JSON-Schema document governing records of this stream
    pub schema: Value,

    /// Ordered list of key property field names
    pub key_properties: Vec<String>,
}

/// RECORD message payload
#[derive(Debug, Clone, Deserialize)]
pub struct RecordMessage {
    /// Stream name
    pub stream: String,

    /// The record itself (always a JSON object)
    pub record: Map<String, Value>,

    /// Extraction timestamp set by the tap, if any
    #[serde(default)]
    pub time_extracted: Option<String>,

    /// Table version this record belongs to, if any
    #[serde(default)]
    pub version: Option<i64>,
}

/// STATE message payload
#[derive(Debug, Clone, Deserialize)]
pub struct StateMessage {
    /// Opaque checkpoint value
    pub value: Value,
}

/// ACTIVATE_VERSION message payload
#[derive(Debug, Clone, Deserialize)]
pub struct ActivateVersionMessage {
    /// Stream name
    pub stream: String,

    /// Version being activated
    pub version: i64,
}

/// Parse one newline-delimited JSON line into a [`Message`]
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the line is not valid JSON,
/// [`ProtocolError::MissingType`] if the object lacks a string `type` field,
/// and [`ProtocolError::InvalidPayload`] if a recognized type is missing
/// required fields. An unrecognized type is NOT an error.
pub fn parse_message(line: &str) -> Result<Message, ProtocolError> {
    let value: Value = serde_json::from_str(line).map_err(ProtocolError::Malformed)?;

    let message_type = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?
        .to_string();

    match message_type.as_str() {
        "SCHEMA" => Ok(Message::Schema(payload("SCHEMA", value)?)),
        "RECORD" => Ok(Message::Record(payload("RECORD", value)?)),
        "STATE" => Ok(Message::State(payload("STATE", value)?)),
        "ACTIVATE_VERSION" => Ok(Message::ActivateVersion(payload("ACTIVATE_VERSION", value)?)),
        _ => Ok(Message::Unknown { message_type, raw: value }),
    }
}

fn payload<T: DeserializeOwned>(
    message_type: &'static str,
    value: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload {
        message_type,
        source,
    })
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod decode_test;
