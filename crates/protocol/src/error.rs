//! Protocol error types
//!
//! Errors that can occur when parsing Singer messages.

use thiserror::Error;

/// Errors that can occur during message decoding
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Line is not valid JSON
    #[error("unable to parse message: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Message object has no `type` field
    #[error("message has no 'type' field")]
    MissingType,

    /// Message has a known type but an invalid payload
    #[error("invalid {message_type} message: {source}")]
    InvalidPayload {
        /// The message type that failed to decode
        message_type: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },
}
