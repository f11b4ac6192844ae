//! Sluice - Protocol
//!
//! Decoding for the Singer message protocol: newline-delimited JSON objects
//! carrying schema definitions, records, and state checkpoints for one or
//! more logical streams.
//!
//! Messages are decoded at the boundary into a tagged [`Message`] enum so the
//! rest of the pipeline operates on strongly typed fields. Unknown message
//! types are preserved (not rejected) so the router can log and skip them;
//! malformed JSON is always an error.

mod decode;
mod error;

pub use decode::{
    parse_message, ActivateVersionMessage, Message, RecordMessage, SchemaMessage, StateMessage,
};
pub use error::ProtocolError;
