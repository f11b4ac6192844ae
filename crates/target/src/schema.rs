//! Per-stream schema tracking and record validation
//!
//! A SCHEMA message replaces whatever was registered for its stream; records
//! are validated against the latest registration. Validation runs with
//! draft-4 semantics and format checking on, matching what taps emit.

use std::collections::HashMap;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::error::TargetError;
use crate::metadata;

/// Everything registered for one stream
#[derive(Debug)]
pub struct StreamState {
    pub schema: Value,
    pub key_properties: Vec<String>,
    validator: JSONSchema,
}

impl StreamState {
    /// Validate a record, collecting every violation into one error
    pub fn validate(&self, stream: &str, record: &Value) -> Result<(), TargetError> {
        let Err(errors) = self.validator.validate(record) else {
            return Ok(());
        };

        let mut multiple_of = false;
        let details: Vec<String> = errors
            .map(|e| {
                if matches!(e.kind, ValidationErrorKind::MultipleOf { .. }) {
                    multiple_of = true;
                }
                e.to_string()
            })
            .collect();
        let detail = details.join("; ");

        // high-precision decimals routinely trip multipleOf under f64
        // arithmetic, so those failures get a dedicated diagnostic
        if multiple_of {
            Err(TargetError::PrecisionValidation {
                stream: stream.to_string(),
                detail,
            })
        } else {
            Err(TargetError::Validation {
                stream: stream.to_string(),
                detail,
            })
        }
    }
}

/// Registry of stream schemas seen so far in the run
pub struct SchemaRegistry {
    streams: HashMap<String, StreamState>,
    add_metadata_columns: bool,
}

impl SchemaRegistry {
    pub fn new(add_metadata_columns: bool) -> Self {
        Self {
            streams: HashMap::new(),
            add_metadata_columns,
        }
    }

    /// Register (or replace) the schema for a stream
    pub fn register(
        &mut self,
        stream: &str,
        mut schema: Value,
        key_properties: Vec<String>,
    ) -> Result<(), TargetError> {
        if self.add_metadata_columns {
            metadata::extend_schema(&mut schema);
        }

        let validator = JSONSchema::options()
            .with_draft(Draft::Draft4)
            .should_validate_formats(true)
            .compile(&schema)
            .map_err(|e| TargetError::SchemaCompile {
                stream: stream.to_string(),
                detail: e.to_string(),
            })?;

        tracing::debug!(stream, ?key_properties, "registered schema");
        self.streams.insert(
            stream.to_string(),
            StreamState {
                schema,
                key_properties,
                validator,
            },
        );
        Ok(())
    }

    pub fn get(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Look up a stream, failing the run if no SCHEMA preceded it
    pub fn require(&self, stream: &str) -> Result<&StreamState, TargetError> {
        self.streams
            .get(stream)
            .ok_or_else(|| TargetError::RecordBeforeSchema {
                stream: stream.to_string(),
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
