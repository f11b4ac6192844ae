use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while routing messages
///
/// Every variant is fatal: the router stops at the first failure and no
/// checkpoint is emitted for the run.
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("a RECORD message for stream '{stream}' arrived before its SCHEMA")]
    RecordBeforeSchema { stream: String },

    #[error("schema for stream '{stream}' failed to compile: {detail}")]
    SchemaCompile { stream: String, detail: String },

    #[error("record for stream '{stream}' failed validation: {detail}")]
    Validation { stream: String, detail: String },

    #[error(
        "record for stream '{stream}' failed validation: {detail}\n\
         'multipleOf' validation against high-precision values is not \
         supported; remove 'multipleOf' from the schema for this stream"
    )]
    PrecisionValidation { stream: String, detail: String },

    #[error("path token '{{{token}}}' needs a datetime but field held '{value}'")]
    TokenDateParse { token: String, value: String },

    #[error("buffer i/o failed for '{path}': {source}")]
    BufferIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Upload(#[from] sluice_upload::UploadError),
}

impl TargetError {
    pub fn buffer_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::BufferIo {
            path: path.into(),
            source,
        }
    }
}
