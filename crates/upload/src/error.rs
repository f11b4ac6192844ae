//! Upload pipeline error types

use thiserror::Error;

/// Errors from encoding or uploading a finished buffer
#[derive(Debug, Error)]
pub enum UploadError {
    /// I/O error on a local buffer or encoded file
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The file involved
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A buffer line is not a JSON object
    #[error("buffer '{path}' line {line} is not a JSON object")]
    InvalidBufferLine {
        /// The buffer file
        path: String,
        /// 1-based line number
        line: usize,
    },

    /// Parquet write error
    #[error("parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow error
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// The object store rejected the upload
    #[error("upload of '{key}' failed: {detail}")]
    Store {
        /// Remote key being written
        key: String,
        /// Store-specific failure detail
        detail: String,
    },
}

impl UploadError {
    /// Create an Io error
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a Store error
    pub fn store(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Store {
            key: key.into(),
            detail: detail.into(),
        }
    }
}
