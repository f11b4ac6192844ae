//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse JSON (includes unsupported enum values such as an
    /// unknown compression codec)
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    /// One or more validation problems
    #[error("invalid configuration:\n   * {}", problems.join("\n   * "))]
    Invalid {
        /// Every problem found, reported together
        problems: Vec<String>,
    },
}

impl ConfigError {
    /// Create an Invalid error from a list of problems
    pub fn invalid(problems: Vec<String>) -> Self {
        Self::Invalid { problems }
    }
}
