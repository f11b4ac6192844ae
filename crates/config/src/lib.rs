//! Sluice Configuration
//!
//! JSON-based configuration loading with sensible defaults. Singer targets
//! conventionally take a JSON config file via `-c`, so that is the on-disk
//! format here; only `s3_bucket` is required.
//!
//! # Example Minimal Config
//!
//! ```json
//! {"s3_bucket": "my-data-lake"}
//! ```
//!
//! # Example Full Config
//!
//! ```json
//! {
//!   "s3_bucket": "my-data-lake",
//!   "s3_filename_prefix": "export_",
//!   "path_specification": "{stream}/{created_at[year]}/{export_time}",
//!   "compression": "gzip",
//!   "encryption_type": "kms",
//!   "encryption_key": "alias/my-key",
//!   "add_metadata_columns": true,
//!   "region": "eu-west-1",
//!   "max_file_size_mb": 500
//! }
//! ```

mod error;

pub use error::{ConfigError, Result};

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

/// Default maximum buffer size before rotation, in MiB
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 1000;

/// Compression codec for the columnar output
///
/// Anything outside this set is rejected at parse time - an unsupported
/// compression value is a configuration error, raised before any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// No compression (default)
    #[default]
    None,
    /// Snappy (fast, moderate ratio)
    Snappy,
    /// Gzip (slower, widely supported)
    Gzip,
    /// Brotli (slowest, best ratio)
    Brotli,
}

impl Compression {
    /// Filename suffix appended to both the encoded file and the remote key,
    /// or `None` when uncompressed
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Snappy => Some("snappy"),
            Self::Gzip => Some("gz"),
            Self::Brotli => Some("br"),
        }
    }
}

/// Server-side encryption mode for uploaded objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionType {
    /// No server-side encryption (default)
    #[default]
    None,
    /// SSE-KMS, optionally with a specific key id in `encryption_key`
    Kms,
}

/// Main configuration structure
///
/// All keys except `s3_bucket` are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination bucket (required)
    pub s3_bucket: String,

    /// Prefix prepended to the filename component of every remote key
    pub s3_filename_prefix: Option<String>,

    /// Path template; defaults to `{stream}/{export_time}` when unset
    pub path_specification: Option<String>,

    /// Compression codec for the columnar output
    pub compression: Compression,

    /// Server-side encryption mode
    pub encryption_type: EncryptionType,

    /// KMS key id used when `encryption_type` is `kms`
    pub encryption_key: Option<String>,

    /// Add the `_sdc_*` metadata columns to every schema and record
    pub add_metadata_columns: bool,

    /// AWS region
    pub region: Option<String>,

    /// Custom S3 endpoint (for S3-compatible services like MinIO)
    pub endpoint_url: Option<String>,

    /// Static credentials; environment/instance role is used when unset
    pub aws_access_key_id: Option<String>,

    /// Static credentials; environment/instance role is used when unset
    pub aws_secret_access_key: Option<String>,

    /// Maximum buffer size in MiB before rotation to the object store
    pub max_file_size_mb: Option<u64>,
}

impl Config {
    /// Load configuration from a JSON file and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid JSON,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, reporting every problem at once
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.s3_bucket.is_empty() {
            problems.push("Required key is missing from config: [s3_bucket]".to_string());
        }

        if self.encryption_key.is_some() && self.encryption_type == EncryptionType::None {
            problems.push("encryption_key is set but encryption_type is 'none'".to_string());
        }

        if self.max_file_size_mb == Some(0) {
            problems.push("max_file_size_mb must be greater than zero".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::invalid(problems))
        }
    }

    /// Effective rotation threshold in MiB
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size_mb.unwrap_or(DEFAULT_MAX_FILE_SIZE_MB)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
