//! Buffer upload pipeline
//!
//! Encode a finished JSONL buffer to Parquet, push the bytes to the object
//! store, and delete both local artifacts. A buffer passes through here
//! exactly once; the caller must not append to it afterwards.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use sluice_config::Compression;

use crate::encode::encode_to_parquet;
use crate::error::UploadError;
use crate::store::ObjectStore;

/// Encode-and-upload pipeline for finished buffers
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    compression: Compression,
}

impl Pipeline {
    /// Create a pipeline writing through the given store
    pub fn new(store: Arc<dyn ObjectStore>, compression: Compression) -> Self {
        Self { store, compression }
    }

    /// Upload one finished buffer
    ///
    /// The remote key gains a `.parquet` extension plus the compression
    /// suffix, if any. On success the buffer file and the encoded file are
    /// removed.
    pub async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), UploadError> {
        let encoded_path = local_path.with_extension("parquet");
        let encoded = encode_to_parquet(local_path, &encoded_path, self.compression)?;

        if encoded.rows == 0 {
            tracing::debug!(path = %local_path.display(), "skipping empty buffer");
            remove(local_path)?;
            return Ok(());
        }

        let mut key = format!("{remote_key}.parquet");
        if let Some(suffix) = self.compression.suffix() {
            key = format!("{key}.{suffix}");
        }

        let body =
            fs::read(&encoded_path).map_err(|e| UploadError::io(encoded_path.display().to_string(), e))?;
        self.store.put(&key, body).await?;

        tracing::info!(
            key = %key,
            rows = encoded.rows,
            bytes = encoded.bytes,
            "uploaded buffer"
        );

        remove(local_path)?;
        remove(&encoded_path)?;

        Ok(())
    }
}

fn remove(path: &Path) -> Result<(), UploadError> {
    fs::remove_file(path).map_err(|e| UploadError::io(path.display().to_string(), e))
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
