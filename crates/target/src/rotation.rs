//! Buffer files and size-based rotation
//!
//! Each stream appends flattened records to one local JSONL file. After
//! every append the file size is checked; once it crosses the configured
//! ceiling the buffer is handed back as finished and the next append starts
//! the file over under an incremented rotation index. Remote keys embed
//! that index so successive rotations of the same stream never collide:
//! `<dir><index>_<file>`.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::error::TargetError;
use crate::flatten::FlattenedRecord;

const MILESTONE_MB: u64 = 10;

/// Where one stream's records land, locally and remotely
#[derive(Debug, Clone)]
pub struct OutputTarget {
    pub local_path: PathBuf,
    pub remote_dir: String,
    pub remote_file: String,
}

/// A buffer ready for upload
#[derive(Debug)]
pub struct FinishedBuffer {
    pub local_path: PathBuf,
    pub remote_key: String,
}

struct BufferState {
    remote_dir: String,
    remote_file: String,
    rotation_index: u32,
    milestone_mb: u64,
}

impl BufferState {
    fn remote_key(&self) -> String {
        format!("{}{}_{}", self.remote_dir, self.rotation_index, self.remote_file)
    }
}

/// Tracks every open buffer and decides when each one is full
pub struct RotationManager {
    max_file_size_mb: u64,
    buffers: HashMap<PathBuf, BufferState>,
}

impl RotationManager {
    pub fn new(max_file_size_mb: u64) -> Self {
        Self {
            max_file_size_mb,
            buffers: HashMap::new(),
        }
    }

    /// Append one record to its buffer
    ///
    /// Returns the finished buffer when the append pushed the file over the
    /// size ceiling. The caller uploads (and deletes) it; the next append to
    /// the same target recreates the file under the next rotation index.
    pub fn append(
        &mut self,
        target: &OutputTarget,
        record: &FlattenedRecord,
    ) -> Result<Option<FinishedBuffer>, TargetError> {
        let state = self
            .buffers
            .entry(target.local_path.clone())
            .or_insert_with(|| {
                tracing::info!(path = %target.local_path.display(), "opening buffer file");
                BufferState {
                    remote_dir: target.remote_dir.clone(),
                    remote_file: target.remote_file.clone(),
                    rotation_index: 1,
                    milestone_mb: 0,
                }
            });

        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target.local_path)
            .map_err(|e| TargetError::buffer_io(&target.local_path, e))?;
        writeln!(file, "{line}").map_err(|e| TargetError::buffer_io(&target.local_path, e))?;

        let size = file
            .metadata()
            .map_err(|e| TargetError::buffer_io(&target.local_path, e))?
            .len();
        let size_mb = size >> 20;

        if size_mb >= state.milestone_mb + MILESTONE_MB {
            state.milestone_mb = size_mb - (size_mb % MILESTONE_MB);
            tracing::info!(
                size_mb,
                path = %target.local_path.display(),
                "buffer growing"
            );
        }

        if size_mb > self.max_file_size_mb {
            tracing::info!(
                max_file_size_mb = self.max_file_size_mb,
                path = %target.local_path.display(),
                "buffer full, rotating"
            );
            let finished = FinishedBuffer {
                local_path: target.local_path.clone(),
                remote_key: state.remote_key(),
            };
            state.rotation_index += 1;
            state.milestone_mb = 0;
            return Ok(Some(finished));
        }

        Ok(None)
    }

    /// Drain every buffer that still has a file on disk
    ///
    /// Called at end of input. Buffers whose file was already uploaded and
    /// deleted by a rotation (with nothing appended since) are skipped.
    pub fn finalize_all(&mut self) -> Vec<FinishedBuffer> {
        let mut finished: Vec<FinishedBuffer> = self
            .buffers
            .drain()
            .filter(|(path, _)| path.exists())
            .map(|(path, state)| FinishedBuffer {
                remote_key: state.remote_key(),
                local_path: path,
            })
            .collect();
        finished.sort_by(|a, b| a.local_path.cmp(&b.local_path));
        finished
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "rotation_test.rs"]
mod rotation_test;
