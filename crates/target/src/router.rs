//! Message router
//!
//! Drives the whole run: one [`Router`] consumes decoded messages in input
//! order, updates the schema registry, turns records into buffered rows, and
//! awaits any rotation-triggered upload before touching the next message.
//! When input ends, [`Router::finish`] drains the open buffers and yields
//! the checkpoint to emit, if any.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Local;
use serde_json::Value;
use sluice_config::Config;
use sluice_protocol::{Message, RecordMessage, SchemaMessage};
use sluice_upload::Pipeline;

use crate::error::TargetError;
use crate::flatten::flatten;
use crate::metadata;
use crate::rotation::{OutputTarget, RotationManager};
use crate::schema::SchemaRegistry;
use crate::template::{self, RenderContext};

pub struct Router {
    config: Config,
    registry: SchemaRegistry,
    rotation: RotationManager,
    pipeline: Pipeline,
    targets: HashMap<String, OutputTarget>,
    pending_state: Option<Value>,
    export_time: String,
    buffer_dir: PathBuf,
}

impl Router {
    pub fn new(config: Config, pipeline: Pipeline) -> Self {
        let registry = SchemaRegistry::new(config.add_metadata_columns);
        let rotation = RotationManager::new(config.max_file_size_mb());
        Self {
            config,
            registry,
            rotation,
            pipeline,
            targets: HashMap::new(),
            pending_state: None,
            export_time: Local::now().format("%Y%m%dT%H%M%S").to_string(),
            buffer_dir: std::env::temp_dir(),
        }
    }

    /// Pin the export timestamp instead of taking the wall clock
    pub fn with_export_time(mut self, export_time: impl Into<String>) -> Self {
        self.export_time = export_time.into();
        self
    }

    /// Buffer files go here instead of the system temp directory
    pub fn with_buffer_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.buffer_dir = dir.into();
        self
    }

    /// Handle one message; any triggered upload completes before returning
    pub async fn handle(&mut self, message: Message) -> Result<(), TargetError> {
        match message {
            Message::Schema(schema) => self.handle_schema(schema),
            Message::Record(record) => self.handle_record(record).await,
            Message::State(state) => {
                tracing::debug!(value = %state.value, "checkpoint received");
                self.pending_state = Some(state.value);
                Ok(())
            }
            Message::ActivateVersion(activate) => {
                tracing::debug!(
                    stream = %activate.stream,
                    version = activate.version,
                    "ACTIVATE_VERSION acknowledged"
                );
                Ok(())
            }
            Message::Unknown { message_type, raw } => {
                tracing::warn!(message_type = %message_type, message = %raw, "unknown message type, skipping");
                Ok(())
            }
        }
    }

    fn handle_schema(&mut self, msg: SchemaMessage) -> Result<(), TargetError> {
        self.registry
            .register(&msg.stream, msg.schema, msg.key_properties)?;
        // records after a schema change resolve their target afresh
        self.targets.remove(&msg.stream);
        Ok(())
    }

    async fn handle_record(&mut self, msg: RecordMessage) -> Result<(), TargetError> {
        let key_properties = {
            let state = self.registry.require(&msg.stream)?;
            state.validate(&msg.stream, &Value::Object(msg.record.clone()))?;
            state.key_properties.clone()
        };

        let mut record = msg.record.clone();
        if self.config.add_metadata_columns {
            metadata::extend_record(&mut record, &msg, &key_properties);
        } else {
            metadata::strip_record(&mut record);
        }
        let flattened = flatten(&record);

        let target = match self.targets.get(&msg.stream) {
            Some(target) => target.clone(),
            None => {
                let ctx = RenderContext {
                    stream: &msg.stream,
                    record: &flattened,
                    key_properties: &key_properties,
                    export_time: &self.export_time,
                };
                let template = self.config.path_specification.as_deref();
                let file_name = template::temp_file_path(template, &ctx)?;
                let (remote_dir, remote_file) = template::target_path(
                    template,
                    &ctx,
                    self.config.s3_filename_prefix.as_deref(),
                )?;
                let target = OutputTarget {
                    local_path: self.buffer_dir.join(file_name),
                    remote_dir,
                    remote_file,
                };
                tracing::info!(
                    stream = %msg.stream,
                    local = %target.local_path.display(),
                    remote = %format!("{}{}", target.remote_dir, target.remote_file),
                    "resolved output target"
                );
                self.targets.insert(msg.stream.clone(), target.clone());
                target
            }
        };

        if let Some(finished) = self.rotation.append(&target, &flattened)? {
            self.pipeline
                .upload(&finished.local_path, &finished.remote_key)
                .await?;
        }

        // a checkpoint only survives the run if no record follows it
        self.pending_state = None;
        Ok(())
    }

    /// Drain open buffers and return the checkpoint to emit
    pub async fn finish(mut self) -> Result<Option<Value>, TargetError> {
        for finished in self.rotation.finalize_all() {
            self.pipeline
                .upload(&finished.local_path, &finished.remote_key)
                .await?;
        }
        Ok(self.pending_state)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;
