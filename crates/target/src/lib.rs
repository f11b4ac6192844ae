//! Sluice - Target engine
//!
//! The message-driven routing and rotation core: consumes decoded Singer
//! messages in order, tracks per-stream schemas, validates and flattens
//! records, routes them into size-bounded local JSONL buffers under
//! template-driven paths, and hands finished buffers to the upload pipeline.
//!
//! # Control flow
//!
//! ```text
//! [messages] -> Router
//!     SCHEMA  -> SchemaRegistry (replace schema, reset stream target)
//!     RECORD  -> validate -> flatten -> template -> RotationManager.append
//!                    |                                   | (size exceeded)
//!                    +-- clears pending checkpoint       v
//!                                                  Upload Pipeline
//!     STATE   -> pending checkpoint
//!     (end)   -> finalize all buffers -> emit checkpoint
//! ```
//!
//! Processing is single-pass and strictly ordered; an upload triggered by
//! rotation completes before the next message is handled.

mod error;
mod flatten;
mod metadata;
mod rotation;
mod router;
mod schema;
mod template;

pub use error::TargetError;
pub use flatten::{flatten, FlattenedRecord};
pub use metadata::METADATA_FIELDS;
pub use rotation::{FinishedBuffer, OutputTarget, RotationManager};
pub use router::Router;
pub use schema::{SchemaRegistry, StreamState};
pub use template::{render, target_path, temp_file_path, RenderContext, DEFAULT_PATH_SPECIFICATION};
