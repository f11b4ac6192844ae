//! Sluice - Upload pipeline
//!
//! Converts finished JSONL buffer files into Parquet and uploads them to an
//! object store under their resolved remote key.
//!
//! ```text
//! [buffer.jsonl] --encode--> [buffer.parquet] --put--> s3://bucket/key.parquet[.gz]
//!        |                          |
//!        +-------- deleted on success --------+
//! ```
//!
//! The object store is behind the [`ObjectStore`] trait so the pipeline can
//! be exercised without network access; [`S3Store`] is the production
//! implementation.

mod encode;
mod error;
mod pipeline;
mod store;

pub use encode::{encode_to_parquet, EncodedFile};
pub use error::UploadError;
pub use pipeline::Pipeline;
pub use store::{MemoryStore, ObjectStore, S3Store};
