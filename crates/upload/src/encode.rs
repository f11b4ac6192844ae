//! JSONL buffer to Parquet conversion
//!
//! Reads a newline-delimited JSON buffer, normalizes it into a flat table
//! (one row per line, columns = the sorted union of observed keys), and
//! writes a single Parquet file with the configured codec.
//!
//! Column types are inferred from the observed values: a column whose
//! non-null values are all booleans, all integers, or all numbers becomes
//! BOOLEAN / INT64 / DOUBLE respectively; anything mixed falls back to UTF8
//! with non-string values JSON-encoded.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, GzipLevel};
use parquet::file::properties::WriterProperties;
use serde_json::{Map, Value};
use sluice_config::Compression;

use crate::error::UploadError;

/// Summary of one encoded buffer
#[derive(Debug, Clone, Copy)]
pub struct EncodedFile {
    /// Rows written
    pub rows: usize,
    /// Size of the encoded file in bytes
    pub bytes: u64,
}

/// Encode a JSONL buffer file to Parquet
///
/// Returns the row count and encoded size. An empty buffer produces no
/// output file and a zero-row summary.
///
/// # Errors
///
/// Fails if the buffer cannot be read, any line is not a JSON object, or
/// the Parquet write fails.
pub fn encode_to_parquet(
    jsonl_path: &Path,
    out_path: &Path,
    compression: Compression,
) -> Result<EncodedFile, UploadError> {
    let rows = read_rows(jsonl_path)?;
    if rows.is_empty() {
        return Ok(EncodedFile { rows: 0, bytes: 0 });
    }

    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
    for name in &columns {
        let kind = infer_column(&rows, name);
        fields.push(Field::new(*name, kind.data_type(), true));
        arrays.push(build_column(&rows, name, kind));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;

    let file = File::create(out_path).map_err(|e| UploadError::io(out_path.display().to_string(), e))?;
    let props = WriterProperties::builder()
        .set_compression(to_parquet(compression))
        .build();

    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    let bytes = fs::metadata(out_path)
        .map_err(|e| UploadError::io(out_path.display().to_string(), e))?
        .len();

    Ok(EncodedFile {
        rows: rows.len(),
        bytes,
    })
}

fn read_rows(path: &Path) -> Result<Vec<Map<String, Value>>, UploadError> {
    let file = File::open(path).map_err(|e| UploadError::io(path.display().to_string(), e))?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| UploadError::io(path.display().to_string(), e))?;
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(row)) => rows.push(row),
            _ => {
                return Err(UploadError::InvalidBufferLine {
                    path: path.display().to_string(),
                    line: i + 1,
                })
            }
        }
    }
    Ok(rows)
}

/// Inferred Arrow type for one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int,
    Float,
    Utf8,
}

impl ColumnKind {
    fn data_type(self) -> DataType {
        match self {
            Self::Bool => DataType::Boolean,
            Self::Int => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
        }
    }
}

fn infer_column(rows: &[Map<String, Value>], name: &str) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;

    for row in rows {
        let value = match row.get(name) {
            Some(Value::Null) | None => continue,
            Some(v) => v,
        };
        let observed = match value {
            Value::Bool(_) => ColumnKind::Bool,
            Value::Number(n) if n.as_i64().is_some() => ColumnKind::Int,
            Value::Number(_) => ColumnKind::Float,
            _ => ColumnKind::Utf8,
        };
        kind = Some(match kind {
            None => observed,
            Some(current) => merge(current, observed),
        });
        if kind == Some(ColumnKind::Utf8) {
            break;
        }
    }

    // An all-null column still needs a type; strings are the safest
    kind.unwrap_or(ColumnKind::Utf8)
}

fn merge(a: ColumnKind, b: ColumnKind) -> ColumnKind {
    use ColumnKind::*;
    match (a, b) {
        (Bool, Bool) => Bool,
        (Int, Int) => Int,
        (Int, Float) | (Float, Int) | (Float, Float) => Float,
        _ => Utf8,
    }
}

fn build_column(rows: &[Map<String, Value>], name: &str, kind: ColumnKind) -> ArrayRef {
    match kind {
        ColumnKind::Bool => {
            let values: Vec<Option<bool>> = rows
                .iter()
                .map(|row| row.get(name).and_then(Value::as_bool))
                .collect();
            Arc::new(BooleanArray::from(values))
        }
        ColumnKind::Int => {
            let values: Vec<Option<i64>> = rows
                .iter()
                .map(|row| row.get(name).and_then(Value::as_i64))
                .collect();
            Arc::new(Int64Array::from(values))
        }
        ColumnKind::Float => {
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|row| row.get(name).and_then(Value::as_f64))
                .collect();
            Arc::new(Float64Array::from(values))
        }
        ColumnKind::Utf8 => {
            let values: Vec<Option<String>> = rows
                .iter()
                .map(|row| match row.get(name) {
                    Some(Value::Null) | None => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                })
                .collect();
            Arc::new(StringArray::from(values))
        }
    }
}

fn to_parquet(compression: Compression) -> parquet::basic::Compression {
    match compression {
        Compression::None => parquet::basic::Compression::UNCOMPRESSED,
        Compression::Snappy => parquet::basic::Compression::SNAPPY,
        Compression::Gzip => parquet::basic::Compression::GZIP(GzipLevel::default()),
        Compression::Brotli => parquet::basic::Compression::BROTLI(BrotliLevel::default()),
    }
}

#[cfg(test)]
#[path = "encode_test.rs"]
mod encode_test;
