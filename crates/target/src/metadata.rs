//! Lineage metadata columns
//!
//! When `add_metadata_columns` is on, every persisted record carries a fixed
//! set of `_sdc_*` fields describing when it was seen and where it came
//! from, and the stream schema is widened to admit them. When it is off,
//! any `_sdc_*` fields arriving from upstream are dropped instead.

use chrono::Utc;
use serde_json::{json, Map, Value};
use sluice_protocol::RecordMessage;

/// Every metadata column, in persisted order
pub const METADATA_FIELDS: [&str; 7] = [
    "_sdc_batched_at",
    "_sdc_deleted_at",
    "_sdc_extracted_at",
    "_sdc_primary_key",
    "_sdc_received_at",
    "_sdc_sequence",
    "_sdc_table_version",
];

/// Widen a stream schema so validation admits the metadata columns
pub fn extend_schema(schema: &mut Value) {
    let Some(root) = schema.as_object_mut() else {
        return;
    };
    let properties = root
        .entry("properties")
        .or_insert_with(|| json!({}));
    let Some(properties) = properties.as_object_mut() else {
        return;
    };

    let nullable_string = json!({"type": ["null", "string"]});
    let nullable_timestamp = json!({"type": ["null", "string"], "format": "date-time"});
    let nullable_integer = json!({"type": ["null", "integer"]});

    properties.insert("_sdc_batched_at".into(), nullable_timestamp.clone());
    properties.insert("_sdc_deleted_at".into(), nullable_string.clone());
    properties.insert("_sdc_extracted_at".into(), nullable_timestamp.clone());
    properties.insert("_sdc_primary_key".into(), nullable_string);
    properties.insert("_sdc_received_at".into(), nullable_timestamp);
    properties.insert("_sdc_sequence".into(), nullable_integer.clone());
    properties.insert("_sdc_table_version".into(), nullable_integer);
}

/// Stamp the metadata columns onto a record
pub fn extend_record(
    record: &mut Map<String, Value>,
    message: &RecordMessage,
    key_properties: &[String],
) {
    let now = Utc::now().to_rfc3339();

    let deleted_at = record
        .get("_sdc_deleted_at")
        .cloned()
        .unwrap_or(Value::Null);
    let primary_key = if key_properties.is_empty() {
        Value::Null
    } else {
        Value::String(key_properties.join(","))
    };

    record.insert("_sdc_batched_at".into(), json!(now));
    record.insert("_sdc_deleted_at".into(), deleted_at);
    record.insert(
        "_sdc_extracted_at".into(),
        message
            .time_extracted
            .as_ref()
            .map_or(Value::Null, |t| json!(t)),
    );
    record.insert("_sdc_primary_key".into(), primary_key);
    record.insert("_sdc_received_at".into(), json!(now));
    record.insert("_sdc_sequence".into(), json!(Utc::now().timestamp_millis()));
    record.insert(
        "_sdc_table_version".into(),
        message.version.map_or(Value::Null, |v| json!(v)),
    );
}

/// Drop any metadata columns that arrived from upstream
pub fn strip_record(record: &mut Map<String, Value>) {
    for field in METADATA_FIELDS {
        record.remove(field);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn message(record: Value) -> RecordMessage {
        RecordMessage {
            stream: "orders".into(),
            record: record.as_object().cloned().unwrap(),
            time_extracted: Some("2024-01-01T00:00:00Z".into()),
            version: Some(3),
        }
    }

    #[test]
    fn test_extend_record_adds_every_field() {
        let msg = message(json!({"id": 1}));
        let mut record = msg.record.clone();
        extend_record(&mut record, &msg, &["id".to_string()]);

        for field in METADATA_FIELDS {
            assert!(record.contains_key(field), "missing {field}");
        }
        assert_eq!(record["_sdc_primary_key"], json!("id"));
        assert_eq!(record["_sdc_extracted_at"], json!("2024-01-01T00:00:00Z"));
        assert_eq!(record["_sdc_table_version"], json!(3));
        assert!(record["_sdc_batched_at"].is_string());
        assert!(record["_sdc_sequence"].is_i64());
    }

    #[test]
    fn test_primary_key_joins_declared_properties() {
        let msg = message(json!({"a": 1, "b": 2}));
        let mut record = msg.record.clone();
        extend_record(&mut record, &msg, &["a".to_string(), "b".to_string()]);

        assert_eq!(record["_sdc_primary_key"], json!("a,b"));
    }

    #[test]
    fn test_deleted_at_passes_through() {
        let msg = message(json!({"id": 1, "_sdc_deleted_at": "2024-06-01T00:00:00Z"}));
        let mut record = msg.record.clone();
        extend_record(&mut record, &msg, &[]);

        assert_eq!(record["_sdc_deleted_at"], json!("2024-06-01T00:00:00Z"));
        assert_eq!(record["_sdc_primary_key"], Value::Null);
    }

    #[test]
    fn test_strip_removes_upstream_metadata() {
        let mut record = json!({"id": 1, "_sdc_sequence": 9, "_sdc_batched_at": "x"})
            .as_object()
            .cloned()
            .unwrap();
        strip_record(&mut record);

        assert_eq!(record.len(), 1);
        assert!(record.contains_key("id"));
    }

    #[test]
    fn test_extend_schema_widens_properties() {
        let mut schema = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}}
        });
        extend_schema(&mut schema);

        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("id"));
        for field in METADATA_FIELDS {
            assert!(props.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn test_extend_schema_without_properties_block() {
        let mut schema = json!({"type": "object"});
        extend_schema(&mut schema);

        assert!(schema["properties"]["_sdc_received_at"].is_object());
    }
}
