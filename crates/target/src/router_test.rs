use std::fs;
use std::sync::Arc;

use serde_json::json;
use sluice_config::Config;
use sluice_protocol::parse_message;
use sluice_upload::{MemoryStore, ObjectStore, Pipeline};
use tempfile::{tempdir, TempDir};

use super::*;
use crate::error::TargetError;

const EXPORT_TIME: &str = "20240101T000000";

struct Fixture {
    router: Router,
    store: Arc<MemoryStore>,
    _dir: TempDir,
}

fn fixture(config: Config) -> Fixture {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        config.compression,
    );
    let router = Router::new(config, pipeline)
        .with_export_time(EXPORT_TIME)
        .with_buffer_dir(dir.path());
    Fixture {
        router,
        store,
        _dir: dir,
    }
}

fn basic_config() -> Config {
    serde_json::from_value(json!({"s3_bucket": "bkt"})).unwrap()
}

async fn feed(router: &mut Router, line: &str) -> Result<(), TargetError> {
    router.handle(parse_message(line).unwrap()).await
}

fn orders_schema_line() -> String {
    json!({
        "type": "SCHEMA",
        "stream": "orders",
        "schema": {
            "type": "object",
            "properties": {"id": {"type": "integer"}, "region": {"type": "string"}},
            "required": ["id"]
        },
        "key_properties": ["id"]
    })
    .to_string()
}

fn record_line(id: i64) -> String {
    json!({"type": "RECORD", "stream": "orders", "record": {"id": id, "region": "eu"}})
        .to_string()
}

#[tokio::test]
async fn test_record_before_schema_is_fatal() {
    let mut fx = fixture(basic_config());

    let err = feed(&mut fx.router, &record_line(1)).await.unwrap_err();
    assert!(matches!(err, TargetError::RecordBeforeSchema { stream } if stream == "orders"));
}

#[tokio::test]
async fn test_end_to_end_upload_and_cleared_checkpoint() {
    let mut fx = fixture(basic_config());

    feed(&mut fx.router, &orders_schema_line()).await.unwrap();
    feed(&mut fx.router, &record_line(1)).await.unwrap();
    feed(
        &mut fx.router,
        &json!({"type": "STATE", "value": {"bookmark": 7}}).to_string(),
    )
    .await
    .unwrap();
    feed(&mut fx.router, &record_line(2)).await.unwrap();

    let checkpoint = fx.router.finish().await.unwrap();

    // a record followed the checkpoint, so nothing is emitted
    assert_eq!(checkpoint, None);
    assert_eq!(
        fx.store.keys(),
        vec![format!("orders/1_{EXPORT_TIME}.parquet")]
    );
}

#[tokio::test]
async fn test_trailing_checkpoint_survives() {
    let mut fx = fixture(basic_config());

    feed(&mut fx.router, &orders_schema_line()).await.unwrap();
    feed(&mut fx.router, &record_line(1)).await.unwrap();
    feed(
        &mut fx.router,
        &json!({"type": "STATE", "value": {"bookmark": 7}}).to_string(),
    )
    .await
    .unwrap();

    let checkpoint = fx.router.finish().await.unwrap();
    assert_eq!(checkpoint, Some(json!({"bookmark": 7})));
}

#[tokio::test]
async fn test_validation_failure_is_fatal() {
    let mut fx = fixture(basic_config());

    feed(&mut fx.router, &orders_schema_line()).await.unwrap();
    let line = json!({"type": "RECORD", "stream": "orders", "record": {"region": "eu"}})
        .to_string();

    let err = feed(&mut fx.router, &line).await.unwrap_err();
    assert!(matches!(err, TargetError::Validation { .. }));
}

#[tokio::test]
async fn test_unknown_and_activate_version_are_ignored() {
    let mut fx = fixture(basic_config());

    feed(&mut fx.router, &orders_schema_line()).await.unwrap();
    feed(
        &mut fx.router,
        &json!({"type": "BATCH", "stream": "orders"}).to_string(),
    )
    .await
    .unwrap();
    feed(
        &mut fx.router,
        &json!({"type": "ACTIVATE_VERSION", "stream": "orders", "version": 1}).to_string(),
    )
    .await
    .unwrap();

    let checkpoint = fx.router.finish().await.unwrap();
    assert_eq!(checkpoint, None);
    assert!(fx.store.keys().is_empty());
}

#[tokio::test]
async fn test_metadata_columns_are_persisted_when_enabled() {
    let config: Config =
        serde_json::from_value(json!({"s3_bucket": "bkt", "add_metadata_columns": true}))
            .unwrap();
    let mut fx = fixture(config);

    feed(&mut fx.router, &orders_schema_line()).await.unwrap();
    feed(&mut fx.router, &record_line(1)).await.unwrap();

    let buffer = fx
        ._dir
        .path()
        .join(format!("orders_{EXPORT_TIME}.jsonl"));
    let content = fs::read_to_string(buffer).unwrap();
    let row: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();

    assert_eq!(row["_sdc_primary_key"], json!("id"));
    assert!(row["_sdc_batched_at"].is_string());
    assert!(row["_sdc_received_at"].is_string());
    assert!(row["_sdc_sequence"].is_i64());
    assert_eq!(row["_sdc_deleted_at"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_upstream_metadata_is_stripped_when_disabled() {
    let mut fx = fixture(basic_config());

    feed(&mut fx.router, &orders_schema_line()).await.unwrap();
    let line = json!({
        "type": "RECORD",
        "stream": "orders",
        "record": {"id": 1, "region": "eu", "_sdc_sequence": 99}
    })
    .to_string();
    feed(&mut fx.router, &line).await.unwrap();

    let buffer = fx
        ._dir
        .path()
        .join(format!("orders_{EXPORT_TIME}.jsonl"));
    let content = fs::read_to_string(buffer).unwrap();
    let row: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();

    assert!(row.get("_sdc_sequence").is_none());
    assert_eq!(row["id"], json!(1));
}

#[tokio::test]
async fn test_key_property_template_routes_by_record_value() {
    let config: Config = serde_json::from_value(json!({
        "s3_bucket": "bkt",
        "path_specification": "exports/{region}/{stream}"
    }))
    .unwrap();
    let mut fx = fixture(config);

    let schema = json!({
        "type": "SCHEMA",
        "stream": "orders",
        "schema": {"type": "object", "properties": {"id": {"type": "integer"}, "region": {"type": "string"}}},
        "key_properties": ["region"]
    })
    .to_string();
    feed(&mut fx.router, &schema).await.unwrap();
    feed(&mut fx.router, &record_line(1)).await.unwrap();

    fx.router.finish().await.unwrap();
    assert_eq!(fx.store.keys(), vec!["exports/eu/1_orders.parquet"]);
}

#[tokio::test]
async fn test_filename_prefix_lands_on_remote_file() {
    let config: Config = serde_json::from_value(json!({
        "s3_bucket": "bkt",
        "s3_filename_prefix": "exp-",
        "compression": "gzip"
    }))
    .unwrap();
    let mut fx = fixture(config);

    feed(&mut fx.router, &orders_schema_line()).await.unwrap();
    feed(&mut fx.router, &record_line(1)).await.unwrap();

    fx.router.finish().await.unwrap();
    assert_eq!(
        fx.store.keys(),
        vec![format!("orders/1_exp-{EXPORT_TIME}.parquet.gz")]
    );
}

#[tokio::test]
async fn test_multiple_streams_get_separate_buffers() {
    let mut fx = fixture(basic_config());

    feed(&mut fx.router, &orders_schema_line()).await.unwrap();
    let users_schema = json!({
        "type": "SCHEMA",
        "stream": "users",
        "schema": {"type": "object", "properties": {"id": {"type": "integer"}}},
        "key_properties": ["id"]
    })
    .to_string();
    feed(&mut fx.router, &users_schema).await.unwrap();

    feed(&mut fx.router, &record_line(1)).await.unwrap();
    feed(
        &mut fx.router,
        &json!({"type": "RECORD", "stream": "users", "record": {"id": 5}}).to_string(),
    )
    .await
    .unwrap();

    fx.router.finish().await.unwrap();
    let mut keys = fx.store.keys();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            format!("orders/1_{EXPORT_TIME}.parquet"),
            format!("users/1_{EXPORT_TIME}.parquet")
        ]
    );
}
