use serde_json::{json, Map, Value};

use super::*;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn test_flat_record_passes_through() {
    let record = object(json!({"id": 1, "name": "anna", "active": true}));
    let flat = flatten(&record);

    assert_eq!(flat.get("id"), Some(&json!(1)));
    assert_eq!(flat.get("name"), Some(&json!("anna")));
    assert_eq!(flat.get("active"), Some(&json!(true)));
}

#[test]
fn test_nested_objects_join_with_double_underscore() {
    let record = object(json!({
        "id": 7,
        "address": {"city": "oslo", "geo": {"lat": 59.9, "lon": 10.7}}
    }));
    let flat = flatten(&record);

    let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["address__city", "address__geo__lat", "address__geo__lon", "id"]
    );
    assert_eq!(flat.get("address__geo__lat"), Some(&json!(59.9)));
}

#[test]
fn test_arrays_become_json_text() {
    let record = object(json!({"tags": ["a", "b"], "id": 1}));
    let flat = flatten(&record);

    assert_eq!(flat.get("tags"), Some(&json!(r#"["a","b"]"#)));
}

#[test]
fn test_null_and_empty_object() {
    let record = object(json!({"gone": null, "empty": {}}));
    let flat = flatten(&record);

    assert_eq!(flat.get("gone"), Some(&Value::Null));
    // empty nested objects contribute no columns
    assert!(!flat.keys().any(|k| k.starts_with("empty")));
}

#[test]
fn test_field_order_does_not_matter() {
    let a = object(json!({"b": {"y": 2, "x": 1}, "a": 0}));
    let b = object(json!({"a": 0, "b": {"x": 1, "y": 2}}));

    assert_eq!(flatten(&a), flatten(&b));
}

#[test]
fn test_long_single_segment_abbreviates_to_three_chars() {
    let long = "x".repeat(300);
    let record = object(json!({ long.clone(): {"id": 1} }));
    let flat = flatten(&record);

    // one run of lowercase yields a single initial, so the three-character
    // fallback applies before joining with the child
    let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["xxx__id"]);
}

#[test]
fn test_abbreviation_walks_segments_left_to_right() {
    let long_child = "z".repeat(260);
    let record = object(json!({
        "customer_billing_address": { long_child.clone(): 1 }
    }));
    let flat = flatten(&record);

    // first segment camelizes to CustomerBillingAddress -> initials "cba";
    // still too long, so the second falls back to its first three characters
    let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["cba__zzz"]);
}

#[test]
fn test_short_keys_are_never_abbreviated() {
    let record = object(json!({"customer_billing_address": {"id": 1}}));
    let flat = flatten(&record);

    assert!(flat.contains_key("customer_billing_address__id"));
}
