//! Record flattening
//!
//! Nested objects collapse into a single level with `__`-joined key paths;
//! arrays and any other non-object leaves are kept as-is (arrays serialize
//! to JSON strings at encode time via the column builder, but here they stay
//! structured). Keys come out sorted, so two records that differ only in
//! field order flatten identically.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Longest flattened key emitted verbatim; anything at or above this gets
/// its path segments abbreviated left to right until it fits.
const MAX_KEY_LENGTH: usize = 255;

const SEPARATOR: &str = "__";

/// A single-level record with deterministically ordered keys
pub type FlattenedRecord = BTreeMap<String, Value>;

/// Collapse a record into one level of `__`-joined keys
pub fn flatten(record: &Map<String, Value>) -> FlattenedRecord {
    let mut out = BTreeMap::new();
    flatten_into(&mut out, &[], record);
    out
}

fn flatten_into(out: &mut FlattenedRecord, parents: &[&str], object: &Map<String, Value>) {
    let mut keys: Vec<&String> = object.keys().collect();
    keys.sort();

    for key in keys {
        let value = &object[key];
        let mut path: Vec<&str> = parents.to_vec();
        path.push(key);

        match value {
            Value::Object(inner) => flatten_into(out, &path, inner),
            Value::Array(items) => {
                // arrays are leaves; persisted as their JSON text
                let text = serde_json::to_string(items).unwrap_or_default();
                out.insert(join_key(&path), Value::String(text));
            }
            other => {
                out.insert(join_key(&path), other.clone());
            }
        }
    }
}

/// Join path segments, abbreviating from the left while the result is too long
fn join_key(path: &[&str]) -> String {
    let mut segments: Vec<String> = path.iter().map(|s| s.to_string()).collect();

    let mut index = 0;
    while segments.join(SEPARATOR).len() >= MAX_KEY_LENGTH && index < segments.len() {
        segments[index] = abbreviate(&segments[index]);
        index += 1;
    }

    segments.join(SEPARATOR)
}

/// Shorten one segment to its camel-case initials
///
/// `customer_billing_address` becomes `cba`; a segment with no usable
/// initials falls back to its first three characters.
fn abbreviate(segment: &str) -> String {
    let camelized: String = segment
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    let initials: String = camelized
        .chars()
        .filter(|c| !c.is_ascii_lowercase())
        .collect();

    if initials.len() > 1 {
        initials.to_lowercase()
    } else {
        segment.chars().take(3).collect::<String>().to_lowercase()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "flatten_test.rs"]
mod flatten_test;
