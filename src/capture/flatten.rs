// src/capture/flatten.rs
//! Dot-path flattening
//!
//! Converts a nested record into a flat map keyed by dot-delimited
//! paths (`req.headers.user-agent`). Invariant: the output contains no
//! nested containers; every value is a string, number, or boolean.
//! Array elements are keyed by index; null leaves are dropped.

use serde_json::Value;
use std::collections::BTreeMap;

/// Flat mapping from dot-delimited paths to scalar values
pub type FlatRecord = BTreeMap<String, Value>;

/// Flatten a nested record into dot-path form.
///
/// A scalar root produces an empty record; the engine only ever
/// flattens `{req, res}` objects.
pub fn flatten(root: &Value) -> FlatRecord {
    let mut record = FlatRecord::new();
    match root {
        Value::Object(_) | Value::Array(_) => walk(root, String::new(), &mut record),
        _ => {}
    }
    record
}

fn walk(value: &Value, path: String, record: &mut FlatRecord) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, join(&path, key), record);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, join(&path, &index.to_string()), record);
            }
        }
        Value::Null => {}
        scalar => {
            record.insert(path, scalar.clone());
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
