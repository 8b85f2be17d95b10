//! Null filtering of validated output
//!
//! Runs after a successful validation (and after extension). Removes every
//! object key whose value is `null`, at any depth. Array elements are
//! descended into but never removed.

use serde_json::Value;

/// Strips null-valued object keys in place
pub fn filter_null(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                filter_null(v);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                filter_null(item);
            }
        }
        _ => {}
    }
}
