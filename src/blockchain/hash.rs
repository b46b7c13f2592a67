use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hash of an empty transaction set and the genesis block's parent
pub fn zero_hash() -> String {
    "0".repeat(64)
}

/// Renders a JSON value with lexicographically sorted keys and no whitespace
pub fn canonical_json(value: Value) -> String {
    sort_keys(value).to_string()
}

/// SHA-256 of the canonical serialization of `value`, as lowercase hex
pub fn digest(value: Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    format!("{:x}", hasher.finalize())
}

// Map iteration order depends on serde_json's `preserve_order` feature.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
