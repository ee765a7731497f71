//! Open-schema configuration documents.
//!
//! A document is a generic tagged value (object, array, string, number, bool, null).
//! Object keys are kept in sorted order so serialization and hashing are deterministic.

use serde_json::{Map, Value};

/// Stored and merged configuration document.
pub type Document = Value;

pub fn empty_document() -> Document {
    Value::Object(Map::new())
}

/// Size of the compact JSON encoding, used for payload ceilings.
pub fn serialized_size(doc: &Document) -> usize {
    serde_json::to_vec(doc).map(|bytes| bytes.len()).unwrap_or(usize::MAX)
}

/// Nesting depth: scalars are 0, `{}`/`[]` are 1, `{"a":{}}` is 2.
pub fn nesting_depth(doc: &Document) -> usize {
    match doc {
        Value::Object(map) => 1 + map.values().map(nesting_depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(nesting_depth).max().unwrap_or(0),
        _ => 0,
    }
}

pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Append one RFC 6901 segment to a JSON pointer.
pub fn pointer_push(base: &str, segment: &str) -> String {
    let escaped = segment.replace('~', "~0").replace('/', "~1");
    format!("{}/{}", base, escaped)
}
