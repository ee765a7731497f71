//! Merge Engine
//!
//! Deep merge over an ordered list of documents, root first:
//! - objects merge recursively key by key
//! - arrays are replaced in full, never concatenated
//! - scalars (including null) are replaced
//!
//! An explicit `null` in a later document sets the merged value to `null`; it does not
//! remove the key. The same rule applies to patch writes in the config store.

use crate::document::{empty_document, Document};
use serde_json::Value;

/// Fold `docs` left to right into a single document.
pub fn merge(docs: &[Document]) -> Document {
    let mut acc = empty_document();
    for doc in docs {
        merge_into(&mut acc, doc);
    }
    acc
}

/// Merge `incoming` into `acc` in place.
pub fn merge_into(acc: &mut Document, incoming: &Document) {
    match (acc, incoming) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                let recurse = value.is_object() && target.get(key).map_or(false, Value::is_object);
                match target.get_mut(key) {
                    Some(existing) if recurse => merge_into(existing, value),
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => {
            *slot = value.clone();
        }
    }
}
