//! Minimal structural diff between two documents.
//!
//! Objects are compared key by key; anything else (arrays included) is compared as a
//! whole and reported as one change at its pointer.

use crate::document::{pointer_push, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    Added { value: Value },
    Removed { value: Value },
    Changed { from: Value, to: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// JSON pointer; empty string is the document root
    pub path: String,
    #[serde(flatten)]
    pub change: Change,
}

/// Entries come out in sorted key order, so equal inputs always give equal diffs.
pub fn diff_documents(before: &Document, after: &Document) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    diff_at("", before, after, &mut out);
    out
}

fn diff_at(path: &str, before: &Value, after: &Value, out: &mut Vec<DiffEntry>) {
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, old_value) in old {
                let child = pointer_push(path, key);
                match new.get(key) {
                    Some(new_value) => diff_at(&child, old_value, new_value, out),
                    None => out.push(DiffEntry {
                        path: child,
                        change: Change::Removed {
                            value: old_value.clone(),
                        },
                    }),
                }
            }
            for (key, new_value) in new {
                if !old.contains_key(key) {
                    out.push(DiffEntry {
                        path: pointer_push(path, key),
                        change: Change::Added {
                            value: new_value.clone(),
                        },
                    });
                }
            }
        }
        (old, new) if old != new => out.push(DiffEntry {
            path: path.to_string(),
            change: Change::Changed {
                from: old.clone(),
                to: new.clone(),
            },
        }),
        _ => {}
    }
}

/// Replay `diff` onto `before`. Used to check that a diff fully describes a transition.
pub fn apply_diff(before: &Document, diff: &[DiffEntry]) -> Document {
    let mut doc = before.clone();
    for entry in diff {
        match &entry.change {
            Change::Added { value } | Change::Changed { to: value, .. } => {
                set_pointer(&mut doc, &entry.path, value.clone());
            }
            Change::Removed { .. } => remove_pointer(&mut doc, &entry.path),
        }
    }
    doc
}

fn split_pointer(pointer: &str) -> Option<(&str, String)> {
    let idx = pointer.rfind('/')?;
    let last = pointer[idx + 1..].replace("~1", "/").replace("~0", "~");
    Some((&pointer[..idx], last))
}

fn set_pointer(doc: &mut Value, pointer: &str, value: Value) {
    if pointer.is_empty() {
        *doc = value;
        return;
    }
    let Some((parent, key)) = split_pointer(pointer) else {
        return;
    };
    if let Some(Value::Object(map)) = doc.pointer_mut(parent) {
        map.insert(key, value);
    }
}

fn remove_pointer(doc: &mut Value, pointer: &str) {
    let Some((parent, key)) = split_pointer(pointer) else {
        return;
    };
    if let Some(Value::Object(map)) = doc.pointer_mut(parent) {
        map.remove(&key);
    }
}
