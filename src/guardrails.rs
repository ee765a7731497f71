//! Guardrail Validator
//!
//! Structural and payload constraints checked before anything commits: cycles,
//! lineage depth, payload size, immutable keys, and document shape.

use crate::config::GuardrailConfig;
use crate::document::{kind_name, nesting_depth, pointer_push, serialized_size, Document};
use crate::error::ApiError;
use crate::types::NodeId;
use serde_json::Value;

/// Guardrail checks configured from `GuardrailConfig`.
#[derive(Debug, Clone)]
pub struct Guardrails {
    config: GuardrailConfig,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self::new(GuardrailConfig::default())
    }
}

impl Guardrails {
    pub fn new(config: GuardrailConfig) -> Self {
        Self { config }
    }

    pub fn max_depth(&self) -> usize {
        self.config.max_depth
    }

    pub fn immutable_keys(&self) -> &[String] {
        &self.config.immutable_keys
    }

    fn is_immutable(&self, key: &str) -> bool {
        self.config.immutable_keys.iter().any(|k| k == key)
    }

    /// Pure checks for a patch, run before any store access: size, then schema.
    pub fn validate_patch(&self, patch: &Document) -> Result<(), ApiError> {
        self.check_payload(patch)?;
        self.check_schema(patch)
    }

    /// Rollback snapshots were accepted once already and may have grown past the
    /// per-patch ceiling through accumulated patches; only the shape is rechecked.
    pub fn validate_replacement(&self, document: &Document) -> Result<(), ApiError> {
        self.check_schema(document)
    }

    pub fn check_payload(&self, patch: &Document) -> Result<(), ApiError> {
        let size = serialized_size(patch);
        if size > self.config.max_payload_bytes {
            return Err(ApiError::PayloadTooLarge {
                size,
                limit: self.config.max_payload_bytes,
            });
        }
        Ok(())
    }

    pub fn check_schema(&self, patch: &Document) -> Result<(), ApiError> {
        let Value::Object(top) = patch else {
            return Err(ApiError::schema(
                "",
                format!("document root must be an object, got {}", kind_name(patch)),
            ));
        };

        let depth = nesting_depth(patch);
        if depth > self.config.max_document_depth {
            return Err(ApiError::schema(
                "",
                format!(
                    "document nesting {} exceeds limit of {}",
                    depth, self.config.max_document_depth
                ),
            ));
        }

        for (key, value) in top {
            if self.is_immutable(key) && !value.is_null() {
                match value {
                    Value::String(s) if !s.trim().is_empty() => {}
                    Value::String(_) => {
                        return Err(ApiError::schema(
                            pointer_push("", key),
                            "reserved key must be a non-empty string",
                        ))
                    }
                    other => {
                        return Err(ApiError::schema(
                            pointer_push("", key),
                            format!("reserved key must be a string, got {}", kind_name(other)),
                        ))
                    }
                }
            }
        }

        check_value(patch, "")
    }

    /// Reject `candidate` if it differs from `existing` on any immutable key that is
    /// already set in `existing`. Keys absent from `existing` may be set once.
    pub fn check_immutable(&self, existing: &Document, candidate: &Document) -> Result<(), ApiError> {
        for key in &self.config.immutable_keys {
            let Some(current) = existing.get(key) else {
                continue;
            };
            if current.is_null() {
                continue;
            }
            if candidate.get(key) != Some(current) {
                return Err(ApiError::ImmutableFieldViolation(format!(
                    "'{}' is immutable once set (current value {})",
                    key, current
                )));
            }
        }
        Ok(())
    }

    /// Node creation or a reparent landing at `lineage_len` must stay within `max_depth`.
    pub fn check_depth(&self, lineage_len: usize) -> Result<(), ApiError> {
        if lineage_len > self.config.max_depth {
            return Err(ApiError::DepthExceeded(format!(
                "lineage length {} exceeds maximum of {}",
                lineage_len, self.config.max_depth
            )));
        }
        Ok(())
    }

    /// Walk ancestors of `new_parent` (inclusive) with at most `max_depth` steps.
    ///
    /// `parent_of` returns the parent of a node, `None` at the root. Meeting `node`
    /// means the move would close a cycle.
    pub fn check_reparent<F>(
        &self,
        node: &NodeId,
        new_parent: &NodeId,
        mut parent_of: F,
    ) -> Result<(), ApiError>
    where
        F: FnMut(&NodeId) -> Result<Option<NodeId>, ApiError>,
    {
        let mut cursor = Some(new_parent.clone());
        let mut steps = 0usize;
        while let Some(current) = cursor {
            if &current == node {
                return Err(ApiError::CycleDetected(format!(
                    "{} is an ancestor of (or equal to) proposed parent {}",
                    node, new_parent
                )));
            }
            steps += 1;
            if steps > self.config.max_depth {
                return Err(ApiError::DepthExceeded(format!(
                    "ancestor walk from {} exceeded {} steps",
                    new_parent, self.config.max_depth
                )));
            }
            cursor = parent_of(&current)?;
        }
        Ok(())
    }
}

fn check_value(value: &Value, path: &str) -> Result<(), ApiError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key.is_empty() {
                    return Err(ApiError::schema(path, "object keys must not be empty"));
                }
                check_value(child, &pointer_push(path, key))?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                check_value(child, &pointer_push(path, &index.to_string()))?;
            }
            Ok(())
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => Err(ApiError::schema(path, "numbers must be finite")),
            _ => Ok(()),
        },
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
    }
}
