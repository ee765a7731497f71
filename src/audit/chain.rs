//! Hash chain over a node's audit records.
//!
//! Each record hashes its own canonical fields together with the previous record's
//! hash. Recomputing the chain from the first version detects edits, deletions and
//! reordering.

use super::AuditRecord;
use crate::types::{Hash, Version};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// blake3 over the canonical JSON of every field except `hash` itself.
pub fn compute_record_hash(record: &AuditRecord) -> Hash {
    let canonical = json!({
        "org_id": record.org_id,
        "node_id": record.node_id,
        "version": record.version,
        "changed_at": record.changed_at.to_rfc3339(),
        "changed_by": record.changed_by,
        "action": record.action,
        "diff": record.diff,
        "full_snapshot": record.full_snapshot,
        "prev_hash": record.prev_hash.map(hex::encode),
    });
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"orgcfg.audit.v1");
    hasher.update(&bytes);
    *hasher.finalize().as_bytes()
}

/// Outcome of walking one node's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub records: usize,
    pub head: Option<String>,
    pub valid: bool,
    /// First version whose record does not check out
    pub broken_at: Option<Version>,
    pub reason: Option<String>,
}

/// `records` must be in ascending version order.
pub fn verify_chain(records: &[AuditRecord]) -> ChainReport {
    let mut prev: Option<Hash> = None;
    for (index, record) in records.iter().enumerate() {
        let expected_version = index as Version + 1;
        let failure = if record.version != expected_version {
            Some(format!(
                "expected version {} but found {}",
                expected_version, record.version
            ))
        } else if record.prev_hash != prev {
            Some("previous-hash link does not match".to_string())
        } else if compute_record_hash(record) != record.hash {
            Some("record hash does not match its contents".to_string())
        } else {
            None
        };

        if let Some(reason) = failure {
            return ChainReport {
                records: records.len(),
                head: records.last().map(|r| r.hash_hex()),
                valid: false,
                broken_at: Some(record.version),
                reason: Some(reason),
            };
        }
        prev = Some(record.hash);
    }

    ChainReport {
        records: records.len(),
        head: prev.map(hex::encode),
        valid: true,
        broken_at: None,
        reason: None,
    }
}
