//! Audit Trail
//!
//! One immutable record per accepted write: the minimal diff against the prior document,
//! a full snapshot of the new document (rollback never replays diffs), and a blake3 hash
//! chained to the previous record so tampering with history is detectable.

pub mod chain;
pub mod diff;

pub use chain::{compute_record_hash, verify_chain, ChainReport};
pub use diff::{diff_documents, Change, DiffEntry};

use crate::document::Document;
use crate::types::{Hash, NodeId, OrgId, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of write produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditAction {
    Write,
    Rollback { target_version: Version },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub org_id: OrgId,
    pub node_id: NodeId,
    /// Equals the RawConfig version this write produced; starts at 1
    pub version: Version,
    pub changed_at: DateTime<Utc>,
    pub changed_by: String,
    pub action: AuditAction,
    pub diff: Vec<DiffEntry>,
    pub full_snapshot: Document,
    #[serde(with = "hex_hash_opt")]
    pub prev_hash: Option<Hash>,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
}

/// Everything needed to build the next record in a chain.
pub struct RecordInput<'a> {
    pub org_id: &'a OrgId,
    pub node_id: &'a NodeId,
    pub version: Version,
    pub changed_at: DateTime<Utc>,
    pub changed_by: &'a str,
    pub action: AuditAction,
    pub prior: &'a Document,
    pub new_document: &'a Document,
    pub prev_hash: Option<Hash>,
}

impl AuditRecord {
    /// Compute the diff and chain hash for a write.
    pub fn build(input: RecordInput<'_>) -> Self {
        let diff = diff_documents(input.prior, input.new_document);
        let mut record = AuditRecord {
            org_id: input.org_id.clone(),
            node_id: input.node_id.clone(),
            version: input.version,
            changed_at: input.changed_at,
            changed_by: input.changed_by.to_string(),
            action: input.action,
            diff,
            full_snapshot: input.new_document.clone(),
            prev_hash: input.prev_hash,
            hash: [0u8; 32],
        };
        record.hash = compute_record_hash(&record);
        record
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Copy without the snapshot, for list views that only want diffs.
    pub fn without_snapshot(&self) -> AuditSummary {
        AuditSummary {
            org_id: self.org_id.clone(),
            node_id: self.node_id.clone(),
            version: self.version,
            changed_at: self.changed_at,
            changed_by: self.changed_by.clone(),
            action: self.action.clone(),
            diff: self.diff.clone(),
            full_snapshot: None,
            hash: self.hash_hex(),
        }
    }

    pub fn summary(&self) -> AuditSummary {
        AuditSummary {
            full_snapshot: Some(self.full_snapshot.clone()),
            ..self.without_snapshot()
        }
    }
}

/// Wire view of a record: hash as hex, snapshot optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub org_id: OrgId,
    pub node_id: NodeId,
    pub version: Version,
    pub changed_at: DateTime<Utc>,
    pub changed_by: String,
    pub action: AuditAction,
    pub diff: Vec<DiffEntry>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub full_snapshot: Option<Document>,
    pub hash: String,
}

pub(crate) mod hex_hash {
    use crate::types::Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Hash, D::Error> {
        let raw = String::deserialize(d)?;
        let bytes = hex::decode(&raw).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("hash must be 32 bytes"))
    }
}

pub(crate) mod hex_hash_opt {
    use crate::types::Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Option<Hash>, s: S) -> Result<S::Ok, S::Error> {
        match hash {
            Some(h) => s.serialize_some(&hex::encode(h)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Hash>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(raw) => {
                let bytes = hex::decode(&raw).map_err(serde::de::Error::custom)?;
                let hash: Hash = bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("hash must be 32 bytes"))?;
                Ok(Some(hash))
            }
        }
    }
}
