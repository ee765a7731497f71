//! Org Graph Store and Config Store
//!
//! Durable state for the engine: the org tree, one raw override document per node, the
//! audit log, per-org epochs and issued tokens. Every concern is a trait so the service
//! can be exercised against any backend; [`SledStore`] implements all of them over one
//! sled database.

pub mod audit_log;
pub mod graph;
pub mod persistence;
pub mod raw;
pub mod tokens;

pub use persistence::SledStore;

use crate::audit::AuditRecord;
use crate::document::{empty_document, Document};
use crate::error::{ApiError, StorageError};
use crate::guardrails::Guardrails;
use crate::identity::TokenRecord;
use crate::tree::{NewNode, OrgNode};
use crate::types::{Epoch, Hash, NodeId, OrgId, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The override document stored directly on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    pub org_id: OrgId,
    pub node_id: NodeId,
    pub document: Document,
    pub version: Version,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
    /// Hex hash of the newest audit record for this node
    #[serde(default)]
    pub audit_head: Option<String>,
}

impl RawConfig {
    /// What a never-written node reads as.
    pub fn empty(org_id: &OrgId, node_id: &NodeId) -> Self {
        Self {
            org_id: org_id.clone(),
            node_id: node_id.clone(),
            document: empty_document(),
            version: 0,
            updated_at: None,
            updated_by: None,
            audit_head: None,
        }
    }

    pub fn audit_head_hash(&self) -> Result<Option<Hash>, StorageError> {
        let Some(head) = &self.audit_head else {
            return Ok(None);
        };
        let bytes = hex::decode(head)
            .map_err(|e| StorageError::Corrupt(format!("audit head is not hex: {}", e)))?;
        let hash: Hash = bytes
            .try_into()
            .map_err(|_| StorageError::Corrupt("audit head is not 32 bytes".to_string()))?;
        Ok(Some(hash))
    }
}

/// How a write combines with the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Deep-merge the incoming document into the stored one
    Patch,
    /// Replace the stored document with an audited snapshot
    Rollback { target_version: Version },
}

/// One validated write against a node's raw config.
#[derive(Debug, Clone)]
pub struct RawWrite {
    pub org_id: OrgId,
    pub node_id: NodeId,
    /// `None` applies to whatever version is current at commit time
    pub expected_version: Option<Version>,
    pub mode: WriteMode,
    pub document: Document,
    pub actor: String,
}

pub trait OrgGraphStore: Send + Sync {
    fn root_of(&self, org_id: &OrgId) -> Result<Option<NodeId>, StorageError>;

    fn get_node(&self, org_id: &OrgId, node_id: &NodeId) -> Result<Option<OrgNode>, StorageError>;

    /// Root-first path to `node_id`; `None` if the node does not exist.
    fn lineage(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        max_steps: usize,
    ) -> Result<Option<Vec<NodeId>>, StorageError>;

    fn children(&self, org_id: &OrgId, node_id: &NodeId) -> Result<Vec<NodeId>, StorageError>;

    fn list_nodes(&self, org_id: &OrgId) -> Result<Vec<OrgNode>, StorageError>;

    fn create_node(&self, new_node: NewNode, guardrails: &Guardrails) -> Result<OrgNode, ApiError>;

    fn reparent_node(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        new_parent: &NodeId,
        guardrails: &Guardrails,
    ) -> Result<OrgNode, ApiError>;

    /// Remove a childless node. Its raw config and audit history stay behind.
    fn delete_node(&self, org_id: &OrgId, node_id: &NodeId) -> Result<OrgNode, ApiError>;
}

pub trait ConfigStore: Send + Sync {
    fn get_raw(&self, org_id: &OrgId, node_id: &NodeId) -> Result<RawConfig, StorageError>;

    /// Read several nodes from one consistent snapshot.
    fn get_raw_batch(
        &self,
        org_id: &OrgId,
        node_ids: &[NodeId],
    ) -> Result<BTreeMap<NodeId, RawConfig>, StorageError>;

    /// Apply a write and append its audit record atomically.
    fn write_raw(
        &self,
        write: &RawWrite,
        guardrails: &Guardrails,
    ) -> Result<(RawConfig, AuditRecord), ApiError>;
}

pub trait AuditStore: Send + Sync {
    /// Newest first, at most `limit` records.
    fn audit_list(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, StorageError>;

    fn audit_get(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        version: Version,
    ) -> Result<Option<AuditRecord>, StorageError>;

    /// Full history in ascending version order.
    fn audit_chain(&self, org_id: &OrgId, node_id: &NodeId) -> Result<Vec<AuditRecord>, StorageError>;
}

pub trait EpochSource: Send + Sync {
    /// Advanced by every committed write or tree mutation of the org, inside its transaction.
    fn current_epoch(&self, org_id: &OrgId) -> Result<Epoch, StorageError>;
}

pub trait TokenStore: Send + Sync {
    fn put_token(&self, record: &TokenRecord) -> Result<(), StorageError>;

    fn get_token(&self, token_hash: &str) -> Result<Option<TokenRecord>, StorageError>;

    fn list_tokens(&self) -> Result<Vec<TokenRecord>, StorageError>;
}

/// Everything the service needs from a backend.
pub trait EngineStore: OrgGraphStore + ConfigStore + AuditStore + EpochSource + TokenStore {}

impl<T> EngineStore for T where T: OrgGraphStore + ConfigStore + AuditStore + EpochSource + TokenStore
{}
