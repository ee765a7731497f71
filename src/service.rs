//! Configuration engine service
//!
//! Ties the stores, guardrails, merge engine and cache together. Every operation here is
//! already authorized; token handling and scope checks live in [`crate::api`].

use crate::audit::{verify_chain, AuditRecord, AuditSummary, ChainReport};
use crate::cache::{CacheStats, EffectiveConfigCache};
use crate::config::EngineConfig;
use crate::document::{empty_document, Document};
use crate::error::ApiError;
use crate::guardrails::Guardrails;
use crate::merge::merge;
use crate::store::{EngineStore, RawConfig, RawWrite, WriteMode};
use crate::tree::{NewNode, OrgNode};
use crate::types::{Epoch, NodeId, OrgId, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Merged configuration visible at one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub org_id: OrgId,
    pub node_id: NodeId,
    /// Org epoch the document was computed under
    pub epoch: Epoch,
    pub document: Document,
}

/// Explainability view: every raw document along a node's lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawView {
    pub org_id: OrgId,
    pub node_id: NodeId,
    pub lineage: Vec<NodeId>,
    pub configs: BTreeMap<NodeId, Document>,
    pub versions: BTreeMap<NodeId, Version>,
}

/// Chain verification plus a check that the stored head points at the last record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditVerification {
    pub org_id: OrgId,
    pub node_id: NodeId,
    pub current_version: Version,
    #[serde(flatten)]
    pub chain: ChainReport,
}

/// Configuration engine
///
/// Stateless per request; shared state lives in the store and the per-instance cache.
pub struct ConfigService {
    store: Arc<dyn EngineStore>,
    guardrails: Guardrails,
    cache: EffectiveConfigCache,
}

impl ConfigService {
    pub fn new(store: Arc<dyn EngineStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            guardrails: Guardrails::new(config.guardrails.clone()),
            cache: EffectiveConfigCache::new(config.cache.clone()),
        }
    }

    pub fn guardrails(&self) -> &Guardrails {
        &self.guardrails
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn lineage_limit(&self) -> usize {
        self.guardrails.max_depth() + 1
    }

    /// Root node of `org_id`, or `OrgNotFound`.
    pub fn require_org(&self, org_id: &OrgId) -> Result<NodeId, ApiError> {
        self.store
            .root_of(org_id)?
            .ok_or_else(|| ApiError::OrgNotFound(org_id.clone()))
    }

    pub fn get_node(&self, org_id: &OrgId, node_id: &NodeId) -> Result<OrgNode, ApiError> {
        self.require_org(org_id)?;
        self.store
            .get_node(org_id, node_id)?
            .ok_or_else(|| ApiError::node_not_found(org_id, node_id))
    }

    pub fn list_nodes(&self, org_id: &OrgId) -> Result<Vec<OrgNode>, ApiError> {
        self.require_org(org_id)?;
        Ok(self.store.list_nodes(org_id)?)
    }

    pub fn list_children(&self, org_id: &OrgId, node_id: &NodeId) -> Result<Vec<NodeId>, ApiError> {
        self.get_node(org_id, node_id)?;
        Ok(self.store.children(org_id, node_id)?)
    }

    /// Root-first node ids from the org root to `node_id`, inclusive.
    pub fn get_lineage(&self, org_id: &OrgId, node_id: &NodeId) -> Result<Vec<NodeId>, ApiError> {
        self.require_org(org_id)?;
        let epoch = self.store.current_epoch(org_id)?;
        Ok(self.lineage_at(org_id, node_id, epoch)?.as_ref().clone())
    }

    fn lineage_at(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        epoch: Epoch,
    ) -> Result<Arc<Vec<NodeId>>, ApiError> {
        if let Some(lineage) = self.cache.get_lineage(org_id, node_id, epoch) {
            return Ok(lineage);
        }
        let lineage = self
            .store
            .lineage(org_id, node_id, self.lineage_limit())?
            .ok_or_else(|| ApiError::node_not_found(org_id, node_id))?;
        let lineage = Arc::new(lineage);
        self.cache
            .put_lineage(org_id, node_id, epoch, Arc::clone(&lineage));
        Ok(lineage)
    }

    pub fn create_node(&self, new_node: NewNode) -> Result<OrgNode, ApiError> {
        self.store.create_node(new_node, &self.guardrails)
    }

    /// Move `node_id` under `new_parent`.
    ///
    /// Cycle and depth checks run against a consistent view of the org's tree; a
    /// rejected move changes nothing and leaves the epoch alone.
    pub fn reparent_node(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        new_parent: &NodeId,
    ) -> Result<OrgNode, ApiError> {
        self.require_org(org_id)?;
        self.store
            .reparent_node(org_id, node_id, new_parent, &self.guardrails)
    }

    pub fn delete_node(&self, org_id: &OrgId, node_id: &NodeId) -> Result<OrgNode, ApiError> {
        self.require_org(org_id)?;
        self.store.delete_node(org_id, node_id)
    }

    /// Raw document stored on one node (empty at version 0 when never written).
    pub fn get_raw(&self, org_id: &OrgId, node_id: &NodeId) -> Result<RawConfig, ApiError> {
        self.get_node(org_id, node_id)?;
        Ok(self.store.get_raw(org_id, node_id)?)
    }

    pub fn get_raw_batch(
        &self,
        org_id: &OrgId,
        node_ids: &[NodeId],
    ) -> Result<BTreeMap<NodeId, RawConfig>, ApiError> {
        self.require_org(org_id)?;
        Ok(self.store.get_raw_batch(org_id, node_ids)?)
    }

    pub fn get_raw_view(&self, org_id: &OrgId, node_id: &NodeId) -> Result<RawView, ApiError> {
        let lineage = self.get_lineage(org_id, node_id)?;
        let raws = self.store.get_raw_batch(org_id, &lineage)?;
        let mut configs = BTreeMap::new();
        let mut versions = BTreeMap::new();
        for (id, raw) in raws {
            versions.insert(id.clone(), raw.version);
            configs.insert(id, raw.document);
        }
        Ok(RawView {
            org_id: org_id.clone(),
            node_id: node_id.clone(),
            lineage,
            configs,
            versions,
        })
    }

    /// Patch a node's raw document
    ///
    /// # Arguments
    /// * `expected_version` - Optimistic concurrency guard; `None` applies to the current version
    /// * `patch` - Partial document deep-merged into the stored one
    /// * `actor` - Principal recorded as `changed_by`
    ///
    /// # Behavior
    /// * Payload and schema checks run before the store is touched
    /// * Version check, immutable-key check, new document and audit record commit together
    /// * The org epoch advances in the same transaction, so the next effective read recomputes
    #[instrument(skip(self, patch), fields(org = %org_id, node = %node_id))]
    pub fn write_raw(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        expected_version: Option<Version>,
        patch: Document,
        actor: &str,
    ) -> Result<RawConfig, ApiError> {
        self.guardrails.validate_patch(&patch)?;
        self.require_org(org_id)?;
        let write = RawWrite {
            org_id: org_id.clone(),
            node_id: node_id.clone(),
            expected_version,
            mode: WriteMode::Patch,
            document: patch,
            actor: actor.to_string(),
        };
        match self.store.write_raw(&write, &self.guardrails) {
            Ok((raw, _)) => Ok(raw),
            Err(err) => {
                if err.is_retryable() {
                    debug!(error = %err, "Raw write lost a race or hit a store fault");
                } else {
                    warn!(error = %err, "Raw write rejected");
                }
                Err(err)
            }
        }
    }

    /// Fully merged configuration visible at `node_id`.
    ///
    /// The epoch is read before the lineage and documents, so a cached value is never
    /// older than the epoch it is filed under.
    pub fn get_effective(&self, org_id: &OrgId, node_id: &NodeId) -> Result<EffectiveConfig, ApiError> {
        self.require_org(org_id)?;
        let epoch = self.store.current_epoch(org_id)?;

        let document = match self.cache.get_effective(org_id, node_id, epoch) {
            Some(hit) => {
                debug!(org = %org_id, node = %node_id, epoch, "Effective config cache hit");
                hit
            }
            None => {
                let lineage = self.lineage_at(org_id, node_id, epoch)?;
                let mut raws = self.store.get_raw_batch(org_id, &lineage)?;
                let docs: Vec<Document> = lineage
                    .iter()
                    .map(|id| raws.remove(id).map_or_else(empty_document, |raw| raw.document))
                    .collect();
                let merged = Arc::new(merge(&docs));
                self.cache
                    .put_effective(org_id, node_id, epoch, Arc::clone(&merged));
                debug!(
                    org = %org_id,
                    node = %node_id,
                    epoch,
                    depth = lineage.len(),
                    "Computed effective config"
                );
                merged
            }
        };

        Ok(EffectiveConfig {
            org_id: org_id.clone(),
            node_id: node_id.clone(),
            epoch,
            document: document.as_ref().clone(),
        })
    }

    /// Newest-first audit history for one node.
    pub fn audit_list(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        limit: usize,
        include_snapshots: bool,
    ) -> Result<Vec<AuditSummary>, ApiError> {
        self.require_org(org_id)?;
        let records = self.store.audit_list(org_id, node_id, limit)?;
        Ok(records
            .iter()
            .map(|r| {
                if include_snapshots {
                    r.summary()
                } else {
                    r.without_snapshot()
                }
            })
            .collect())
    }

    pub fn audit_get(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        version: Version,
    ) -> Result<AuditRecord, ApiError> {
        self.require_org(org_id)?;
        self.store
            .audit_get(org_id, node_id, version)?
            .ok_or_else(|| ApiError::VersionNotFound {
                org_id: org_id.clone(),
                node_id: node_id.clone(),
                version,
            })
    }

    pub fn verify_audit(&self, org_id: &OrgId, node_id: &NodeId) -> Result<AuditVerification, ApiError> {
        self.require_org(org_id)?;
        let records = self.store.audit_chain(org_id, node_id)?;
        let raw = self.store.get_raw(org_id, node_id)?;
        let mut chain = verify_chain(&records);

        if chain.valid && chain.head != raw.audit_head {
            chain.valid = false;
            chain.broken_at = Some(raw.version);
            chain.reason = Some("stored config head does not match the last audit record".to_string());
        }
        if !chain.valid {
            warn!(
                org = %org_id,
                node = %node_id,
                broken_at = ?chain.broken_at,
                "Audit chain verification failed"
            );
        }
        Ok(AuditVerification {
            org_id: org_id.clone(),
            node_id: node_id.clone(),
            current_version: raw.version,
            chain,
        })
    }

    /// Restore the snapshot of `target_version` as a new write.
    ///
    /// Without an explicit `expected_version` the rollback is pinned to the version
    /// current when this call reads it, so an interleaved write surfaces as a conflict.
    #[instrument(skip(self), fields(org = %org_id, node = %node_id))]
    pub fn rollback(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        target_version: Version,
        expected_version: Option<Version>,
        actor: &str,
    ) -> Result<RawConfig, ApiError> {
        let target = self.audit_get(org_id, node_id, target_version)?;
        self.guardrails.validate_replacement(&target.full_snapshot)?;
        let expected = match expected_version {
            Some(version) => version,
            None => self.store.get_raw(org_id, node_id)?.version,
        };
        let write = RawWrite {
            org_id: org_id.clone(),
            node_id: node_id.clone(),
            expected_version: Some(expected),
            mode: WriteMode::Rollback { target_version },
            document: target.full_snapshot,
            actor: actor.to_string(),
        };
        let (raw, _) = self.store.write_raw(&write, &self.guardrails)?;
        info!(version = raw.version, target_version, "Rolled back raw config");
        Ok(raw)
    }
}
