//! Raw config writes and per-org epochs.
//!
//! A write reads the node's current document, checks the expected version, applies the
//! patch (or rollback snapshot), checks immutable keys against the result, and stores
//! the new document together with its audit record in one sled transaction. The org
//! epoch advances in that same transaction.

use super::persistence::{
    abort, audit_key, bump_epoch_in, decode_epoch, decode_json, encode_json, finish_txn,
    node_key, org_key, SledStore,
};
use super::{ConfigStore, EpochSource, RawConfig, RawWrite, WriteMode};
use crate::audit::{AuditAction, AuditRecord, RecordInput};
use crate::error::{ApiError, StorageError};
use crate::guardrails::Guardrails;
use crate::merge::merge_into;
use crate::types::{Epoch, NodeId, OrgId};
use chrono::Utc;
use sled::Transactional;
use std::collections::BTreeMap;
use tracing::info;

impl ConfigStore for SledStore {
    fn get_raw(&self, org_id: &OrgId, node_id: &NodeId) -> Result<RawConfig, StorageError> {
        match self.configs.get(node_key(org_id, node_id))? {
            Some(raw) => decode_json(&raw),
            None => Ok(RawConfig::empty(org_id, node_id)),
        }
    }

    fn get_raw_batch(
        &self,
        org_id: &OrgId,
        node_ids: &[NodeId],
    ) -> Result<BTreeMap<NodeId, RawConfig>, StorageError> {
        let deadline = self.deadline();
        let result = self.configs.transaction(|configs| {
            deadline.check()?;
            let mut out = BTreeMap::new();
            for node_id in node_ids {
                let raw = match configs.get(node_key(org_id, node_id))? {
                    Some(bytes) => decode_json(&bytes).map_err(abort)?,
                    None => RawConfig::empty(org_id, node_id),
                };
                out.insert(node_id.clone(), raw);
            }
            Ok(out)
        });
        finish_txn(result).map_err(|err| match err {
            ApiError::StorageError(inner) => inner,
            other => StorageError::Backend(other.to_string()),
        })
    }

    fn write_raw(
        &self,
        write: &RawWrite,
        guardrails: &Guardrails,
    ) -> Result<(RawConfig, AuditRecord), ApiError> {
        let org_id = &write.org_id;
        let node_id = &write.node_id;
        let key = node_key(org_id, node_id);
        let deadline = self.deadline();

        let result = (&self.nodes, &self.configs, &self.audit, &self.epochs).transaction(
            |(nodes, configs, audit, epochs)| {
                deadline.check()?;
                if nodes.get(&key)?.is_none() {
                    return Err(abort(ApiError::node_not_found(org_id, node_id)));
                }

                let current: RawConfig = match configs.get(&key)? {
                    Some(bytes) => decode_json(&bytes).map_err(abort)?,
                    None => RawConfig::empty(org_id, node_id),
                };
                if let Some(expected) = write.expected_version {
                    if expected != current.version {
                        return Err(abort(ApiError::VersionConflict {
                            expected,
                            actual: current.version,
                        }));
                    }
                }

                let (document, action) = match write.mode {
                    WriteMode::Patch => {
                        let mut document = current.document.clone();
                        merge_into(&mut document, &write.document);
                        (document, AuditAction::Write)
                    }
                    WriteMode::Rollback { target_version } => {
                        (write.document.clone(), AuditAction::Rollback { target_version })
                    }
                };
                guardrails
                    .check_immutable(&current.document, &document)
                    .map_err(abort)?;

                let version = current.version + 1;
                let version_key = audit_key(org_id, node_id, version);
                if audit.get(&version_key)?.is_some() {
                    return Err(abort(StorageError::Corrupt(format!(
                        "audit record {}/{}@{} exists ahead of its config",
                        org_id, node_id, version
                    ))));
                }

                let changed_at = Utc::now();
                let record = AuditRecord::build(RecordInput {
                    org_id,
                    node_id,
                    version,
                    changed_at,
                    changed_by: &write.actor,
                    action,
                    prior: &current.document,
                    new_document: &document,
                    prev_hash: current.audit_head_hash().map_err(abort)?,
                });
                let raw = RawConfig {
                    org_id: org_id.clone(),
                    node_id: node_id.clone(),
                    document,
                    version,
                    updated_at: Some(changed_at),
                    updated_by: Some(write.actor.clone()),
                    audit_head: Some(record.hash_hex()),
                };

                configs.insert(key.clone(), encode_json(&raw).map_err(abort)?)?;
                audit.insert(version_key, encode_json(&record).map_err(abort)?)?;
                let epoch = bump_epoch_in(epochs, org_id)?;
                Ok((raw, record, epoch))
            },
        );
        let (raw, record, epoch) = finish_txn(result)?;

        info!(
            org = %org_id,
            node = %node_id,
            version = raw.version,
            changes = record.diff.len(),
            epoch,
            actor = %write.actor,
            "Committed raw config write"
        );
        Ok((raw, record))
    }
}

impl EpochSource for SledStore {
    fn current_epoch(&self, org_id: &OrgId) -> Result<Epoch, StorageError> {
        match self.epochs.get(org_key(org_id))? {
            Some(raw) => decode_epoch(&raw),
            None => Ok(0),
        }
    }
}
