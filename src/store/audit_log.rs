//! Append-only audit log reads. Records are only ever written by `write_raw`.

use super::persistence::{audit_key, audit_prefix, decode_json, SledStore};
use super::AuditStore;
use crate::audit::AuditRecord;
use crate::error::StorageError;
use crate::types::{NodeId, OrgId, Version};

impl AuditStore for SledStore {
    fn audit_list(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, StorageError> {
        let mut out = Vec::new();
        for item in self.audit.scan_prefix(audit_prefix(org_id, node_id)).rev() {
            if out.len() >= limit {
                break;
            }
            let (_, value) = item?;
            out.push(decode_json(&value)?);
        }
        Ok(out)
    }

    fn audit_get(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        version: Version,
    ) -> Result<Option<AuditRecord>, StorageError> {
        let Some(raw) = self.audit.get(audit_key(org_id, node_id, version))? else {
            return Ok(None);
        };
        Ok(Some(decode_json(&raw)?))
    }

    fn audit_chain(&self, org_id: &OrgId, node_id: &NodeId) -> Result<Vec<AuditRecord>, StorageError> {
        let mut out = Vec::new();
        for item in self.audit.scan_prefix(audit_prefix(org_id, node_id)) {
            let (_, value) = item?;
            out.push(decode_json(&value)?);
        }
        Ok(out)
    }
}
