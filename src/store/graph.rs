//! Org tree operations over the `org_nodes`, `org_roots` and `org_children` trees.
//!
//! Every mutation advances the org epoch in the same transaction. Deleted nodes move
//! to `retired_nodes` and their ids are never handed out again.

use super::persistence::{
    bump_epoch_in, child_key, child_prefix, decode_bin, encode_bin, finish_txn, key_tail,
    node_key, org_key, org_prefix, SledStore,
};
use super::OrgGraphStore;
use crate::error::{ApiError, StorageError};
use crate::guardrails::Guardrails;
use crate::tree::{walk_lineage, NewNode, NodeType, OrgNode};
use crate::types::{NodeId, OrgId};
use chrono::Utc;
use sled::Transactional;
use tracing::{debug, info};

impl SledStore {
    fn require_node(&self, org_id: &OrgId, node_id: &NodeId) -> Result<OrgNode, ApiError> {
        self.get_node(org_id, node_id)?
            .ok_or_else(|| ApiError::node_not_found(org_id, node_id))
    }

    /// Parent lookup for walks that must not run into a missing node.
    fn parent_of(&self, org_id: &OrgId, node_id: &NodeId) -> Result<Option<NodeId>, ApiError> {
        match self.get_node(org_id, node_id)? {
            Some(node) => Ok(node.parent_node_id),
            None => Err(StorageError::Corrupt(format!(
                "parent chain references missing node {}/{}",
                org_id, node_id
            ))
            .into()),
        }
    }

    /// Number of levels in the subtree rooted at `node_id` (a childless node is 1).
    fn subtree_height(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        limit: usize,
    ) -> Result<usize, StorageError> {
        let mut level = vec![node_id.clone()];
        let mut height = 0usize;
        while !level.is_empty() {
            height += 1;
            if height > limit {
                break;
            }
            let mut next = Vec::new();
            for id in &level {
                next.extend(self.children(org_id, id)?);
            }
            level = next;
        }
        Ok(height)
    }

    /// Live, retired and config-bearing ids are all taken.
    fn check_new_id_free(&self, org_id: &OrgId, node_id: &NodeId) -> Result<(), ApiError> {
        let key = node_key(org_id, node_id);
        if self.nodes.contains_key(&key).map_err(StorageError::from)? {
            return Err(ApiError::InvalidRequest(format!(
                "node {}/{} already exists",
                org_id, node_id
            )));
        }
        let retired = self.retired.contains_key(&key).map_err(StorageError::from)?;
        if retired || self.configs.contains_key(&key).map_err(StorageError::from)? {
            return Err(ApiError::InvalidRequest(format!(
                "node id {}/{} belonged to a deleted node and cannot be reused",
                org_id, node_id
            )));
        }
        Ok(())
    }
}

impl OrgGraphStore for SledStore {
    fn root_of(&self, org_id: &OrgId) -> Result<Option<NodeId>, StorageError> {
        let Some(raw) = self.roots.get(org_key(org_id))? else {
            return Ok(None);
        };
        Ok(Some(decode_bin(&raw)?))
    }

    fn get_node(&self, org_id: &OrgId, node_id: &NodeId) -> Result<Option<OrgNode>, StorageError> {
        let Some(raw) = self.nodes.get(node_key(org_id, node_id))? else {
            return Ok(None);
        };
        Ok(Some(decode_bin(&raw)?))
    }

    fn lineage(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        max_steps: usize,
    ) -> Result<Option<Vec<NodeId>>, StorageError> {
        walk_lineage(node_id, max_steps, |id| {
            Ok(self.get_node(org_id, id)?.map(|node| node.parent_node_id))
        })
    }

    fn children(&self, org_id: &OrgId, node_id: &NodeId) -> Result<Vec<NodeId>, StorageError> {
        let mut out = Vec::new();
        for item in self.children.scan_prefix(child_prefix(org_id, node_id)) {
            let (key, _) = item?;
            let child = NodeId::parse(key_tail(&key)?)
                .map_err(|e| StorageError::Corrupt(format!("bad child key: {}", e)))?;
            out.push(child);
        }
        Ok(out)
    }

    fn list_nodes(&self, org_id: &OrgId) -> Result<Vec<OrgNode>, StorageError> {
        let mut out = Vec::new();
        for item in self.nodes.scan_prefix(org_prefix(org_id)) {
            let (_, value) = item?;
            out.push(decode_bin::<OrgNode>(&value)?);
        }
        Ok(out)
    }

    fn create_node(&self, new_node: NewNode, guardrails: &Guardrails) -> Result<OrgNode, ApiError> {
        new_node.validate_shape()?;
        let org_id = new_node.org_id.clone();
        let lock = self.org_lock(&org_id);
        let _guard = lock.lock();

        let node_id = new_node.node_id.clone().unwrap_or_else(NodeId::generate);
        self.check_new_id_free(&org_id, &node_id)?;

        let root = self.root_of(&org_id)?;
        match (&new_node.parent_id, &root) {
            (None, Some(existing)) => {
                return Err(ApiError::InvalidRequest(format!(
                    "org {} already has root {}",
                    org_id, existing
                )))
            }
            (None, None) => guardrails.check_depth(1)?,
            (Some(_), None) => return Err(ApiError::OrgNotFound(org_id)),
            (Some(parent_id), Some(_)) => {
                let parent = self.require_node(&org_id, parent_id)?;
                if !parent.node_type.accepts_children() {
                    return Err(ApiError::InvalidRequest(format!(
                        "{} node {} cannot have children",
                        parent.node_type, parent_id
                    )));
                }
                let parent_lineage = self
                    .lineage(&org_id, parent_id, guardrails.max_depth() + 1)?
                    .ok_or_else(|| ApiError::node_not_found(&org_id, parent_id))?;
                guardrails.check_depth(parent_lineage.len() + 1)?;
            }
        }

        let now = Utc::now();
        let node = OrgNode {
            org_id: org_id.clone(),
            node_id: node_id.clone(),
            parent_node_id: new_node.parent_id.clone(),
            node_type: new_node.node_type,
            name: new_node.name.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        let encoded = encode_bin(&node)?;
        let encoded_id = encode_bin(&node_id)?;

        let trees = (&self.nodes, &self.roots, &self.children, &self.epochs);
        let epoch = finish_txn(trees.transaction(|(nodes, roots, children, epochs)| {
            nodes.insert(node_key(&org_id, &node_id), encoded.clone())?;
            match &node.parent_node_id {
                None => {
                    roots.insert(org_key(&org_id), encoded_id.clone())?;
                }
                Some(parent) => {
                    children.insert(child_key(&org_id, parent, &node_id), Vec::<u8>::new())?;
                }
            }
            bump_epoch_in(epochs, &org_id)
        }))?;

        info!(
            org = %org_id,
            node = %node_id,
            node_type = %node.node_type,
            epoch,
            "Created org node"
        );
        Ok(node)
    }

    fn reparent_node(
        &self,
        org_id: &OrgId,
        node_id: &NodeId,
        new_parent: &NodeId,
        guardrails: &Guardrails,
    ) -> Result<OrgNode, ApiError> {
        let lock = self.org_lock(org_id);
        let _guard = lock.lock();

        let node = self.require_node(org_id, node_id)?;
        if node.node_type == NodeType::Root || node.is_root() {
            return Err(ApiError::InvalidRequest(format!(
                "root node {} cannot be reparented",
                node_id
            )));
        }
        let parent = self.require_node(org_id, new_parent)?;
        guardrails.check_reparent(node_id, new_parent, |id| self.parent_of(org_id, id))?;
        if !parent.node_type.accepts_children() {
            return Err(ApiError::InvalidRequest(format!(
                "{} node {} cannot have children",
                parent.node_type, new_parent
            )));
        }
        if node.parent_node_id.as_ref() == Some(new_parent) {
            debug!(org = %org_id, node = %node_id, "Reparent to current parent is a no-op");
            return Ok(node);
        }

        let parent_depth = self
            .lineage(org_id, new_parent, guardrails.max_depth() + 1)?
            .ok_or_else(|| ApiError::node_not_found(org_id, new_parent))?
            .len();
        let height = self.subtree_height(org_id, node_id, guardrails.max_depth() + 1)?;
        guardrails.check_depth(parent_depth + height)?;

        let old_parent = node.parent_node_id.clone();
        let updated = OrgNode {
            parent_node_id: Some(new_parent.clone()),
            updated_at: Utc::now(),
            ..node
        };
        let encoded = encode_bin(&updated)?;

        let epoch = finish_txn((&self.nodes, &self.children, &self.epochs).transaction(
            |(nodes, children, epochs)| {
                nodes.insert(node_key(org_id, node_id), encoded.clone())?;
                if let Some(old) = &old_parent {
                    children.remove(child_key(org_id, old, node_id))?;
                }
                children.insert(child_key(org_id, new_parent, node_id), Vec::<u8>::new())?;
                bump_epoch_in(epochs, org_id)
            },
        ))?;

        info!(
            org = %org_id,
            node = %node_id,
            new_parent = %new_parent,
            epoch,
            "Reparented org node"
        );
        Ok(updated)
    }

    fn delete_node(&self, org_id: &OrgId, node_id: &NodeId) -> Result<OrgNode, ApiError> {
        let lock = self.org_lock(org_id);
        let _guard = lock.lock();

        let node = self.require_node(org_id, node_id)?;
        let children = self.children(org_id, node_id)?;
        if !children.is_empty() {
            return Err(ApiError::InvalidRequest(format!(
                "node {} still has {} child node(s)",
                node_id,
                children.len()
            )));
        }

        let encoded = encode_bin(&node)?;
        let epoch = finish_txn(
            (&self.nodes, &self.roots, &self.children, &self.retired, &self.epochs).transaction(
                |(nodes, roots, children, retired, epochs)| {
                    let key = node_key(org_id, node_id);
                    nodes.remove(key.clone())?;
                    retired.insert(key, encoded.clone())?;
                    match &node.parent_node_id {
                        None => {
                            roots.remove(org_key(org_id))?;
                        }
                        Some(parent) => {
                            children.remove(child_key(org_id, parent, node_id))?;
                        }
                    }
                    bump_epoch_in(epochs, org_id)
                },
            ),
        )?;

        info!(org = %org_id, node = %node_id, epoch, "Deleted org node");
        Ok(node)
    }
}
