//! Org Tree
//!
//! The per-organization hierarchy configuration inherits along. Each org has exactly one
//! root; every other node points at its parent, and the parent chain always terminates at
//! the root without revisiting a node.

pub mod lineage;

pub use lineage::walk_lineage;

use crate::error::ApiError;
use crate::types::{NodeId, OrgId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a node in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Intermediate,
    Leaf,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Root => "root",
            NodeType::Intermediate => "intermediate",
            NodeType::Leaf => "leaf",
        }
    }

    /// Leaves cannot own children.
    pub fn accepts_children(&self) -> bool {
        !matches!(self, NodeType::Leaf)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(NodeType::Root),
            "intermediate" => Ok(NodeType::Intermediate),
            "leaf" => Ok(NodeType::Leaf),
            other => Err(ApiError::InvalidRequest(format!(
                "unknown node_type '{}' (expected root, intermediate or leaf)",
                other
            ))),
        }
    }
}

/// A node in an org tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgNode {
    pub org_id: OrgId,
    pub node_id: NodeId,
    /// `None` only for the root
    pub parent_node_id: Option<NodeId>,
    pub node_type: NodeType,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrgNode {
    pub fn is_root(&self) -> bool {
        self.parent_node_id.is_none()
    }
}

/// Input for node creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    pub org_id: OrgId,
    /// Explicit id; a fresh one is generated when absent
    pub node_id: Option<NodeId>,
    pub parent_id: Option<NodeId>,
    pub node_type: NodeType,
    pub name: String,
}

impl NewNode {
    /// Shape checks that need no store access.
    pub fn validate_shape(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("node name must not be empty".to_string()));
        }
        match (self.node_type, &self.parent_id) {
            (NodeType::Root, Some(_)) => Err(ApiError::InvalidRequest(
                "a root node cannot have a parent".to_string(),
            )),
            (NodeType::Intermediate | NodeType::Leaf, None) => Err(ApiError::InvalidRequest(
                "only the root node may omit parent_id".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
