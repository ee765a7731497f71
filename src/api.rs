//! Token-authenticated API surface
//!
//! A transport-agnostic rendition of the HTTP routes. Each method takes the bearer token
//! and the route's path/body parameters, resolves the caller's identity, checks its
//! scope, and delegates to [`ConfigService`]. Transports render failures with
//! [`ErrorResponse`].

use crate::audit::AuditSummary;
use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::ApiError;
use crate::identity::{Identity, IdentityResolver};
use crate::service::{AuditVerification, ConfigService, EffectiveConfig, RawView};
use crate::store::{RawConfig, SledStore};
use crate::tree::{NewNode, NodeType, OrgNode};
use crate::types::{NodeId, OrgId, Version};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Audit list size when the caller gives none.
pub const DEFAULT_AUDIT_LIMIT: usize = 50;
/// Upper bound on one audit page.
pub const MAX_AUDIT_LIMIT: usize = 1_000;

/// Body of `PATCH /raw/{org_id}/{node_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRawRequest {
    #[serde(default)]
    pub expected_version: Option<Version>,
    pub patch: Document,
}

/// Body of `POST /tree/{org_id}/nodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub node_type: NodeType,
    pub name: String,
}

/// Body of `PATCH /tree/{org_id}/nodes/{node_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNodeRequest {
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Query of `GET /audit/{org_id}/{node_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_snapshots: bool,
}

/// Body of `POST /audit/{org_id}/{node_id}/rollback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackRequest {
    pub target_version: Version,
    #[serde(default)]
    pub expected_version: Option<Version>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageResponse {
    pub org_id: OrgId,
    pub node_id: NodeId,
    pub lineage: Vec<NodeId>,
}

/// Wire shape of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub status: u16,
    pub message: String,
    pub retryable: bool,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.code().to_string(),
            status: err.status_code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

fn ids(org_id: &str, node_id: &str) -> Result<(OrgId, NodeId), ApiError> {
    Ok((OrgId::parse(org_id)?, NodeId::parse(node_id)?))
}

/// Configuration API service
pub struct ConfigApi {
    service: Arc<ConfigService>,
    identity: IdentityResolver,
}

impl ConfigApi {
    pub fn new(service: Arc<ConfigService>, identity: IdentityResolver) -> Self {
        Self { service, identity }
    }

    /// Wire a service and resolver over one sled store.
    pub fn open(store: Arc<SledStore>, config: &EngineConfig) -> Self {
        let service = Arc::new(ConfigService::new(store.clone(), config));
        let identity = IdentityResolver::new(store, config.identity.clone());
        Self::new(service, identity)
    }

    pub fn service(&self) -> &ConfigService {
        &self.service
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    pub fn authenticate(&self, token: &str) -> Result<Identity, ApiError> {
        self.identity.resolve(token)
    }

    /// Token first, so a bad token wins over a malformed path.
    fn node_caller(
        &self,
        token: &str,
        org_id: &str,
        node_id: &str,
    ) -> Result<(Identity, OrgId, NodeId), ApiError> {
        let caller = self.authenticate(token)?;
        let (org_id, node_id) = ids(org_id, node_id)?;
        caller.verify_node_access(&org_id, &node_id)?;
        Ok((caller, org_id, node_id))
    }

    fn tree_caller(&self, token: &str, org_id: &str) -> Result<OrgId, ApiError> {
        let caller = self.authenticate(token)?;
        let org_id = OrgId::parse(org_id)?;
        caller.verify_tree_access(&org_id)?;
        Ok(org_id)
    }

    fn tree_node_caller(&self, token: &str, org_id: &str, node_id: &str) -> Result<(OrgId, NodeId), ApiError> {
        let caller = self.authenticate(token)?;
        let (org_id, node_id) = ids(org_id, node_id)?;
        caller.verify_tree_access(&org_id)?;
        Ok((org_id, node_id))
    }

    /// `GET /effective/{org_id}/{node_id}`
    pub fn get_effective(&self, token: &str, org_id: &str, node_id: &str) -> Result<EffectiveConfig, ApiError> {
        let (_, org_id, node_id) = self.node_caller(token, org_id, node_id)?;
        self.service.get_effective(&org_id, &node_id)
    }

    /// `GET /raw/{org_id}/{node_id}`
    pub fn get_raw_view(&self, token: &str, org_id: &str, node_id: &str) -> Result<RawView, ApiError> {
        let (_, org_id, node_id) = self.node_caller(token, org_id, node_id)?;
        self.service.get_raw_view(&org_id, &node_id)
    }

    /// `PATCH /raw/{org_id}/{node_id}`
    pub fn patch_raw(
        &self,
        token: &str,
        org_id: &str,
        node_id: &str,
        request: PatchRawRequest,
    ) -> Result<RawConfig, ApiError> {
        let (caller, org_id, node_id) = self.node_caller(token, org_id, node_id)?;
        self.service.write_raw(
            &org_id,
            &node_id,
            request.expected_version,
            request.patch,
            &caller.to_string(),
        )
    }

    /// `POST /tree/{org_id}/nodes`
    ///
    /// Creating a root creates the org and needs a global admin.
    pub fn create_node(&self, token: &str, org_id: &str, request: CreateNodeRequest) -> Result<OrgNode, ApiError> {
        let caller = self.authenticate(token)?;
        let org_id = OrgId::parse(org_id)?;
        if request.parent_id.is_none() {
            caller.verify_global_admin()?;
        } else {
            caller.verify_tree_access(&org_id)?;
        }
        let new_node = NewNode {
            org_id,
            node_id: request.node_id.map(NodeId::parse).transpose()?,
            parent_id: request.parent_id.map(NodeId::parse).transpose()?,
            node_type: request.node_type,
            name: request.name,
        };
        self.service.create_node(new_node)
    }

    /// `PATCH /tree/{org_id}/nodes/{node_id}`
    pub fn update_node(
        &self,
        token: &str,
        org_id: &str,
        node_id: &str,
        request: UpdateNodeRequest,
    ) -> Result<OrgNode, ApiError> {
        let (org_id, node_id) = self.tree_node_caller(token, org_id, node_id)?;
        match request.parent_id {
            Some(parent) => {
                let parent = NodeId::parse(parent)?;
                self.service.reparent_node(&org_id, &node_id, &parent)
            }
            None => self.service.get_node(&org_id, &node_id),
        }
    }

    pub fn delete_node(&self, token: &str, org_id: &str, node_id: &str) -> Result<OrgNode, ApiError> {
        let (org_id, node_id) = self.tree_node_caller(token, org_id, node_id)?;
        self.service.delete_node(&org_id, &node_id)
    }

    pub fn get_node(&self, token: &str, org_id: &str, node_id: &str) -> Result<OrgNode, ApiError> {
        let (_, org_id, node_id) = self.node_caller(token, org_id, node_id)?;
        self.service.get_node(&org_id, &node_id)
    }

    pub fn list_nodes(&self, token: &str, org_id: &str) -> Result<Vec<OrgNode>, ApiError> {
        let org_id = self.tree_caller(token, org_id)?;
        self.service.list_nodes(&org_id)
    }

    pub fn get_lineage(&self, token: &str, org_id: &str, node_id: &str) -> Result<LineageResponse, ApiError> {
        let (org_id, node_id) = self.tree_node_caller(token, org_id, node_id)?;
        let lineage = self.service.get_lineage(&org_id, &node_id)?;
        Ok(LineageResponse {
            org_id,
            node_id,
            lineage,
        })
    }

    /// `GET /audit/{org_id}/{node_id}?limit=N`
    pub fn get_audit(
        &self,
        token: &str,
        org_id: &str,
        node_id: &str,
        query: AuditQuery,
    ) -> Result<Vec<AuditSummary>, ApiError> {
        let (_, org_id, node_id) = self.node_caller(token, org_id, node_id)?;
        let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
        if limit == 0 || limit > MAX_AUDIT_LIMIT {
            return Err(ApiError::InvalidRequest(format!(
                "limit must be between 1 and {}",
                MAX_AUDIT_LIMIT
            )));
        }
        self.service
            .audit_list(&org_id, &node_id, limit, query.include_snapshots)
    }

    /// `POST /audit/{org_id}/{node_id}/rollback`
    pub fn rollback(
        &self,
        token: &str,
        org_id: &str,
        node_id: &str,
        request: RollbackRequest,
    ) -> Result<RawConfig, ApiError> {
        let (caller, org_id, node_id) = self.node_caller(token, org_id, node_id)?;
        self.service.rollback(
            &org_id,
            &node_id,
            request.target_version,
            request.expected_version,
            &caller.to_string(),
        )
    }

    pub fn verify_audit(&self, token: &str, org_id: &str, node_id: &str) -> Result<AuditVerification, ApiError> {
        let (org_id, node_id) = self.tree_node_caller(token, org_id, node_id)?;
        self.service.verify_audit(&org_id, &node_id)
    }
}
