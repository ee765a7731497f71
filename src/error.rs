//! Error types for the orgcfg configuration engine.

use crate::types::{NodeId, OrgId, Version};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Failed to encode or decode record: {0}")]
    Codec(String),

    #[error("Store call exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Store consistency fault: {0}")]
    Corrupt(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Codec(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Codec(err.to_string())
    }
}

/// Caller-visible errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    Expired,

    #[error("Token revoked")]
    Revoked,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Org not found: {0}")]
    OrgNotFound(OrgId),

    #[error("Node not found: {org_id}/{node_id}")]
    NodeNotFound { org_id: OrgId, node_id: NodeId },

    #[error("Audit version {version} not found for {org_id}/{node_id}")]
    VersionNotFound {
        org_id: OrgId,
        node_id: NodeId,
        version: Version,
    },

    #[error("Version conflict: expected {expected}, current is {actual}")]
    VersionConflict { expected: Version, actual: Version },

    #[error("Cycle detected: {0}")]
    CycleDetected(String),

    #[error("Depth exceeded: {0}")]
    DepthExceeded(String),

    #[error("Payload too large: {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Schema violation at {path}: {reason}")]
    SchemaViolation { path: String, reason: String },

    #[error("Immutable field violation: {0}")]
    ImmutableFieldViolation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl ApiError {
    pub fn node_not_found(org_id: &OrgId, node_id: &NodeId) -> Self {
        ApiError::NodeNotFound {
            org_id: org_id.clone(),
            node_id: node_id.clone(),
        }
    }

    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ApiError::SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidToken => "invalid_token",
            ApiError::Expired => "expired",
            ApiError::Revoked => "revoked",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::OrgNotFound(_)
            | ApiError::NodeNotFound { .. }
            | ApiError::VersionNotFound { .. } => "not_found",
            ApiError::VersionConflict { .. } => "version_conflict",
            ApiError::CycleDetected(_) => "cycle_detected",
            ApiError::DepthExceeded(_) => "depth_exceeded",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::SchemaViolation { .. } => "schema_violation",
            ApiError::ImmutableFieldViolation(_) => "immutable_field_violation",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::ConfigError(_) => "config_error",
            ApiError::StorageError(_) => "internal_error",
        }
    }

    /// HTTP status a transport should render this error with.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidToken | ApiError::Expired | ApiError::Revoked => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::OrgNotFound(_)
            | ApiError::NodeNotFound { .. }
            | ApiError::VersionNotFound { .. } => 404,
            ApiError::VersionConflict { .. } | ApiError::CycleDetected(_) => 409,
            ApiError::PayloadTooLarge { .. } => 413,
            ApiError::DepthExceeded(_)
            | ApiError::SchemaViolation { .. }
            | ApiError::ImmutableFieldViolation(_) => 422,
            ApiError::InvalidRequest(_) => 400,
            ApiError::ConfigError(_) | ApiError::StorageError(_) => 500,
        }
    }

    /// Whether the caller may retry the same request unchanged (after re-reading for conflicts).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::VersionConflict { .. } | ApiError::StorageError(_)
        )
    }
}
