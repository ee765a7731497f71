//! Shared identifier types.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-node configuration version. 0 means "never written".
pub type Version = u64;

/// Per-org invalidation counter.
pub type Epoch = u64;

/// blake3 digest used by the audit chain and token store.
pub type Hash = [u8; 32];

const MAX_ID_LEN: usize = 128;

fn validate_id(kind: &str, raw: &str) -> Result<(), ApiError> {
    if raw.is_empty() {
        return Err(ApiError::InvalidRequest(format!("{} must not be empty", kind)));
    }
    if raw.len() > MAX_ID_LEN {
        return Err(ApiError::InvalidRequest(format!(
            "{} exceeds {} bytes",
            kind, MAX_ID_LEN
        )));
    }
    if let Some(bad) = raw
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(ApiError::InvalidRequest(format!(
            "{} contains invalid character {:?}",
            kind, bad
        )));
    }
    Ok(())
}

/// Organization identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(String);

impl OrgId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ApiError> {
        let raw = raw.into();
        validate_id("org_id", &raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node identifier, unique within one org.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ApiError> {
        let raw = raw.into();
        validate_id("node_id", &raw)?;
        Ok(Self(raw))
    }

    /// Mint a fresh random node id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
