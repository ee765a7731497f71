//! Identity Resolver
//!
//! Opaque bearer tokens map to scoped identities. Only the blake3 digest of a token is
//! stored; the plaintext is shown once when issued. Resolution answers "who is this",
//! while the `verify_*` helpers let callers decide "may they do X".

use crate::config::IdentityConfig;
use crate::error::{ApiError, StorageError};
use crate::store::TokenStore;
use crate::types::{NodeId, OrgId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const TOKEN_BODY_LEN: usize = 32;
const TOKEN_ID_LEN: usize = 16;

/// Who a caller is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    /// May operate across all orgs
    GlobalAdmin,
    /// Any node and the tree structure within one org
    OrgAdmin { org_id: OrgId },
    /// Reads and writes scoped to one node
    Team { org_id: OrgId, node_id: NodeId },
}

impl Identity {
    pub fn org_id(&self) -> Option<&OrgId> {
        match self {
            Identity::GlobalAdmin => None,
            Identity::OrgAdmin { org_id } | Identity::Team { org_id, .. } => Some(org_id),
        }
    }

    pub fn is_global_admin(&self) -> bool {
        matches!(self, Identity::GlobalAdmin)
    }

    pub fn can_access_node(&self, org_id: &OrgId, node_id: &NodeId) -> bool {
        match self {
            Identity::GlobalAdmin => true,
            Identity::OrgAdmin { org_id: own } => own == org_id,
            Identity::Team {
                org_id: own_org,
                node_id: own_node,
            } => own_org == org_id && own_node == node_id,
        }
    }

    pub fn can_manage_tree(&self, org_id: &OrgId) -> bool {
        match self {
            Identity::GlobalAdmin => true,
            Identity::OrgAdmin { org_id: own } => own == org_id,
            Identity::Team { .. } => false,
        }
    }

    pub fn verify_node_access(&self, org_id: &OrgId, node_id: &NodeId) -> Result<(), ApiError> {
        if !self.can_access_node(org_id, node_id) {
            return Err(ApiError::Forbidden(format!(
                "{} cannot access {}/{}",
                self, org_id, node_id
            )));
        }
        Ok(())
    }

    pub fn verify_tree_access(&self, org_id: &OrgId) -> Result<(), ApiError> {
        if !self.can_manage_tree(org_id) {
            return Err(ApiError::Forbidden(format!(
                "{} cannot manage the tree of {}",
                self, org_id
            )));
        }
        Ok(())
    }

    pub fn verify_global_admin(&self) -> Result<(), ApiError> {
        if !self.is_global_admin() {
            return Err(ApiError::Forbidden(format!(
                "{} is not a global admin",
                self
            )));
        }
        Ok(())
    }
}

/// Also used as the `changed_by` principal in audit records.
impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::GlobalAdmin => f.write_str("global-admin"),
            Identity::OrgAdmin { org_id } => write!(f, "org-admin:{}", org_id),
            Identity::Team { org_id, node_id } => write!(f, "team:{}/{}", org_id, node_id),
        }
    }
}

/// Stored form of an issued token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Short public handle, the first 16 hex chars of `token_hash`
    pub token_id: String,
    pub token_hash: String,
    pub identity: Identity,
    pub label: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    pub fn status_at(&self, now: DateTime<Utc>) -> TokenStatus {
        if self.revoked_at.is_some() {
            TokenStatus::Revoked
        } else if self.expires_at.map_or(false, |at| at <= now) {
            TokenStatus::Expired
        } else {
            TokenStatus::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Active,
    Expired,
    Revoked,
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStatus::Active => f.write_str("active"),
            TokenStatus::Expired => f.write_str("expired"),
            TokenStatus::Revoked => f.write_str("revoked"),
        }
    }
}

/// A freshly minted token. `token` is never stored.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub record: TokenRecord,
}

fn digest(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

pub struct IdentityResolver {
    store: Arc<dyn TokenStore>,
    config: IdentityConfig,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn TokenStore>, config: IdentityConfig) -> Self {
        Self { store, config }
    }

    /// Mint a token. `ttl_secs` of `None` uses the configured default; `Some(0)` never expires.
    pub fn issue(
        &self,
        identity: Identity,
        label: impl Into<String>,
        ttl_secs: Option<u64>,
    ) -> Result<IssuedToken, ApiError> {
        let token = format!(
            "{}{}",
            self.config.token_prefix,
            uuid::Uuid::new_v4().simple()
        );
        let token_hash = digest(&token);
        let issued_at = Utc::now();
        let ttl = ttl_secs.unwrap_or(self.config.default_token_ttl_secs);
        let expires_at = if ttl == 0 {
            None
        } else {
            let too_large = || ApiError::InvalidRequest(format!("ttl {}s is too large", ttl));
            let secs = i64::try_from(ttl).map_err(|_| too_large())?;
            let span = Duration::try_seconds(secs).ok_or_else(too_large)?;
            Some(issued_at.checked_add_signed(span).ok_or_else(too_large)?)
        };

        let record = TokenRecord {
            token_id: token_hash[..TOKEN_ID_LEN].to_string(),
            token_hash,
            identity,
            label: label.into(),
            issued_at,
            expires_at,
            revoked_at: None,
        };
        self.store.put_token(&record)?;

        info!(
            token_id = %record.token_id,
            identity = %record.identity,
            "Issued token"
        );
        Ok(IssuedToken { token, record })
    }

    pub fn resolve(&self, token: &str) -> Result<Identity, ApiError> {
        self.resolve_at(token, Utc::now())
    }

    /// Resolve against an explicit clock.
    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, ApiError> {
        if !self.is_well_formed(token) {
            debug!("Rejected malformed token");
            return Err(ApiError::InvalidToken);
        }
        let Some(record) = self.store.get_token(&digest(token))? else {
            debug!("Rejected unknown token");
            return Err(ApiError::InvalidToken);
        };
        match record.status_at(now) {
            TokenStatus::Active => Ok(record.identity),
            TokenStatus::Revoked => Err(ApiError::Revoked),
            TokenStatus::Expired => Err(ApiError::Expired),
        }
    }

    fn is_well_formed(&self, token: &str) -> bool {
        match token.strip_prefix(self.config.token_prefix.as_str()) {
            Some(body) => {
                body.len() == TOKEN_BODY_LEN && body.chars().all(|c| c.is_ascii_hexdigit())
            }
            None => false,
        }
    }

    /// Revoke by public id. Revoking twice keeps the first timestamp.
    pub fn revoke(&self, token_id: &str) -> Result<TokenRecord, ApiError> {
        let mut record = self
            .store
            .list_tokens()?
            .into_iter()
            .find(|r| r.token_id == token_id)
            .ok_or_else(|| ApiError::InvalidRequest(format!("unknown token id {}", token_id)))?;
        if record.revoked_at.is_none() {
            record.revoked_at = Some(Utc::now());
            self.store.put_token(&record)?;
            info!(token_id = %record.token_id, "Revoked token");
        }
        Ok(record)
    }

    pub fn list(&self) -> Result<Vec<TokenRecord>, StorageError> {
        self.store.list_tokens()
    }
}
