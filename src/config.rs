//! Configuration System
//!
//! Engine settings: store location and timeouts, guardrail limits, cache sizing,
//! token defaults and logging. Loaded in layers (defaults, global file, workspace
//! files, environment) by [`ConfigLoader`].

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub guardrails: GuardrailConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Sled database directory; relative paths resolve against the workspace root
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Upper bound on a single store transaction, including conflict retries
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".orgcfg/store")
}

fn default_timeout_ms() -> u64 {
    2_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn resolve_path(&self, workspace_root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            workspace_root.join(&self.path)
        }
    }
}

/// Structural and payload limits enforced before any write commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Maximum lineage length (root counts as 1)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Ceiling on the serialized size of one patch
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Maximum nesting of a stored document
    #[serde(default = "default_max_document_depth")]
    pub max_document_depth: usize,

    /// Top-level keys that cannot change once set
    #[serde(default = "default_immutable_keys")]
    pub immutable_keys: Vec<String>,
}

fn default_max_depth() -> usize {
    8
}

fn default_max_payload_bytes() -> usize {
    64 * 1024
}

fn default_max_document_depth() -> usize {
    32
}

fn default_immutable_keys() -> Vec<String> {
    vec!["name".to_string()]
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_payload_bytes: default_max_payload_bytes(),
            max_document_depth: default_max_document_depth(),
            immutable_keys: default_immutable_keys(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_entries_per_org")]
    pub max_entries_per_org: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_entries_per_org() -> usize {
    4_096
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries_per_org: default_max_entries_per_org(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Lifetime of newly issued tokens; 0 issues non-expiring tokens
    #[serde(default = "default_token_ttl_secs")]
    pub default_token_ttl_secs: u64,

    #[serde(default = "default_token_prefix")]
    pub token_prefix: String,
}

fn default_token_ttl_secs() -> u64 {
    86_400
}

fn default_token_prefix() -> String {
    "ocfg_".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            default_token_ttl_secs: default_token_ttl_secs(),
            token_prefix: default_token_prefix(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Store(String),
    Guardrails(String),
    Cache(String),
    Identity(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Store(msg) => write!(f, "store: {}", msg),
            ValidationError::Guardrails(msg) => write!(f, "guardrails: {}", msg),
            ValidationError::Cache(msg) => write!(f, "cache: {}", msg),
            ValidationError::Identity(msg) => write!(f, "identity: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl EngineConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.store.path.as_os_str().is_empty() {
            errors.push(ValidationError::Store("path cannot be empty".to_string()));
        }
        if self.store.timeout_ms == 0 {
            errors.push(ValidationError::Store("timeout_ms must be positive".to_string()));
        }

        if self.guardrails.max_depth == 0 {
            errors.push(ValidationError::Guardrails(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.guardrails.max_payload_bytes == 0 {
            errors.push(ValidationError::Guardrails(
                "max_payload_bytes must be positive".to_string(),
            ));
        }
        if self.guardrails.max_document_depth == 0 {
            errors.push(ValidationError::Guardrails(
                "max_document_depth must be at least 1".to_string(),
            ));
        }
        if self.guardrails.immutable_keys.iter().any(|k| k.trim().is_empty()) {
            errors.push(ValidationError::Guardrails(
                "immutable_keys cannot contain empty names".to_string(),
            ));
        }

        if self.cache.enabled && self.cache.max_entries_per_org == 0 {
            errors.push(ValidationError::Cache(
                "max_entries_per_org must be positive when the cache is enabled".to_string(),
            ));
        }

        if self.identity.token_prefix.is_empty() {
            errors.push(ValidationError::Identity(
                "token_prefix cannot be empty".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold errors into one `ApiError::ConfigError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })
    }
}
