//! Shared test utilities for integration tests
//!
//! Builds a store-backed API with a small org tree and scoped tokens, and isolates the
//! global config directory for tests that load configuration from disk.

use orgcfg::api::{ConfigApi, CreateNodeRequest, PatchRawRequest};
use orgcfg::config::EngineConfig;
use orgcfg::identity::Identity;
use orgcfg::store::{RawConfig, SledStore};
use orgcfg::tree::NodeType;
use orgcfg::types::{NodeId, OrgId};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Serializes XDG_CONFIG_HOME access across tests running in parallel
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with XDG_CONFIG_HOME pointed into `test_dir`, restoring it afterwards.
pub fn with_xdg_config_home<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let original = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().join("xdg"));

    let result = f();

    match original {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    result
}

/// Org "acme":
///
/// ```text
/// root (root)
/// └── eng (intermediate)
///     ├── payments (leaf)
///     └── search (intermediate)
///         └── ranking (leaf)
/// ```
pub struct Harness {
    pub _temp: TempDir,
    pub store: Arc<SledStore>,
    pub api: ConfigApi,
    pub admin: String,
    pub org_admin: String,
    pub payments: String,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let temp = TempDir::new().unwrap();
        let store_path = config.store.resolve_path(temp.path());
        let store = Arc::new(SledStore::open(&store_path, &config.store).unwrap());
        let api = ConfigApi::open(Arc::clone(&store), &config);

        let admin = api
            .identity()
            .issue(Identity::GlobalAdmin, "admin", None)
            .unwrap()
            .token;
        let org_admin = api
            .identity()
            .issue(Identity::OrgAdmin { org_id: org() }, "ops", None)
            .unwrap()
            .token;
        let payments = api
            .identity()
            .issue(
                Identity::Team {
                    org_id: org(),
                    node_id: NodeId::parse("payments").unwrap(),
                },
                "payments",
                None,
            )
            .unwrap()
            .token;

        let harness = Self {
            _temp: temp,
            store,
            api,
            admin,
            org_admin,
            payments,
        };
        harness.create("root", None, NodeType::Root);
        harness.create("eng", Some("root"), NodeType::Intermediate);
        harness.create("payments", Some("eng"), NodeType::Leaf);
        harness.create("search", Some("eng"), NodeType::Intermediate);
        harness.create("ranking", Some("search"), NodeType::Leaf);
        harness
    }

    pub fn create(&self, id: &str, parent: Option<&str>, node_type: NodeType) {
        self.api
            .create_node(
                &self.admin,
                "acme",
                CreateNodeRequest {
                    node_id: Some(id.to_string()),
                    parent_id: parent.map(str::to_string),
                    node_type,
                    name: id.to_string(),
                },
            )
            .unwrap();
    }

    /// Patch as global admin without a version pin.
    pub fn patch(&self, node: &str, patch: Value) -> RawConfig {
        self.api
            .patch_raw(
                &self.admin,
                "acme",
                node,
                PatchRawRequest {
                    expected_version: None,
                    patch,
                },
            )
            .unwrap()
    }

    pub fn effective(&self, node: &str) -> Value {
        self.api
            .get_effective(&self.admin, "acme", node)
            .unwrap()
            .document
    }

    pub fn lineage(&self, node: &str) -> Vec<String> {
        self.api
            .get_lineage(&self.admin, "acme", node)
            .unwrap()
            .lineage
            .iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }
}

pub fn org() -> OrgId {
    OrgId::parse("acme").unwrap()
}
