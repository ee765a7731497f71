//! CLI route: single route table and run context. Dispatches to the API and presentation.

use crate::api::{
    AuditQuery, ConfigApi, CreateNodeRequest, PatchRawRequest, RollbackRequest,
    UpdateNodeRequest,
};
use crate::cli::command_name;
use crate::cli::help::requires_token;
use crate::cli::parse::{
    AuditCommands, Commands, ConfigCommands, IdentityKind, NodeCommands, OutputFormat,
    TokenCommands,
};
use crate::cli::presentation::{
    format_audit_list_text, format_effective_text, format_issued_token_text,
    format_lineage_text, format_node_list_text, format_node_text, format_raw_config_text,
    format_raw_view_text, format_token_list_text, format_verification_text, to_json,
};
use crate::config::{ConfigLoader, EngineConfig};
use crate::document::Document;
use crate::error::{ApiError, StorageError};
use crate::identity::Identity;
use crate::store::SledStore;
use crate::tree::NodeType;
use crate::types::{NodeId, OrgId};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace, loaded config and the API facade.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    api: ConfigApi,
    workspace_root: PathBuf,
    config: EngineConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Self::with_config(workspace_root, config)
    }

    pub fn with_config(workspace_root: PathBuf, config: EngineConfig) -> Result<Self, ApiError> {
        config.ensure_valid()?;
        let store_path = config.store.resolve_path(&workspace_root);
        let store = Arc::new(SledStore::open(&store_path, &config.store)?);
        debug!(store = %store_path.display(), "Opened store");
        let api = ConfigApi::open(store, &config);
        Ok(Self {
            api,
            workspace_root,
            config,
        })
    }

    pub fn api(&self) -> &ConfigApi {
        &self.api
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(
        &self,
        command: &Commands,
        token: Option<&str>,
        format: OutputFormat,
    ) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        let token = if requires_token(command) {
            token.ok_or_else(|| {
                ApiError::InvalidRequest("this command needs --token or ORGCFG_TOKEN".to_string())
            })?
        } else {
            ""
        };

        let result = match command {
            Commands::Token { command } => self.handle_token(command, format),
            Commands::Node { command } => self.handle_node(command, token, format),
            Commands::Config { command } => self.handle_config(command, token, format),
            Commands::Audit { command } => self.handle_audit(command, token, format),
        };
        info!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn handle_token(&self, command: &TokenCommands, format: OutputFormat) -> Result<String, ApiError> {
        let identity = self.api.identity();
        match command {
            TokenCommands::Issue {
                kind,
                org,
                node,
                label,
                ttl_secs,
            } => {
                let scoped = build_identity(*kind, org.as_deref(), node.as_deref())?;
                let issued = identity.issue(scoped, label.clone(), *ttl_secs)?;
                render(format, &issued, format_issued_token_text)
            }
            TokenCommands::Revoke { token_id } => {
                let record = identity.revoke(token_id)?;
                match format {
                    OutputFormat::Json => to_json(&record),
                    OutputFormat::Text => Ok(format!("Revoked token {}", record.token_id)),
                }
            }
            TokenCommands::List => {
                let tokens = identity.list()?;
                render(format, &tokens, |t| format_token_list_text(t))
            }
        }
    }

    fn handle_node(&self, command: &NodeCommands, token: &str, format: OutputFormat) -> Result<String, ApiError> {
        match command {
            NodeCommands::Create {
                org,
                parent,
                node_type,
                name,
                id,
            } => {
                let request = CreateNodeRequest {
                    node_id: id.clone(),
                    parent_id: parent.clone(),
                    node_type: node_type.parse::<NodeType>()?,
                    name: name.clone(),
                };
                let node = self.api.create_node(token, org, request)?;
                render(format, &node, format_node_text)
            }
            NodeCommands::Move { org, node, parent } => {
                let request = UpdateNodeRequest {
                    parent_id: Some(parent.clone()),
                };
                let moved = self.api.update_node(token, org, node, request)?;
                render(format, &moved, format_node_text)
            }
            NodeCommands::Delete { org, node } => {
                let deleted = self.api.delete_node(token, org, node)?;
                match format {
                    OutputFormat::Json => to_json(&deleted),
                    OutputFormat::Text => Ok(format!(
                        "Deleted node {}/{} (config and audit history retained)",
                        deleted.org_id, deleted.node_id
                    )),
                }
            }
            NodeCommands::Show { org, node } => {
                let found = self.api.get_node(token, org, node)?;
                render(format, &found, format_node_text)
            }
            NodeCommands::Lineage { org, node } => {
                let lineage = self.api.get_lineage(token, org, node)?;
                render(format, &lineage, format_lineage_text)
            }
            NodeCommands::List { org } => {
                let nodes = self.api.list_nodes(token, org)?;
                render(format, &nodes, |n| format_node_list_text(n))
            }
        }
    }

    fn handle_config(&self, command: &ConfigCommands, token: &str, format: OutputFormat) -> Result<String, ApiError> {
        match command {
            ConfigCommands::Show { org, node } => {
                let effective = self.api.get_effective(token, org, node)?;
                match format {
                    OutputFormat::Json => to_json(&effective),
                    OutputFormat::Text => Ok(format_effective_text(&effective)),
                }
            }
            ConfigCommands::Raw { org, node } => {
                let view = self.api.get_raw_view(token, org, node)?;
                render(format, &view, format_raw_view_text)
            }
            ConfigCommands::Patch {
                org,
                node,
                json,
                file,
                expected_version,
            } => {
                let patch = read_patch(json.as_deref(), file.as_deref(), &self.workspace_root)?;
                let request = PatchRawRequest {
                    expected_version: *expected_version,
                    patch,
                };
                let raw = self.api.patch_raw(token, org, node, request)?;
                render(format, &raw, format_raw_config_text)
            }
        }
    }

    fn handle_audit(&self, command: &AuditCommands, token: &str, format: OutputFormat) -> Result<String, ApiError> {
        match command {
            AuditCommands::List {
                org,
                node,
                limit,
                snapshots,
            } => {
                let query = AuditQuery {
                    limit: *limit,
                    include_snapshots: *snapshots,
                };
                let records = self.api.get_audit(token, org, node, query)?;
                render(format, &records, |r| format_audit_list_text(r))
            }
            AuditCommands::Rollback {
                org,
                node,
                target_version,
                expected_version,
            } => {
                let request = RollbackRequest {
                    target_version: *target_version,
                    expected_version: *expected_version,
                };
                let raw = self.api.rollback(token, org, node, request)?;
                render(format, &raw, format_raw_config_text)
            }
            AuditCommands::Verify { org, node } => {
                let report = self.api.verify_audit(token, org, node)?;
                render(format, &report, format_verification_text)
            }
        }
    }
}

fn render<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl Fn(&T) -> String,
) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => to_json(value),
        OutputFormat::Text => Ok(text(value)),
    }
}

fn build_identity(kind: IdentityKind, org: Option<&str>, node: Option<&str>) -> Result<Identity, ApiError> {
    let need = |flag: &str, value: Option<&str>| {
        value
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidRequest(format!("--{} is required for this kind", flag)))
    };
    match kind {
        IdentityKind::GlobalAdmin => {
            if org.is_some() || node.is_some() {
                return Err(ApiError::InvalidRequest(
                    "global-admin tokens take no --org or --node".to_string(),
                ));
            }
            Ok(Identity::GlobalAdmin)
        }
        IdentityKind::OrgAdmin => {
            if node.is_some() {
                return Err(ApiError::InvalidRequest(
                    "org-admin tokens take no --node".to_string(),
                ));
            }
            Ok(Identity::OrgAdmin {
                org_id: OrgId::parse(need("org", org)?)?,
            })
        }
        IdentityKind::Team => Ok(Identity::Team {
            org_id: OrgId::parse(need("org", org)?)?,
            node_id: NodeId::parse(need("node", node)?)?,
        }),
    }
}

/// Patch body from `--json` or `--file` (TOML when the extension says so, JSON otherwise).
fn read_patch(json: Option<&str>, file: Option<&Path>, workspace_root: &Path) -> Result<Document, ApiError> {
    match (json, file) {
        (Some(inline), _) => serde_json::from_str(inline)
            .map_err(|e| ApiError::InvalidRequest(format!("--json is not valid JSON: {}", e))),
        (None, Some(path)) => {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                workspace_root.join(path)
            };
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ApiError::StorageError(StorageError::IoError(e)))?;
            let is_toml = path.extension().map_or(false, |ext| ext == "toml");
            if is_toml {
                toml::from_str(&content).map_err(|e| {
                    ApiError::InvalidRequest(format!("{} is not valid TOML: {}", path.display(), e))
                })
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    ApiError::InvalidRequest(format!("{} is not valid JSON: {}", path.display(), e))
                })
            }
        }
        (None, None) => Err(ApiError::InvalidRequest(
            "config patch needs --json or --file".to_string(),
        )),
    }
}
