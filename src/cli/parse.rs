//! CLI parse: clap types for orgcfg. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// orgcfg CLI - hierarchical configuration across an org tree
#[derive(Parser, Debug)]
#[command(name = "orgcfg")]
#[command(about = "Hierarchical configuration resolution across an organization tree")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Bearer token for scoped commands
    #[arg(long, global = true, env = "ORGCFG_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose logging (default: off)
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdentityKind {
    GlobalAdmin,
    OrgAdmin,
    Team,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Issue, revoke and list access tokens (local administration)
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Org tree structure
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },
    /// Effective and raw configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Audit history, rollback and chain verification
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Mint a token; the plaintext is printed once
    Issue {
        #[arg(long, value_enum)]
        kind: IdentityKind,
        /// Org scope (org-admin, team)
        #[arg(long)]
        org: Option<String>,
        /// Node scope (team)
        #[arg(long)]
        node: Option<String>,
        #[arg(long, default_value = "")]
        label: String,
        /// Lifetime in seconds; 0 never expires (default from config)
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Revoke a token by its id
    Revoke { token_id: String },
    /// List issued tokens
    List,
}

#[derive(Subcommand, Debug)]
pub enum NodeCommands {
    /// Create a node (omit --parent to create an org root)
    Create {
        #[arg(long)]
        org: String,
        #[arg(long)]
        parent: Option<String>,
        /// root, intermediate or leaf
        #[arg(long = "type")]
        node_type: String,
        #[arg(long)]
        name: String,
        /// Explicit node id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Move a node under a new parent
    Move {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
        #[arg(long)]
        parent: String,
    },
    /// Delete a childless node
    Delete {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
    },
    /// Show one node
    Show {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
    },
    /// Root-first path to a node
    Lineage {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
    },
    /// List every node of an org
    List {
        #[arg(long)]
        org: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Effective (merged) configuration at a node
    Show {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
    },
    /// Raw documents along the node's lineage
    Raw {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
    },
    /// Deep-merge a partial document into a node's raw config
    Patch {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
        /// Inline JSON document
        #[arg(long, conflicts_with = "file")]
        json: Option<String>,
        /// JSON or TOML file (by extension)
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        expected_version: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuditCommands {
    /// Newest-first audit records for a node
    List {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
        #[arg(long)]
        limit: Option<usize>,
        /// Include full snapshots
        #[arg(long)]
        snapshots: bool,
    },
    /// Restore a previous version as a new write
    Rollback {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
        /// Version to restore
        #[arg(long = "to")]
        target_version: u64,
        #[arg(long)]
        expected_version: Option<u64>,
    },
    /// Recompute a node's audit hash chain
    Verify {
        #[arg(long)]
        org: String,
        #[arg(long)]
        node: String,
    },
}
