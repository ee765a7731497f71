//! CLI command-name contract for logging and routing.

use crate::cli::parse::{AuditCommands, Commands, ConfigCommands, NodeCommands, TokenCommands};

/// Dotted command name (e.g. "node.create", "audit.verify").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Token { command } => format!("token.{}", token_command_name(command)),
        Commands::Node { command } => format!("node.{}", node_command_name(command)),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
        Commands::Audit { command } => format!("audit.{}", audit_command_name(command)),
    }
}

pub fn token_command_name(command: &TokenCommands) -> &'static str {
    match command {
        TokenCommands::Issue { .. } => "issue",
        TokenCommands::Revoke { .. } => "revoke",
        TokenCommands::List => "list",
    }
}

pub fn node_command_name(command: &NodeCommands) -> &'static str {
    match command {
        NodeCommands::Create { .. } => "create",
        NodeCommands::Move { .. } => "move",
        NodeCommands::Delete { .. } => "delete",
        NodeCommands::Show { .. } => "show",
        NodeCommands::Lineage { .. } => "lineage",
        NodeCommands::List { .. } => "list",
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show { .. } => "show",
        ConfigCommands::Raw { .. } => "raw",
        ConfigCommands::Patch { .. } => "patch",
    }
}

pub fn audit_command_name(command: &AuditCommands) -> &'static str {
    match command {
        AuditCommands::List { .. } => "list",
        AuditCommands::Rollback { .. } => "rollback",
        AuditCommands::Verify { .. } => "verify",
    }
}

/// Token administration talks to the store directly and needs no bearer token.
pub fn requires_token(command: &Commands) -> bool {
    !matches!(command, Commands::Token { .. })
}
