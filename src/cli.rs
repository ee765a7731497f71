//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the API facade.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::{exit_code, map_error};
pub use parse::{
    AuditCommands, Cli, Commands, ConfigCommands, IdentityKind, NodeCommands, OutputFormat,
    TokenCommands,
};
pub use route::RunContext;
