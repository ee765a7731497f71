//! CLI presentation: text and json formatters per command family.

mod audit;
mod config;
mod shared;
mod token;
mod tree;

pub use audit::{format_audit_list_text, format_verification_text};
pub use config::{format_effective_text, format_raw_config_text, format_raw_view_text};
pub use shared::to_json;
pub use token::{format_issued_token_text, format_token_list_text};
pub use tree::{format_lineage_text, format_node_list_text, format_node_text};
