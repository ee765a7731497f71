//! Integration tests for the orgcfg configuration engine

mod api_authorization;
mod audit_trail;
mod cli_commands;
mod concurrency;
mod config_loading;
mod effective_config;
mod test_utils;

pub use test_utils::*;
