//! CLI route table end to end: parse arguments, execute against a workspace store.

use crate::integration::with_xdg_config_home;
use clap::Parser;
use orgcfg::cli::{exit_code, map_error, Cli, OutputFormat, RunContext};
use orgcfg::error::ApiError;
use serde_json::{json, Value};
use tempfile::TempDir;

fn run(ctx: &RunContext, args: &[&str]) -> Result<String, ApiError> {
    let mut argv = vec!["orgcfg"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    ctx.execute(&cli.command, cli.token.as_deref(), cli.format)
}

fn issue_admin(ctx: &RunContext) -> String {
    let out = run(
        ctx,
        &["--format", "json", "token", "issue", "--kind", "global-admin", "--label", "cli"],
    )
    .unwrap();
    let issued: Value = serde_json::from_str(&out).unwrap();
    issued["token"].as_str().unwrap().to_string()
}

#[test]
fn test_cli_build_tree_patch_and_show() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_config_home(&temp_dir, || {
        let ctx = RunContext::new(temp_dir.path().join("ws"), None).unwrap();
        let token = issue_admin(&ctx);
        let t = token.as_str();

        run(&ctx, &["--token", t, "node", "create", "--org", "acme", "--type", "root", "--name", "Acme", "--id", "root"]).unwrap();
        run(&ctx, &["--token", t, "node", "create", "--org", "acme", "--parent", "root", "--type", "leaf", "--name", "Payments", "--id", "payments"]).unwrap();

        run(&ctx, &["--token", t, "config", "patch", "--org", "acme", "--node", "root", "--json", r#"{"tools": {"a": true}}"#]).unwrap();
        let out = run(&ctx, &["--token", t, "config", "patch", "--org", "acme", "--node", "payments", "--json", r#"{"tools": {"b": true}}"#, "--expected-version", "0"]).unwrap();
        assert!(out.contains("version 1"));

        let out = run(&ctx, &["--token", t, "--format", "json", "config", "show", "--org", "acme", "--node", "payments"]).unwrap();
        let effective: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(effective["document"], json!({"tools": {"a": true, "b": true}}));

        let out = run(&ctx, &["--token", t, "node", "lineage", "--org", "acme", "--node", "payments"]).unwrap();
        assert!(out.contains("root") && out.contains("payments"));
    });
}

#[test]
fn test_cli_audit_rollback_and_verify() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_config_home(&temp_dir, || {
        let ctx = RunContext::new(temp_dir.path().join("ws"), None).unwrap();
        let token = issue_admin(&ctx);
        let t = token.as_str();

        run(&ctx, &["--token", t, "node", "create", "--org", "acme", "--type", "root", "--name", "Acme", "--id", "root"]).unwrap();
        for model in ["large", "medium", "small"] {
            let patch = format!(r#"{{"model": "{}"}}"#, model);
            run(&ctx, &["--token", t, "config", "patch", "--org", "acme", "--node", "root", "--json", &patch]).unwrap();
        }

        let out = run(&ctx, &["--token", t, "--format", "json", "audit", "list", "--org", "acme", "--node", "root"]).unwrap();
        let records: Vec<Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["version"], json!(3));

        run(&ctx, &["--token", t, "audit", "rollback", "--org", "acme", "--node", "root", "--to", "1"]).unwrap();
        let out = run(&ctx, &["--token", t, "--format", "json", "config", "show", "--org", "acme", "--node", "root"]).unwrap();
        let effective: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(effective["document"]["model"], json!("large"));

        let out = run(&ctx, &["--token", t, "audit", "verify", "--org", "acme", "--node", "root"]).unwrap();
        assert!(out.contains("Audit chain OK"));
    });
}

#[test]
fn test_cli_errors_map_to_codes() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_config_home(&temp_dir, || {
        let ctx = RunContext::new(temp_dir.path().join("ws"), None).unwrap();
        let err = run(&ctx, &["--token", "ocfg_nope", "config", "show", "--org", "acme", "--node", "root"]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));

        let text = map_error(&err, OutputFormat::Text);
        assert!(text.contains("invalid_token"));
        let body: Value = serde_json::from_str(&map_error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(body["status"], json!(401));
        assert_ne!(exit_code(&err), 0);
    });
}

#[test]
fn test_cli_token_list_and_revoke() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_config_home(&temp_dir, || {
        let ctx = RunContext::new(temp_dir.path().join("ws"), None).unwrap();
        let out = run(
            &ctx,
            &["--format", "json", "token", "issue", "--kind", "team", "--org", "acme", "--node", "payments"],
        )
        .unwrap();
        let issued: Value = serde_json::from_str(&out).unwrap();
        let token_id = issued["record"]["token_id"].as_str().unwrap().to_string();

        let list = run(&ctx, &["token", "list"]).unwrap();
        assert!(list.contains(&token_id));

        run(&ctx, &["token", "revoke", &token_id]).unwrap();
        let token = issued["token"].as_str().unwrap();
        let err = run(&ctx, &["--token", token, "config", "show", "--org", "acme", "--node", "payments"]).unwrap_err();
        assert!(matches!(err, ApiError::Revoked));
    });
}
