//! Layered configuration loading from workspace files and the environment.

use crate::integration::{with_xdg_config_home, Harness};
use orgcfg::config::{ConfigLoader, EngineConfig};
use orgcfg::error::ApiError;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_workspace_config_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_config_home(&temp_dir, || {
        let workspace = temp_dir.path().join("ws");
        std::fs::create_dir_all(workspace.join("config")).unwrap();
        std::fs::write(
            workspace.join("config").join("config.toml"),
            r#"
[guardrails]
max_depth = 3
immutable_keys = ["name", "tenant"]

[cache]
enabled = false
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.guardrails.max_depth, 3);
        assert_eq!(
            config.guardrails.immutable_keys,
            vec!["name".to_string(), "tenant".to_string()]
        );
        assert!(!config.cache.enabled);
        assert_eq!(config.store.timeout_ms, 2_000);
    });
}

#[test]
fn test_global_file_below_workspace_file() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_config_home(&temp_dir, || {
        let global_dir = temp_dir.path().join("xdg").join("orgcfg");
        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            "[store]\ntimeout_ms = 750\n\n[guardrails]\nmax_depth = 6\n",
        )
        .unwrap();

        let workspace = temp_dir.path().join("ws");
        std::fs::create_dir_all(workspace.join("config")).unwrap();
        std::fs::write(
            workspace.join("config").join("config.toml"),
            "[guardrails]\nmax_depth = 5\n",
        )
        .unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.store.timeout_ms, 750);
        assert_eq!(config.guardrails.max_depth, 5);
    });
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("bad.toml");
    std::fs::write(&file, "[guardrails]\nmax_depth = 0\n").unwrap();

    let config = ConfigLoader::load_from_file(&file).unwrap();
    assert!(matches!(config.ensure_valid(), Err(ApiError::ConfigError(_))));
}

#[test]
fn test_configured_immutable_keys_enforced() {
    let mut config = EngineConfig::default();
    config.guardrails.immutable_keys = vec!["tenant".to_string()];
    let h = Harness::with_config(config);

    h.patch("payments", json!({"tenant": "t-1", "name": "free to change"}));
    h.patch("payments", json!({"name": "changed"}));
    let result = h.api.patch_raw(
        &h.admin,
        "acme",
        "payments",
        orgcfg::api::PatchRawRequest {
            expected_version: None,
            patch: json!({"tenant": "t-2"}),
        },
    );
    assert!(matches!(result, Err(ApiError::ImmutableFieldViolation(_))));
}
