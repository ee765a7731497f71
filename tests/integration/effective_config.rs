//! Effective config resolution: deep merge along the lineage and epoch-based invalidation.

use crate::integration::Harness;
use orgcfg::api::{CreateNodeRequest, PatchRawRequest, UpdateNodeRequest};
use orgcfg::error::ApiError;
use orgcfg::tree::NodeType;
use serde_json::json;

#[test]
fn test_dicts_merge_and_lists_replace_across_nodes() {
    let h = Harness::new();
    h.patch("root", json!({"tools": {"a": true, "b": true}, "mcp_servers": ["x", "y"]}));
    h.patch("payments", json!({"tools": {"b": false, "c": true}, "mcp_servers": ["z"]}));

    let effective = h.effective("payments");
    assert_eq!(effective["tools"], json!({"a": true, "b": false, "c": true}));
    assert_eq!(effective["mcp_servers"], json!(["z"]));
}

#[test]
fn test_three_level_merge() {
    let h = Harness::new();
    h.patch("root", json!({"a": 1, "b": {"x": 1}}));
    h.patch("eng", json!({"b": {"y": 2}}));
    h.patch("payments", json!({"b": {"x": 9}}));

    assert_eq!(h.effective("payments"), json!({"a": 1, "b": {"x": 9, "y": 2}}));
    assert_eq!(h.effective("eng"), json!({"a": 1, "b": {"x": 1, "y": 2}}));
}

#[test]
fn test_unwritten_lineage_is_empty_object() {
    let h = Harness::new();
    assert_eq!(h.effective("ranking"), json!({}));
}

#[test]
fn test_explicit_null_overrides_inherited_value() {
    let h = Harness::new();
    h.patch("root", json!({"model": "large", "limits": {"rpm": 10}}));
    h.patch("payments", json!({"model": null}));

    let effective = h.effective("payments");
    assert!(effective.as_object().unwrap().contains_key("model"));
    assert_eq!(effective["model"], json!(null));
    assert_eq!(effective["limits"], json!({"rpm": 10}));
    // siblings still inherit the root value
    assert_eq!(h.effective("search")["model"], json!("large"));
}

#[test]
fn test_ancestor_write_is_visible_on_next_read() {
    let h = Harness::new();
    h.patch("root", json!({"model": "large"}));
    let before = h.effective("ranking");
    assert_eq!(before["model"], json!("large"));

    h.patch("eng", json!({"model": "medium"}));
    let after = h.effective("ranking");
    assert_ne!(before, after);
    assert_eq!(after["model"], json!("medium"));

    h.patch("ranking", json!({"model": "small"}));
    assert_eq!(h.effective("ranking")["model"], json!("small"));
}

#[test]
fn test_repeat_reads_are_served_from_cache() {
    let h = Harness::new();
    h.patch("root", json!({"model": "large"}));
    let first = h.api.get_effective(&h.admin, "acme", "payments").unwrap();
    let second = h.api.get_effective(&h.admin, "acme", "payments").unwrap();
    assert_eq!(first, second);

    let stats = h.api.service().cache_stats();
    assert!(stats.hits >= 1);
}

#[test]
fn test_epoch_advances_on_every_accepted_write() {
    let h = Harness::new();
    let e0 = h.api.get_effective(&h.admin, "acme", "payments").unwrap().epoch;
    h.patch("root", json!({"a": 1}));
    let e1 = h.api.get_effective(&h.admin, "acme", "payments").unwrap().epoch;
    h.patch("search", json!({"b": 1}));
    let e2 = h.api.get_effective(&h.admin, "acme", "payments").unwrap().epoch;
    assert!(e1 > e0);
    assert!(e2 > e1);
}

#[test]
fn test_reparent_changes_inheritance() {
    let h = Harness::new();
    h.patch("eng", json!({"team": "eng"}));
    h.patch("search", json!({"team": "search"}));
    assert_eq!(h.effective("payments")["team"], json!("eng"));

    h.api
        .update_node(
            &h.admin,
            "acme",
            "payments",
            UpdateNodeRequest {
                parent_id: Some("search".into()),
            },
        )
        .unwrap();

    assert_eq!(h.lineage("payments"), vec!["root", "eng", "search", "payments"]);
    assert_eq!(h.effective("payments")["team"], json!("search"));
}

#[test]
fn test_raw_view_lists_every_lineage_document() {
    let h = Harness::new();
    h.patch("root", json!({"a": 1}));
    h.patch("payments", json!({"b": 2}));

    let view = h.api.get_raw_view(&h.admin, "acme", "payments").unwrap();
    let lineage: Vec<&str> = view.lineage.iter().map(|id| id.as_str()).collect();
    assert_eq!(lineage, vec!["root", "eng", "payments"]);

    let configs: Vec<(String, serde_json::Value)> = view
        .configs
        .iter()
        .map(|(id, doc)| (id.as_str().to_string(), doc.clone()))
        .collect();
    assert!(configs.contains(&("root".to_string(), json!({"a": 1}))));
    assert!(configs.contains(&("payments".to_string(), json!({"b": 2}))));
}

#[test]
fn test_deleted_node_id_is_never_reused() {
    let h = Harness::new();
    h.patch("payments", json!({"name": "old-team", "secret_tool": true}));
    assert_eq!(h.effective("payments")["secret_tool"], json!(true));
    h.api.delete_node(&h.admin, "acme", "payments").unwrap();

    let recreate = h.api.create_node(
        &h.admin,
        "acme",
        CreateNodeRequest {
            node_id: Some("payments".into()),
            parent_id: Some("search".into()),
            node_type: NodeType::Leaf,
            name: "payments".into(),
        },
    );
    assert!(matches!(recreate, Err(ApiError::InvalidRequest(_))));
    assert!(matches!(
        h.api.get_effective(&h.admin, "acme", "payments"),
        Err(ApiError::NodeNotFound { .. })
    ));

    // a fresh id starts from an empty document at version 0
    h.create("billing", Some("eng"), NodeType::Leaf);
    assert_eq!(h.effective("billing"), json!({}));
    let written = h
        .api
        .patch_raw(
            &h.admin,
            "acme",
            "billing",
            PatchRawRequest {
                expected_version: Some(0),
                patch: json!({"name": "billing"}),
            },
        )
        .unwrap();
    assert_eq!(written.version, 1);
    assert_eq!(written.document, json!({"name": "billing"}));
}
