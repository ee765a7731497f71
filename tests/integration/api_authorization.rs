//! Token resolution and scope checks on every route.

use crate::integration::{org, Harness};
use orgcfg::api::{AuditQuery, CreateNodeRequest, ErrorResponse, PatchRawRequest, RollbackRequest};
use orgcfg::error::ApiError;
use orgcfg::identity::Identity;
use orgcfg::tree::NodeType;
use orgcfg::types::NodeId;
use serde_json::json;

fn patch() -> PatchRawRequest {
    PatchRawRequest {
        expected_version: None,
        patch: json!({"model": "small"}),
    }
}

#[test]
fn test_team_token_limited_to_its_node() {
    let h = Harness::new();
    let raw = h.api.patch_raw(&h.payments, "acme", "payments", patch()).unwrap();
    assert_eq!(raw.updated_by.as_deref(), Some("team:acme/payments"));
    assert!(h.api.get_effective(&h.payments, "acme", "payments").is_ok());
    assert!(h
        .api
        .get_audit(&h.payments, "acme", "payments", AuditQuery::default())
        .is_ok());

    for node in ["root", "eng", "search"] {
        assert!(matches!(
            h.api.get_effective(&h.payments, "acme", node),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            h.api.patch_raw(&h.payments, "acme", node, patch()),
            Err(ApiError::Forbidden(_))
        ));
    }
}

#[test]
fn test_team_token_cannot_touch_tree() {
    let h = Harness::new();
    let request = CreateNodeRequest {
        node_id: Some("rogue".into()),
        parent_id: Some("eng".into()),
        node_type: NodeType::Leaf,
        name: "Rogue".into(),
    };
    assert!(matches!(
        h.api.create_node(&h.payments, "acme", request),
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        h.api.list_nodes(&h.payments, "acme"),
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        h.api.verify_audit(&h.payments, "acme", "payments"),
        Err(ApiError::Forbidden(_))
    ));
}

#[test]
fn test_org_admin_manages_own_org_only() {
    let h = Harness::new();
    h.api.patch_raw(&h.org_admin, "acme", "root", patch()).unwrap();
    h.api
        .create_node(
            &h.org_admin,
            "acme",
            CreateNodeRequest {
                node_id: Some("growth".into()),
                parent_id: Some("root".into()),
                node_type: NodeType::Leaf,
                name: "Growth".into(),
            },
        )
        .unwrap();
    assert_eq!(h.lineage("growth"), vec!["root", "growth"]);

    h.api
        .create_node(
            &h.admin,
            "globex",
            CreateNodeRequest {
                node_id: Some("root".into()),
                parent_id: None,
                node_type: NodeType::Root,
                name: "Globex".into(),
            },
        )
        .unwrap();
    assert!(matches!(
        h.api.get_effective(&h.org_admin, "globex", "root"),
        Err(ApiError::Forbidden(_))
    ));
}

#[test]
fn test_rollback_attributed_to_caller() {
    let h = Harness::new();
    h.api.patch_raw(&h.payments, "acme", "payments", patch()).unwrap();
    h.patch("payments", json!({"model": "large"}));
    let raw = h
        .api
        .rollback(
            &h.org_admin,
            "acme",
            "payments",
            RollbackRequest {
                target_version: 1,
                expected_version: None,
            },
        )
        .unwrap();
    assert_eq!(raw.updated_by.as_deref(), Some("org-admin:acme"));
}

#[test]
fn test_bad_tokens() {
    let h = Harness::new();
    assert!(matches!(
        h.api.get_effective("", "acme", "payments"),
        Err(ApiError::InvalidToken)
    ));
    assert!(matches!(
        h.api.get_effective("ocfg_00000000000000000000000000000000", "acme", "payments"),
        Err(ApiError::InvalidToken)
    ));

    let issued = h
        .api
        .identity()
        .issue(
            Identity::Team {
                org_id: org(),
                node_id: NodeId::parse("search").unwrap(),
            },
            "short-lived",
            None,
        )
        .unwrap();
    h.api.identity().revoke(&issued.record.token_id).unwrap();
    assert!(matches!(
        h.api.get_effective(&issued.token, "acme", "search"),
        Err(ApiError::Revoked)
    ));
}

#[test]
fn test_expired_token() {
    let h = Harness::new();
    let issued = h
        .api
        .identity()
        .issue(Identity::GlobalAdmin, "brief", Some(60))
        .unwrap();
    let later = issued.record.issued_at + chrono::Duration::seconds(120);
    assert!(matches!(
        h.api.identity().resolve_at(&issued.token, later),
        Err(ApiError::Expired)
    ));
    assert!(h.api.identity().resolve(&issued.token).is_ok());
}

#[test]
fn test_unknown_org_and_node() {
    let h = Harness::new();
    assert!(matches!(
        h.api.get_effective(&h.admin, "initech", "root"),
        Err(ApiError::OrgNotFound(_))
    ));
    assert!(matches!(
        h.api.get_effective(&h.admin, "acme", "ghost"),
        Err(ApiError::NodeNotFound { .. })
    ));
}

#[test]
fn test_error_response_shape() {
    let h = Harness::new();
    let err = h
        .api
        .get_effective(&h.payments, "acme", "root")
        .unwrap_err();
    let body = ErrorResponse::from(&err);
    assert_eq!(body.code, "forbidden");
    assert_eq!(body.status, 403);
    assert!(!body.retryable);

    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value["code"], json!("forbidden"));
}
