//! Audit trail: versioning, conflicts, diffs, snapshots, rollback and the hash chain.

use crate::integration::{org, Harness};
use orgcfg::api::{AuditQuery, PatchRawRequest, RollbackRequest};
use orgcfg::audit::{AuditAction, Change};
use orgcfg::error::ApiError;
use orgcfg::types::NodeId;
use serde_json::{json, Value};

fn history(h: &Harness, node: &str) -> Vec<orgcfg::audit::AuditSummary> {
    h.api
        .get_audit(
            &h.admin,
            "acme",
            node,
            AuditQuery {
                limit: Some(100),
                include_snapshots: true,
            },
        )
        .unwrap()
}

fn pinned(expected: u64, patch: Value) -> PatchRawRequest {
    PatchRawRequest {
        expected_version: Some(expected),
        patch,
    }
}

#[test]
fn test_version_conflict_then_retry() {
    let h = Harness::new();
    for i in 1..=4 {
        h.patch("payments", json!({ "step": i }));
    }

    let stale = h
        .api
        .patch_raw(&h.admin, "acme", "payments", pinned(3, json!({"step": 99})));
    match stale {
        Err(ApiError::VersionConflict { expected, actual }) => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 4);
        }
        other => panic!("expected conflict, got {:?}", other),
    }
    assert_eq!(history(&h, "payments").len(), 4);

    let current = h.api.get_raw_view(&h.admin, "acme", "payments").unwrap();
    let version = current.versions[&NodeId::parse("payments").unwrap()];
    assert_eq!(version, 4);

    let raw = h
        .api
        .patch_raw(&h.admin, "acme", "payments", pinned(version, json!({"step": 5})))
        .unwrap();
    assert_eq!(raw.version, 5);
    assert_eq!(history(&h, "payments")[0].version, 5);
}

#[test]
fn test_first_write_pins_version_zero() {
    let h = Harness::new();
    let raw = h
        .api
        .patch_raw(&h.admin, "acme", "search", pinned(0, json!({"a": 1})))
        .unwrap();
    assert_eq!(raw.version, 1);
    assert!(matches!(
        h.api
            .patch_raw(&h.admin, "acme", "search", pinned(0, json!({"a": 2}))),
        Err(ApiError::VersionConflict { .. })
    ));
}

#[test]
fn test_each_write_records_exact_diff_and_snapshot() {
    let h = Harness::new();
    h.patch("payments", json!({"model": "large", "tools": {"a": true, "b": true}}));
    let raw = h.patch("payments", json!({"tools": {"b": false, "c": true}, "model": null}));

    let records = history(&h, "payments");
    assert_eq!(records.len(), 2);
    let latest = &records[0];
    assert_eq!(latest.version, 2);
    assert_eq!(latest.action, AuditAction::Write);
    assert_eq!(latest.full_snapshot.as_ref(), Some(&raw.document));
    assert_eq!(latest.changed_by, "global-admin");

    let mut paths: Vec<&str> = latest.diff.iter().map(|d| d.path.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec!["/model", "/tools/b", "/tools/c"]);

    let model = latest.diff.iter().find(|d| d.path == "/model").unwrap();
    assert_eq!(
        model.change,
        Change::Changed {
            from: json!("large"),
            to: json!(null)
        }
    );
}

#[test]
fn test_noop_write_still_versions_with_empty_diff() {
    let h = Harness::new();
    h.patch("payments", json!({"a": 1}));
    let raw = h.patch("payments", json!({"a": 1}));
    assert_eq!(raw.version, 2);
    let records = history(&h, "payments");
    assert!(records[0].diff.is_empty());
}

#[test]
fn test_rollback_restores_snapshot_as_new_version() {
    let h = Harness::new();
    for i in 1..=5 {
        h.patch("payments", json!({ "step": i, "tag": format!("v{}", i) }));
    }
    let records = history(&h, "payments");
    let v2 = records
        .iter()
        .find(|r| r.version == 2)
        .and_then(|r| r.full_snapshot.clone())
        .unwrap();

    let raw = h
        .api
        .rollback(
            &h.admin,
            "acme",
            "payments",
            RollbackRequest {
                target_version: 2,
                expected_version: None,
            },
        )
        .unwrap();
    assert_eq!(raw.version, 6);
    assert_eq!(raw.document, v2);

    let records = history(&h, "payments");
    assert_eq!(records[0].version, 6);
    assert_eq!(records[0].action, AuditAction::Rollback { target_version: 2 });
    assert_eq!(records[0].full_snapshot.as_ref(), Some(&v2));
    assert_eq!(h.effective("payments"), v2);
}

#[test]
fn test_rollback_to_unknown_version() {
    let h = Harness::new();
    h.patch("payments", json!({"a": 1}));
    let result = h.api.rollback(
        &h.admin,
        "acme",
        "payments",
        RollbackRequest {
            target_version: 7,
            expected_version: None,
        },
    );
    assert!(matches!(result, Err(ApiError::VersionNotFound { version: 7, .. })));
}

#[test]
fn test_rollback_with_stale_expected_version() {
    let h = Harness::new();
    h.patch("payments", json!({"a": 1}));
    h.patch("payments", json!({"a": 2}));
    let result = h.api.rollback(
        &h.admin,
        "acme",
        "payments",
        RollbackRequest {
            target_version: 1,
            expected_version: Some(1),
        },
    );
    assert!(matches!(result, Err(ApiError::VersionConflict { .. })));
}

#[test]
fn test_audit_list_is_newest_first_and_limited() {
    let h = Harness::new();
    for i in 1..=6 {
        h.patch("payments", json!({ "step": i }));
    }
    let page = h
        .api
        .get_audit(
            &h.admin,
            "acme",
            "payments",
            AuditQuery {
                limit: Some(3),
                include_snapshots: false,
            },
        )
        .unwrap();
    let versions: Vec<u64> = page.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![6, 5, 4]);
    assert!(page.iter().all(|r| r.full_snapshot.is_none()));
}

#[test]
fn test_chain_verifies_and_detects_tampering() {
    let h = Harness::new();
    for i in 1..=3 {
        h.patch("payments", json!({ "step": i }));
    }
    let report = h.api.verify_audit(&h.admin, "acme", "payments").unwrap();
    assert!(report.chain.valid);
    assert_eq!(report.chain.records, 3);
    assert_eq!(report.current_version, 3);

    let audit = h.store.db().open_tree("audit_records").unwrap();
    let key = format!("{}/payments/{:020}", org(), 2);
    let mut record: Value = serde_json::from_slice(&audit.get(&key).unwrap().unwrap()).unwrap();
    record["full_snapshot"] = json!({"step": 42});
    audit.insert(key.as_bytes(), serde_json::to_vec(&record).unwrap()).unwrap();

    let report = h.api.verify_audit(&h.admin, "acme", "payments").unwrap();
    assert!(!report.chain.valid);
    assert_eq!(report.chain.broken_at, Some(2));
}
