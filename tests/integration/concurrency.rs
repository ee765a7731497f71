//! Concurrent writers racing on one node or one org tree.

use crate::integration::Harness;
use orgcfg::api::{PatchRawRequest, UpdateNodeRequest};
use orgcfg::error::ApiError;
use orgcfg::tree::NodeType;
use serde_json::json;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_two_writers_same_expected_version_one_wins() {
    let h = Arc::new(Harness::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let h = Arc::clone(&h);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                h.api.patch_raw(
                    &h.admin,
                    "acme",
                    "payments",
                    PatchRawRequest {
                        expected_version: Some(0),
                        patch: json!({ "writer": i }),
                    },
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(ApiError::VersionConflict { .. })))
        .count();
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);

    let audit = h
        .api
        .get_audit(&h.admin, "acme", "payments", Default::default())
        .unwrap();
    assert_eq!(audit.len(), 1);
}

#[test]
fn test_unpinned_writers_all_land_with_dense_versions() {
    let h = Arc::new(Harness::new());
    let writers = 8;

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                let mut patch = serde_json::Map::new();
                patch.insert(format!("w{}", i), json!(true));
                h.api
                    .patch_raw(
                        &h.admin,
                        "acme",
                        "search",
                        PatchRawRequest {
                            expected_version: None,
                            patch: serde_json::Value::Object(patch),
                        },
                    )
                    .unwrap()
                    .version
            })
        })
        .collect();

    let mut versions: Vec<u64> = handles.into_iter().map(|t| t.join().unwrap()).collect();
    versions.sort_unstable();
    assert_eq!(versions, (1..=writers as u64).collect::<Vec<_>>());

    let effective = h.effective("search");
    assert_eq!(effective.as_object().unwrap().len(), writers);

    let report = h.api.verify_audit(&h.admin, "acme", "search").unwrap();
    assert!(report.chain.valid);
}

#[test]
fn test_crossing_reparents_never_form_a_cycle() {
    let h = Arc::new(Harness::new());
    h.create("left", Some("root"), NodeType::Intermediate);
    h.create("right", Some("root"), NodeType::Intermediate);
    let barrier = Arc::new(Barrier::new(2));

    let moves = [("left", "right"), ("right", "left")];
    let handles: Vec<_> = moves
        .into_iter()
        .map(|(node, parent)| {
            let h = Arc::clone(&h);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                h.api.update_node(
                    &h.admin,
                    "acme",
                    node,
                    UpdateNodeRequest {
                        parent_id: Some(parent.to_string()),
                    },
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ApiError::CycleDetected(_)))));

    // both lineages still terminate at the root
    assert_eq!(h.lineage("left")[0], "root");
    assert_eq!(h.lineage("right")[0], "root");
}
