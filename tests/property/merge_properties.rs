//! Property-based tests for merge and diff guarantees

use orgcfg::audit::diff::apply_diff;
use orgcfg::audit::diff_documents;
use orgcfg::merge::{merge, merge_into};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,6}".prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-d]{1,2}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

/// Documents are always objects at the top level.
fn document() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-d]{1,2}", value(), 0..5)
        .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>()))
}

proptest! {
    #[test]
    fn merge_is_deterministic(docs in prop::collection::vec(document(), 0..5)) {
        let first = merge(&docs);
        let second = merge(&docs);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn merge_is_idempotent(doc in document()) {
        prop_assert_eq!(merge(&[doc.clone(), doc.clone()]), doc);
    }

    #[test]
    fn empty_document_is_identity(doc in document()) {
        prop_assert_eq!(merge(&[json!({}), doc.clone()]), doc.clone());
        prop_assert_eq!(merge(&[doc.clone(), json!({})]), doc);
    }

    #[test]
    fn merge_folds_left(a in document(), b in document(), c in document()) {
        let all = merge(&[a.clone(), b.clone(), c.clone()]);
        let mut stepwise = merge(&[a, b]);
        merge_into(&mut stepwise, &c);
        prop_assert_eq!(all, stepwise);
    }

    #[test]
    fn last_writer_wins_on_scalars(doc in document(), key in "[a-d]{1,2}", n in any::<i64>()) {
        let mut overlay = Map::new();
        overlay.insert(key.clone(), json!(n));
        let merged = merge(&[doc, Value::Object(overlay)]);
        prop_assert_eq!(merged.get(&key), Some(&json!(n)));
    }

    #[test]
    fn diff_replays_to_target(before in document(), after in document()) {
        let diff = diff_documents(&before, &after);
        prop_assert_eq!(apply_diff(&before, &diff), after);
    }

    #[test]
    fn diff_of_patch_touches_only_patched_paths(before in document(), patch in document()) {
        let mut after = before.clone();
        merge_into(&mut after, &patch);
        let diff = diff_documents(&before, &after);
        let patched_keys: Vec<&String> = patch.as_object().unwrap().keys().collect();
        for entry in &diff {
            let top = entry.path.trim_start_matches('/').split('/').next().unwrap_or("");
            prop_assert!(patched_keys.iter().any(|k| k.as_str() == top));
        }
    }
}
