//! Lineage computation: root-first path to a node.

use crate::error::StorageError;
use crate::types::NodeId;
use std::collections::HashSet;

/// Walk parent pointers from `target` to the root and return the path root-first.
///
/// `parent_of` yields `Ok(None)` for a missing node, `Ok(Some(None))` at the root and
/// `Ok(Some(Some(parent)))` otherwise. Returns `Ok(None)` when `target` itself is missing.
/// A revisited node, a dangling parent pointer, or a walk longer than `max_steps` is a
/// consistency fault and is reported, never truncated.
pub fn walk_lineage<F>(
    target: &NodeId,
    max_steps: usize,
    mut parent_of: F,
) -> Result<Option<Vec<NodeId>>, StorageError>
where
    F: FnMut(&NodeId) -> Result<Option<Option<NodeId>>, StorageError>,
{
    let mut path = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = target.clone();

    loop {
        if !seen.insert(cursor.clone()) {
            return Err(StorageError::Corrupt(format!(
                "lineage of {} revisits {}",
                target, cursor
            )));
        }
        if path.len() >= max_steps {
            return Err(StorageError::Corrupt(format!(
                "lineage of {} exceeds {} steps",
                target, max_steps
            )));
        }

        let parent = match parent_of(&cursor)? {
            Some(parent) => parent,
            None if path.is_empty() => return Ok(None),
            None => {
                return Err(StorageError::Corrupt(format!(
                    "lineage of {} references missing node {}",
                    target, cursor
                )))
            }
        };

        path.push(cursor);
        match parent {
            Some(next) => cursor = next,
            None => break,
        }
    }

    path.reverse();
    Ok(Some(path))
}
