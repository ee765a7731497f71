//! Org tree presentation.

use super::shared::{table, timestamp};
use crate::api::LineageResponse;
use crate::tree::OrgNode;

pub fn format_node_text(node: &OrgNode) -> String {
    let parent = node
        .parent_node_id
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Node: {}/{}\n  Name: {}\n  Type: {}\n  Parent: {}\n  Created: {}\n  Updated: {}",
        node.org_id,
        node.node_id,
        node.name,
        node.node_type,
        parent,
        timestamp(&node.created_at),
        timestamp(&node.updated_at)
    )
}

pub fn format_node_list_text(nodes: &[OrgNode]) -> String {
    if nodes.is_empty() {
        return "No nodes.".to_string();
    }
    let mut table = table(vec!["Node ID", "Name", "Type", "Parent"]);
    for node in nodes {
        let parent = node
            .parent_node_id
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            node.node_id.to_string(),
            node.name.clone(),
            node.node_type.to_string(),
            parent,
        ]);
    }
    table.to_string()
}

pub fn format_lineage_text(lineage: &LineageResponse) -> String {
    let path: Vec<&str> = lineage.lineage.iter().map(|id| id.as_str()).collect();
    format!(
        "Lineage of {}/{} (depth {}):\n  {}",
        lineage.org_id,
        lineage.node_id,
        lineage.lineage.len(),
        path.join(" > ")
    )
}
