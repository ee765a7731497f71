//! Effective and raw config presentation.

use super::shared::{document_text, optional_timestamp};
use crate::service::{EffectiveConfig, RawView};
use crate::store::RawConfig;

pub fn format_effective_text(effective: &EffectiveConfig) -> String {
    format!(
        "Effective config for {}/{} (epoch {}):\n{}",
        effective.org_id,
        effective.node_id,
        effective.epoch,
        document_text(&effective.document)
    )
}

pub fn format_raw_view_text(view: &RawView) -> String {
    let mut out = format!("Raw configs along {}/{}:", view.org_id, view.node_id);
    for node_id in &view.lineage {
        let version = view.versions.get(node_id).copied().unwrap_or(0);
        out.push_str(&format!("\n\n[{}] version {}", node_id, version));
        if let Some(doc) = view.configs.get(node_id) {
            out.push('\n');
            out.push_str(&document_text(doc));
        }
    }
    out
}

pub fn format_raw_config_text(raw: &RawConfig) -> String {
    format!(
        "Wrote {}/{} version {}\n  Updated: {} by {}\n  Audit head: {}\n{}",
        raw.org_id,
        raw.node_id,
        raw.version,
        optional_timestamp(&raw.updated_at),
        raw.updated_by.as_deref().unwrap_or("-"),
        raw.audit_head.as_deref().unwrap_or("-"),
        document_text(&raw.document)
    )
}
