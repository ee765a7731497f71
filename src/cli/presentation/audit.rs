//! Audit presentation.

use super::shared::{table, timestamp};
use crate::audit::{AuditAction, AuditSummary, Change};
use crate::service::AuditVerification;

fn action_text(action: &AuditAction) -> String {
    match action {
        AuditAction::Write => "write".to_string(),
        AuditAction::Rollback { target_version } => format!("rollback to v{}", target_version),
    }
}

fn change_marker(change: &Change) -> &'static str {
    match change {
        Change::Added { .. } => "+",
        Change::Removed { .. } => "-",
        Change::Changed { .. } => "~",
    }
}

pub fn format_audit_list_text(records: &[AuditSummary]) -> String {
    if records.is_empty() {
        return "No audit records.".to_string();
    }
    let mut table = table(vec!["Version", "Changed At", "Changed By", "Action", "Changes"]);
    for record in records {
        let changes = if record.diff.is_empty() {
            "(no changes)".to_string()
        } else {
            record
                .diff
                .iter()
                .map(|d| format!("{} {}", change_marker(&d.change), d.path))
                .collect::<Vec<_>>()
                .join("\n")
        };
        table.add_row(vec![
            record.version.to_string(),
            timestamp(&record.changed_at),
            record.changed_by.clone(),
            action_text(&record.action),
            changes,
        ]);
    }
    table.to_string()
}

pub fn format_verification_text(report: &AuditVerification) -> String {
    let head = report.chain.head.as_deref().unwrap_or("-");
    if report.chain.valid {
        format!(
            "Audit chain OK for {}/{}\n  Records: {}\n  Current version: {}\n  Head: {}",
            report.org_id, report.node_id, report.chain.records, report.current_version, head
        )
    } else {
        format!(
            "Audit chain BROKEN for {}/{}\n  Records: {}\n  Broken at version: {}\n  Reason: {}",
            report.org_id,
            report.node_id,
            report.chain.records,
            report
                .chain
                .broken_at
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            report.chain.reason.as_deref().unwrap_or("unknown")
        )
    }
}
