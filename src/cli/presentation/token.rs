//! Token presentation.

use super::shared::{optional_timestamp, table, timestamp};
use crate::identity::{IssuedToken, TokenRecord};
use chrono::Utc;

pub fn format_issued_token_text(issued: &IssuedToken) -> String {
    format!(
        "Issued token {} for {}\n  Expires: {}\n\n{}\n\nStore it now; it cannot be shown again.",
        issued.record.token_id,
        issued.record.identity,
        optional_timestamp(&issued.record.expires_at),
        issued.token
    )
}

pub fn format_token_list_text(tokens: &[TokenRecord]) -> String {
    if tokens.is_empty() {
        return "No tokens issued.".to_string();
    }
    let now = Utc::now();
    let mut table = table(vec!["Token ID", "Identity", "Label", "Issued", "Expires", "Status"]);
    for token in tokens {
        table.add_row(vec![
            token.token_id.clone(),
            token.identity.to_string(),
            token.label.clone(),
            timestamp(&token.issued_at),
            optional_timestamp(&token.expires_at),
            token.status_at(now).to_string(),
        ]);
    }
    table.to_string()
}
