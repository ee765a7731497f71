//! Shared presentation helpers.

use crate::error::{ApiError, StorageError};
use chrono::{DateTime, Utc};
use comfy_table::{presets, Table};
use serde::Serialize;

pub fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::StorageError(StorageError::from(e)))
}

pub(super) fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.set_header(header);
    table
}

pub(super) fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub(super) fn optional_timestamp(at: &Option<DateTime<Utc>>) -> String {
    at.as_ref().map(timestamp).unwrap_or_else(|| "-".to_string())
}

/// Pretty JSON for documents embedded in text output.
pub(super) fn document_text(doc: &serde_json::Value) -> String {
    serde_json::to_string_pretty(doc).unwrap_or_else(|_| doc.to_string())
}
