//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::api::ErrorResponse;
use crate::cli::parse::OutputFormat;
use crate::error::ApiError;

/// Render an error for stderr in the requested format.
pub fn map_error(e: &ApiError, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let body = ErrorResponse::from(e);
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| e.to_string())
        }
        OutputFormat::Text => format!("error[{}]: {}", e.code(), e),
    }
}

/// Process exit code for a failed command.
pub fn exit_code(e: &ApiError) -> i32 {
    match e.status_code() {
        401 | 403 => 3,
        404 => 4,
        409 => 5,
        500 => 1,
        _ => 2,
    }
}
