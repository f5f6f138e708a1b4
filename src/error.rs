use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

/// Terminal failures of a load cycle. Caught at the loader boundary and
/// shown to the user next to an empty table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Spreadsheet or tab not found: {0}")]
    SourceNotFound(String),

    #[error("Tab '{0}' returned no rows")]
    EmptySource(String),

    #[error("Failed to read spreadsheet: {0}")]
    Transport(String),
}

/// Display columns missing from the loaded header.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Column(s) not found in the spreadsheet: {}", .missing.join(", "))]
pub struct SchemaMismatch {
    pub missing: Vec<String>,
}

/// A single cell that did not match its declared type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CellParseFailure {
    #[error("empty cell")]
    Empty,

    #[error("'{raw}' is not a valid {expected}")]
    Malformed { raw: String, expected: &'static str },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::SchemaMismatch(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": err.to_string(),
                    "missing_columns": err.missing,
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
