//! Error types and error handling for the application
//!
//! This module defines the store's error taxonomy. All errors implement
//! `IntoResponse` so the HTTP layer can return them directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// The store reports absent rows as [`AppError::NotFound`] instead of leaking
/// the driver's error codes, so callers can branch on the kind.
#[derive(Error, Debug)]
pub enum AppError {
    /// The backing database could not be reached or opened
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// The targeted conversation or message does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request body could not be understood
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A query failed for a reason other than a missing row
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Returns true if this error means the targeted row is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
