//! Application error type mapping to HTTP status codes and JSON bodies.
//!
//! Two body shapes reach clients: `{"errors": {field: message}}` for form
//! validation and credential failures, `{"error": message}` for everything else.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use murmur_types::error::AccountError;

pub const INVALID_BODY: &str = "Invalid request body";
pub const BAD_CREDENTIALS: &str = "Bad username or password!";
pub const NO_ACTIVE_SESSION: &str = "No active session";
pub const INVALID_SESSION: &str = "Unauthorized: Invalid session";

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Account(AccountError),
    /// Missing or invalid session.
    Unauthorized(&'static str),
    /// Request body could not be parsed.
    BadRequest(&'static str),
    Internal(String),
}

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        AppError::Account(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Account(AccountError::Validation(errors)) => {
                (StatusCode::BAD_REQUEST, json!({ "errors": errors }))
            }
            AppError::Account(AccountError::InvalidCredentials) => (
                StatusCode::NOT_FOUND,
                json!({
                    "errors": {
                        "username": BAD_CREDENTIALS,
                        "password": BAD_CREDENTIALS,
                    }
                }),
            ),
            AppError::Account(e) => {
                tracing::error!(error = %e, "account operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
