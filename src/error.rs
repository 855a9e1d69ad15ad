//! Error handling module
//!
//! Provides the typed error taxonomy for the gateway and the terminal
//! mapping of every failure onto an HTTP response envelope.

use crate::provider::ProviderError;
use crate::response;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Application-wide error type
///
/// Handlers raise the typed variants for contract violations they detect
/// themselves; everything else (provider failures included) flows through
/// `Provider`/`Internal` and is normalized to a generic 500 so no internal
/// detail reaches the client.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AppError {
    /// Status code and client-facing message for this error.
    ///
    /// Provider and internal errors collapse to a fixed message; the
    /// underlying detail is only logged.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal(_) | AppError::Provider(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Provider(e) => error!("Provider error: {e}"),
            AppError::Internal(msg) => error!("Internal error: {msg}"),
            _ => {}
        }

        let (status, message) = self.status_and_message();
        response::error(message, status)
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn typed_errors_keep_their_message() {
        let (status, msg) = AppError::BadRequest("No token provided".into()).status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "No token provided");

        let (status, msg) =
            AppError::Forbidden("Access denied: Admin role required".into()).status_and_message();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(msg, "Access denied: Admin role required");

        let (status, _) = AppError::Conflict("Email already registered".into()).status_and_message();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn provider_errors_never_leak_detail() {
        let err = AppError::Provider(ProviderError::Api {
            code: Some("unexpected_failure".into()),
            status: 500,
            message: "connection to pg pool lost".into(),
        });

        let (status, msg) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "Internal server error");
    }

    #[test]
    fn internal_errors_use_generic_message() {
        let (status, msg) = AppError::Internal("stack trace here".into()).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "Internal server error");
    }
}
