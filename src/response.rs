//! Uniform response envelope
//!
//! Every outcome leaves the gateway in one of three fixed JSON shapes:
//! success with a payload, success with a message only, or a failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The envelope wrapping every response body.
///
/// Exactly one of `data`, `message`, `error` is populated.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `{"success": true, "data": ...}` with the given status.
pub fn success<T: Serialize>(data: T, status: StatusCode) -> Response {
    let body = ApiResponse {
        success: true,
        data: Some(data),
        message: None,
        error: None,
    };
    (status, Json(body)).into_response()
}

/// `{"success": true, "message": ...}` with the given status.
pub fn success_message(message: impl Into<String>, status: StatusCode) -> Response {
    let body = ApiResponse::<()> {
        success: true,
        data: None,
        message: Some(message.into()),
        error: None,
    };
    (status, Json(body)).into_response()
}

/// `{"success": false, "error": ...}` with the given status.
pub fn error(message: impl Into<String>, status: StatusCode) -> Response {
    let body = ApiResponse::<()> {
        success: false,
        data: None,
        message: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}
