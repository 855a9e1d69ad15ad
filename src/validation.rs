//! Input validation layer
//!
//! Routes declare a list of [`FieldRule`]s; a middleware buffers the JSON
//! body, runs every rule against it, and rejects the request with a 400
//! before the handler (or any provider call) is reached:
//!
//! `{"success": false, "errors": [{"email": "Valid email is required"}]}`
//!
//! On success the buffered body is handed back to the next stage unchanged.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use validator::ValidateEmail;

/// Request bodies are small JSON documents.
const BODY_LIMIT: usize = 1024 * 1024;

/// A single declarative constraint on one body field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub kind: RuleKind,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum RuleKind {
    /// Present, a string, and a well-formed email address.
    Email,
    /// Present, a string, and non-empty.
    NotEmpty,
    /// Present, a string, and at least this many characters.
    MinLen(usize),
    /// Absent, or a string.
    OptionalString,
    /// Absent, or a string parseable as an http(s) URL.
    OptionalUrl,
    /// Absent, or an array.
    OptionalArray,
}

impl FieldRule {
    pub const fn email(field: &'static str, message: &'static str) -> Self {
        Self {
            field,
            kind: RuleKind::Email,
            message,
        }
    }

    pub const fn not_empty(field: &'static str, message: &'static str) -> Self {
        Self {
            field,
            kind: RuleKind::NotEmpty,
            message,
        }
    }

    pub const fn min_len(field: &'static str, min: usize, message: &'static str) -> Self {
        Self {
            field,
            kind: RuleKind::MinLen(min),
            message,
        }
    }

    pub const fn optional_string(field: &'static str, message: &'static str) -> Self {
        Self {
            field,
            kind: RuleKind::OptionalString,
            message,
        }
    }

    pub const fn optional_url(field: &'static str, message: &'static str) -> Self {
        Self {
            field,
            kind: RuleKind::OptionalUrl,
            message,
        }
    }

    pub const fn optional_array(field: &'static str, message: &'static str) -> Self {
        Self {
            field,
            kind: RuleKind::OptionalArray,
            message,
        }
    }

    fn check(&self, body: &Value) -> bool {
        let value = body.get(self.field);
        match self.kind {
            RuleKind::Email => value
                .and_then(Value::as_str)
                .is_some_and(|s| s.validate_email()),
            RuleKind::NotEmpty => value.and_then(Value::as_str).is_some_and(|s| !s.is_empty()),
            RuleKind::MinLen(min) => value
                .and_then(Value::as_str)
                .is_some_and(|s| s.chars().count() >= min),
            RuleKind::OptionalString => match value {
                None | Some(Value::Null) => true,
                Some(v) => v.is_string(),
            },
            RuleKind::OptionalUrl => match value {
                None | Some(Value::Null) => true,
                Some(v) => v.as_str().is_some_and(is_http_url),
            },
            RuleKind::OptionalArray => match value {
                None | Some(Value::Null) => true,
                Some(v) => v.is_array(),
            },
        }
    }
}

fn is_http_url(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}

/// Run `rules` against a parsed body, collecting one `{field: message}`
/// entry per failing rule.
pub fn run_rules(rules: &[FieldRule], body: &Value) -> Vec<(&'static str, &'static str)> {
    rules
        .iter()
        .filter(|rule| !rule.check(body))
        .map(|rule| (rule.field, rule.message))
        .collect()
}

#[derive(Debug, Serialize)]
struct ValidationErrors {
    success: bool,
    errors: Vec<Value>,
}

fn validation_failure(failures: Vec<(&'static str, &'static str)>) -> Response {
    let errors = failures
        .into_iter()
        .map(|(field, message)| serde_json::json!({ field: message }))
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(ValidationErrors {
            success: false,
            errors,
        }),
    )
        .into_response()
}

/// Middleware: validate the request body against `rules` before anything
/// downstream runs.
pub async fn validate_body(rules: &'static [FieldRule], request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return crate::response::error("Invalid request body", StatusCode::BAD_REQUEST);
        }
    };

    // An absent body validates like an empty object: required-field rules
    // fail, optional rules pass.
    let json: Value = if bytes.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(_) => {
                return crate::response::error("Invalid JSON body", StatusCode::BAD_REQUEST);
            }
        }
    };

    let failures = run_rules(rules, &json);
    if !failures.is_empty() {
        return validation_failure(failures);
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}
