//! Authentication and authorization module
//!
//! Token validation is delegated to the identity provider; this module owns
//! the per-request [`Identity`] snapshot and the role checks built on it.

mod middleware;

pub use middleware::{authenticate, require_admin};

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// The caller's identity for the duration of one request.
///
/// Set by the authentication middleware only, never by handlers.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

pub const ADMIN_ROLE: &str = "admin";
pub const DEFAULT_ROLE: &str = "user";

impl Identity {
    /// The role set every account starts with before a profile row exists.
    pub fn default_roles() -> Vec<String> {
        vec![DEFAULT_ROLE.to_string()]
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }
}

/// Extract the bearer token from an `Authorization` header.
///
/// A header without the `Bearer ` scheme, or with an empty token, counts
/// as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("Basic abc123")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn admin_role_membership() {
        let mut identity = Identity {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            roles: Identity::default_roles(),
            created_at: None,
            last_sign_in_at: None,
            bio: None,
            avatar_url: None,
        };
        assert!(!identity.is_admin());

        identity.roles.push(ADMIN_ROLE.to_string());
        assert!(identity.is_admin());
    }
}
