//! Identity provider boundary
//!
//! Everything the gateway delegates — credential checks, token issuance and
//! validation, password updates, profile storage — goes through the
//! [`IdentityProvider`] trait. The production implementation talks to a
//! Supabase-compatible backend over HTTP; tests substitute a mock. The
//! client is constructed once at startup and injected through `AppState`,
//! never held in module-level globals.

mod supabase;

pub use supabase::SupabaseProvider;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A user record as the identity provider reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// An issued session, passed through to the client untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as epoch seconds.
    pub expires_at: i64,
}

/// Result of a password sign-in: the user plus a fresh session.
#[derive(Debug, Clone)]
pub struct SignInData {
    pub user: ProviderUser,
    pub session: Session,
}

/// A row from the profile store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Provider failures, decoded into known variants.
///
/// The variants the handlers branch on are explicit; anything unrecognized
/// lands in `Api` with whatever code/status/message the provider returned.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The email is already registered with the provider.
    #[error("{0}")]
    EmailExists(String),

    /// The provider rejected the supplied credentials.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The profile store has no row for the requested id.
    #[error("profile not found")]
    ProfileNotFound,

    /// Any other provider-reported error.
    #[error("provider error ({status}): {message}")]
    Api {
        code: Option<String>,
        status: u16,
        message: String,
    },

    /// The provider could not be reached or returned garbage.
    #[error("provider request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Classify a decoded provider error body into a [`ProviderError`].
///
/// Known error codes take precedence; the message-substring checks exist
/// because older provider versions omit the code field.
pub(crate) fn classify_api_error(
    status: u16,
    code: Option<String>,
    message: String,
) -> ProviderError {
    match code.as_deref() {
        Some("email_exists") | Some("user_already_exists") => ProviderError::EmailExists(message),
        Some("invalid_credentials") | Some("invalid_grant") => {
            ProviderError::InvalidCredentials(message)
        }
        Some("PGRST116") => ProviderError::ProfileNotFound,
        _ if message.contains("already registered") => ProviderError::EmailExists(message),
        _ if message.contains("Invalid login credentials") => {
            ProviderError::InvalidCredentials(message)
        }
        _ => ProviderError::Api {
            code,
            status,
            message,
        },
    }
}

/// The operations the gateway needs from the identity platform.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a user with email/password. `email_confirm` skips the
    /// verification mail (development only).
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        email_confirm: bool,
    ) -> Result<ProviderUser, ProviderError>;

    /// Authenticate with email/password and obtain a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInData, ProviderError>;

    /// Revoke the session behind the given access token.
    async fn sign_out(&self, token: &str) -> Result<(), ProviderError>;

    /// Validate an access token and return the user it belongs to.
    async fn get_user(&self, token: &str) -> Result<ProviderUser, ProviderError>;

    /// Resend the signup verification email.
    async fn resend_verification(&self, email: &str) -> Result<(), ProviderError>;

    /// Send a password reset email.
    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    /// Update the password of the session behind `token` (recovery flow).
    async fn update_password(&self, token: &str, password: &str) -> Result<(), ProviderError>;

    /// Update a user's password by id (admin credential).
    async fn update_user_password(&self, id: Uuid, password: &str) -> Result<(), ProviderError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError>;

    /// List every user known to the provider (admin credential).
    async fn list_users(&self) -> Result<Vec<ProviderUser>, ProviderError>;

    /// Fetch the profile row for a user.
    async fn fetch_profile(&self, id: Uuid) -> Result<Profile, ProviderError>;

    /// Update bio/avatar on a profile row, returning the updated row.
    async fn update_profile(
        &self,
        id: Uuid,
        bio: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Profile, ProviderError>;

    /// Replace the role set on a profile row, returning the updated row.
    async fn update_roles(&self, id: Uuid, roles: &[String]) -> Result<Profile, ProviderError>;

    /// List all profile rows, newest first.
    async fn list_profiles(&self) -> Result<Vec<Profile>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classify_prefers_error_codes() {
        let err = classify_api_error(422, Some("email_exists".into()), "A user with this email address has already been registered".into());
        assert!(matches!(err, ProviderError::EmailExists(_)));

        let err = classify_api_error(
            400,
            Some("invalid_credentials".into()),
            "Invalid login credentials".into(),
        );
        assert!(matches!(err, ProviderError::InvalidCredentials(_)));

        let err = classify_api_error(406, Some("PGRST116".into()), "JSON object requested, multiple (or no) rows returned".into());
        assert!(matches!(err, ProviderError::ProfileNotFound));
    }

    #[test]
    fn classify_falls_back_to_message_substrings() {
        let err = classify_api_error(422, None, "User already registered".into());
        assert!(matches!(err, ProviderError::EmailExists(_)));

        let err = classify_api_error(400, None, "Invalid login credentials".into());
        assert!(matches!(err, ProviderError::InvalidCredentials(_)));
    }

    #[test]
    fn classify_keeps_unrecognized_errors_intact() {
        let err = classify_api_error(503, Some("over_request_rate_limit".into()), "Too many requests".into());
        match err {
            ProviderError::Api {
                code,
                status,
                message,
            } => {
                assert_eq!(code.as_deref(), Some("over_request_rate_limit"));
                assert_eq!(status, 503);
                assert_eq!(message, "Too many requests");
            }
            other => panic!("expected Api fallback, got {other:?}"),
        }
    }
}
