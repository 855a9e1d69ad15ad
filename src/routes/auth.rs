//! Authentication route handlers
//!
//! Each handler is a short recipe: one or two identity provider calls,
//! provider errors translated into the local taxonomy, result wrapped in
//! the response envelope.

use crate::auth::bearer_token;
use crate::error::{ApiResult, AppError};
use crate::provider::{ProviderError, Session, SignInData};
use crate::response;
use crate::state::SharedState;
use crate::validation::FieldRule;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================
// Validation rules
// ============================================

pub const REGISTER_RULES: &[FieldRule] = &[
    FieldRule::email("email", "Valid email is required"),
    FieldRule::min_len("password", 8, "Password must be at least 8 characters long"),
];

pub const LOGIN_RULES: &[FieldRule] = &[
    FieldRule::email("email", "Valid email is required"),
    FieldRule::not_empty("password", "Password is required"),
];

pub const EMAIL_RULES: &[FieldRule] = &[FieldRule::email("email", "Valid email is required")];

pub const RESET_PASSWORD_RULES: &[FieldRule] = &[FieldRule::min_len(
    "password",
    8,
    "Password must be at least 8 characters long",
)];

pub const REFRESH_RULES: &[FieldRule] =
    &[FieldRule::not_empty("refresh_token", "Refresh token is required")];

// ============================================
// Request/Response Types
// ============================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegisteredUser {
    id: Uuid,
    email: String,
}

#[derive(Debug, Serialize)]
struct RegisterData {
    message: &'static str,
    user: RegisteredUser,
}

#[derive(Debug, Serialize)]
struct LoginUser {
    id: Uuid,
    email: String,
    roles: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LoginData {
    message: &'static str,
    user: LoginUser,
    session: Session,
}

#[derive(Debug, Serialize)]
struct RefreshData {
    message: &'static str,
    session: Session,
}

// ============================================
// Route Handlers
// ============================================

/// POST /api/auth/register
///
/// Create an account with the identity provider. Email confirmation is
/// skipped only in the development environment.
pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Response> {
    let auto_confirm = state.env.is_development();

    let user = state
        .provider
        .create_user(&req.email, &req.password, auto_confirm)
        .await
        .map_err(|err| match err {
            ProviderError::EmailExists(_) => {
                AppError::Conflict("Email already registered".to_string())
            }
            other => other.into(),
        })?;

    Ok(response::success(
        RegisterData {
            message: "User registered successfully",
            user: RegisteredUser {
                id: user.id,
                email: user.email,
            },
        },
        StatusCode::CREATED,
    ))
}

/// POST /api/auth/login
///
/// Authenticate and return the identity plus the provider-issued session.
/// A missing profile row means the default role set; any other profile
/// failure is a real error and is forwarded.
pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    let SignInData { user, session } = state
        .provider
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|err| match err {
            ProviderError::InvalidCredentials(message) => AppError::Unauthorized(message),
            other => other.into(),
        })?;

    let roles = match state.provider.fetch_profile(user.id).await {
        Ok(profile) => profile.roles,
        Err(ProviderError::ProfileNotFound) => crate::auth::Identity::default_roles(),
        Err(other) => return Err(other.into()),
    };

    Ok(response::success(
        LoginData {
            message: "Login successful",
            user: LoginUser {
                id: user.id,
                email: user.email,
                roles,
            },
            session,
        },
        StatusCode::OK,
    ))
}

/// POST /api/auth/logout
///
/// Revoke the presented token. The token check lives here, not in the
/// authentication middleware, so a missing token is a 400.
pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult<Response> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::BadRequest("No token provided".to_string()))?;

    state.provider.sign_out(token).await?;

    Ok(response::success_message(
        "Logged out successfully",
        StatusCode::OK,
    ))
}

/// POST /api/auth/resend-verification
pub async fn resend_verification(
    State(state): State<SharedState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Response> {
    let email = required(req.email, "Email is required")?;

    state.provider.resend_verification(&email).await?;

    Ok(response::success_message(
        "Verification email sent successfully",
        StatusCode::OK,
    ))
}

/// POST /api/auth/forgot-password
///
/// First half of the reset flow: ask the provider to mail a recovery link.
pub async fn forgot_password(
    State(state): State<SharedState>,
    Json(req): Json<EmailRequest>,
) -> ApiResult<Response> {
    let email = required(req.email, "Email is required")?;

    state.provider.send_password_reset(&email).await?;

    Ok(response::success_message(
        "Password reset email sent",
        StatusCode::OK,
    ))
}

/// POST /api/auth/reset-password
///
/// Second half of the reset flow. The route is bearer-protected; the
/// recovery session presented as the bearer token scopes the provider call.
pub async fn reset_password(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Response> {
    let password = required(req.password, "Password is required")?;
    required(req.token, "Reset token is required")?;

    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Access denied".to_string()))?;

    state.provider.update_password(token, &password).await?;

    Ok(response::success_message(
        "Password reset successfully",
        StatusCode::OK,
    ))
}

/// POST /api/auth/change-password
///
/// Authenticated password change. The old password itself is not
/// re-verified here; the provider call is made with the admin credential
/// against the authenticated user's id.
pub async fn change_password(
    State(state): State<SharedState>,
    identity: Option<Extension<crate::auth::Identity>>,
    body: Option<Json<ChangePasswordRequest>>,
) -> ApiResult<Response> {
    let req = body.map(|Json(body)| body).unwrap_or_default();

    let (Some(_old), Some(new), Some(confirm)) = (
        req.old_password.filter(|s| !s.is_empty()),
        req.new_password.filter(|s| !s.is_empty()),
        req.confirm_password.filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Old password, new password, and confirmation are required".to_string(),
        ));
    };

    if new != confirm {
        return Err(AppError::BadRequest(
            "New password and confirmation do not match".to_string(),
        ));
    }

    let Extension(identity) =
        identity.ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

    state
        .provider
        .update_user_password(identity.id, &new)
        .await?;

    Ok(response::success_message(
        "Password changed successfully",
        StatusCode::OK,
    ))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<SharedState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Response> {
    let refresh_token = required(req.refresh_token, "Refresh token is required")?;

    let session = state.provider.refresh_session(&refresh_token).await?;

    Ok(response::success(
        RefreshData {
            message: "Token refreshed successfully",
            session,
        },
        StatusCode::OK,
    ))
}

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}
