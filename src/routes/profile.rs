//! Profile route handlers
//!
//! Read and update the caller's own profile. The identity snapshot comes
//! from the authentication middleware; updates go to the provider's profile
//! store and the returned row is merged into the response.

use crate::auth::Identity;
use crate::error::{ApiResult, AppError};
use crate::provider::ProviderError;
use crate::response;
use crate::state::SharedState;
use crate::validation::FieldRule;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

pub const UPDATE_PROFILE_RULES: &[FieldRule] = &[
    FieldRule::optional_string("bio", "Bio must be a string"),
    FieldRule::optional_url("avatar_url", "Avatar URL must be a valid URL"),
];

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProfileData {
    user: Identity,
}

#[derive(Debug, Serialize)]
struct UpdateProfileData {
    message: &'static str,
    user: Identity,
}

/// GET /api/auth/profile
pub async fn get_profile(identity: Option<Extension<Identity>>) -> ApiResult<Response> {
    let Extension(identity) =
        identity.ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

    Ok(response::success(
        ProfileData { user: identity },
        StatusCode::OK,
    ))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<SharedState>,
    identity: Option<Extension<Identity>>,
    Json(req): Json<ProfileUpdateRequest>,
) -> ApiResult<Response> {
    let Extension(mut identity) =
        identity.ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

    let profile = state
        .provider
        .update_profile(identity.id, req.bio, req.avatar_url)
        .await
        .map_err(|err| match err {
            ProviderError::ProfileNotFound => {
                AppError::NotFound("User profile not found".to_string())
            }
            other => other.into(),
        })?;

    identity.bio = profile.bio;
    identity.avatar_url = profile.avatar_url;

    Ok(response::success(
        UpdateProfileData {
            message: "Profile updated successfully",
            user: identity,
        },
        StatusCode::OK,
    ))
}
