//! Authentication middleware
//!
//! Extracts the bearer token, has the identity provider validate it, and
//! attaches the caller's [`Identity`] to the request for downstream stages.

use crate::auth::{bearer_token, Identity};
use crate::error::AppError;
use crate::state::SharedState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

/// Validate the request's bearer token and attach the caller's identity.
///
/// Missing token → 401. Token the provider rejects → 403. A profile lookup
/// failure is not fatal here: the caller simply gets the default role set.
/// Provider errors never pass through to the client from this middleware.
pub async fn authenticate(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Access denied".to_string()))?;

    let user = state
        .provider
        .get_user(token)
        .await
        .map_err(|_| AppError::Forbidden("Invalid or expired token".to_string()))?;

    let roles = match state.provider.fetch_profile(user.id).await {
        Ok(profile) => profile.roles,
        Err(err) => {
            debug!(user_id = %user.id, "profile lookup failed ({err}), using default roles");
            Identity::default_roles()
        }
    };

    let identity = Identity {
        id: user.id,
        email: user.email,
        roles,
        created_at: None,
        last_sign_in_at: None,
        bio: None,
        avatar_url: None,
    };
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Authorization gate for admin routes. Inspects only the identity already
/// attached by [`authenticate`]; no provider call is made.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

    if !identity.is_admin() {
        return Err(AppError::Forbidden(
            "Access denied: Admin role required".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
