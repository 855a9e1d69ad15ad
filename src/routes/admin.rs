//! Admin route handlers
//!
//! User listing and role assignment. The router applies the authentication
//! middleware and the admin gate ahead of these handlers; the handlers
//! re-check the role themselves so they stay safe under rewiring.

use crate::auth::{Identity, ADMIN_ROLE, DEFAULT_ROLE};
use crate::error::{ApiResult, AppError};
use crate::provider::{Profile, ProviderError};
use crate::response;
use crate::state::SharedState;
use crate::validation::FieldRule;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ASSIGN_ROLE_RULES: &[FieldRule] = &[
    FieldRule::not_empty("userId", "User ID is required"),
    FieldRule::optional_array("roles", "Roles must be an array"),
];

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct AdminUserEntry {
    id: Uuid,
    email: String,
    roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct UsersData {
    users: Vec<AdminUserEntry>,
}

#[derive(Debug, Serialize)]
struct AssignRoleData {
    message: &'static str,
    user: Profile,
}

fn require_admin_identity(identity: Option<Extension<Identity>>) -> Result<Identity, AppError> {
    let Extension(identity) =
        identity.ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;
    if !identity.is_admin() {
        return Err(AppError::Forbidden(
            "Access denied: Admin role required".to_string(),
        ));
    }
    Ok(identity)
}

/// GET /api/admin/users
///
/// Merge the provider's user list with the profile store; accounts without
/// a profile row get the default role set.
pub async fn get_all_users(
    State(state): State<SharedState>,
    identity: Option<Extension<Identity>>,
) -> ApiResult<Response> {
    require_admin_identity(identity)?;

    let auth_users = state.provider.list_users().await?;
    let profiles = state.provider.list_profiles().await?;

    let users = auth_users
        .into_iter()
        .map(|user| {
            let roles = profiles
                .iter()
                .find(|profile| profile.id == user.id)
                .map(|profile| profile.roles.clone())
                .unwrap_or_else(Identity::default_roles);

            AdminUserEntry {
                id: user.id,
                email: user.email,
                roles,
                created_at: user.created_at,
                last_sign_in_at: user.last_sign_in_at,
            }
        })
        .collect();

    Ok(response::success(UsersData { users }, StatusCode::OK))
}

/// POST /api/admin/assign-role
///
/// Replace a user's role set. An unspecified set grants user + admin.
pub async fn assign_role(
    State(state): State<SharedState>,
    identity: Option<Extension<Identity>>,
    Json(req): Json<AssignRoleRequest>,
) -> ApiResult<Response> {
    require_admin_identity(identity)?;

    let user_id = req
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("User ID is required".to_string()))?;
    let target = Uuid::parse_str(&user_id)
        .map_err(|_| AppError::BadRequest("Invalid user ID format".to_string()))?;

    let roles = req
        .roles
        .unwrap_or_else(|| vec![DEFAULT_ROLE.to_string(), ADMIN_ROLE.to_string()]);

    let profile = state
        .provider
        .update_roles(target, &roles)
        .await
        .map_err(|err| match err {
            ProviderError::ProfileNotFound => {
                AppError::NotFound("User profile not found".to_string())
            }
            other => other.into(),
        })?;

    Ok(response::success(
        AssignRoleData {
            message: "Roles assigned successfully",
            user: profile,
        },
        StatusCode::OK,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::provider::ProviderUser;
    use crate::routes::testing::{app, body_json, grant_access, json_request};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn profile_row(id: Uuid, roles: &[&str]) -> Profile {
        Profile {
            id,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            bio: None,
            avatar_url: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn non_admins_are_rejected_regardless_of_body() {
        let id = Uuid::new_v4();
        let mock = Arc::new(MockProvider::new());
        grant_access(&mock, id, "user@example.com", &["user"]);

        let response = app(mock.clone())
            .oneshot(json_request(
                "POST",
                "/api/admin/assign-role",
                Some("tok"),
                Some(json!({"this body": "is irrelevant"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Access denied: Admin role required");
        // Only the token validation and profile lookup ran.
        assert_eq!(mock.calls(), vec!["get_user", "fetch_profile"]);
    }

    #[tokio::test]
    async fn users_listing_merges_profiles_and_defaults_missing_rows() {
        let admin_id = Uuid::new_v4();
        let with_profile = Uuid::new_v4();
        let without_profile = Uuid::new_v4();

        let mock = Arc::new(MockProvider::new());
        grant_access(&mock, admin_id, "admin@example.com", &["user", "admin"]);
        *mock.list_users_result.lock().unwrap() = Some(Ok(vec![
            ProviderUser {
                id: with_profile,
                email: "a@example.com".into(),
                created_at: None,
                last_sign_in_at: None,
            },
            ProviderUser {
                id: without_profile,
                email: "b@example.com".into(),
                created_at: None,
                last_sign_in_at: None,
            },
        ]));
        *mock.list_profiles_result.lock().unwrap() =
            Some(Ok(vec![profile_row(with_profile, &["user", "admin"])]));

        let response = app(mock)
            .oneshot(json_request("GET", "/api/admin/users", Some("tok"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let users = body["data"]["users"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["roles"], json!(["user", "admin"]));
        assert_eq!(users[1]["roles"], json!(["user"]));
    }

    #[tokio::test]
    async fn assign_role_defaults_to_user_and_admin() {
        let admin_id = Uuid::new_v4();
        let target = Uuid::new_v4();

        let mock = Arc::new(MockProvider::new());
        grant_access(&mock, admin_id, "admin@example.com", &["user", "admin"]);
        *mock.update_roles_result.lock().unwrap() =
            Some(Ok(profile_row(target, &["user", "admin"])));

        let response = app(mock.clone())
            .oneshot(json_request(
                "POST",
                "/api/admin/assign-role",
                Some("tok"),
                Some(json!({"userId": target.to_string()})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["message"], "Roles assigned successfully");

        let (assigned_to, roles) = mock.assigned_roles.lock().unwrap().clone().unwrap();
        assert_eq!(assigned_to, target);
        assert_eq!(roles, vec!["user".to_string(), "admin".to_string()]);
    }

    #[tokio::test]
    async fn assign_role_requires_a_user_id() {
        let admin_id = Uuid::new_v4();
        let mock = Arc::new(MockProvider::new());
        grant_access(&mock, admin_id, "admin@example.com", &["user", "admin"]);

        let response = app(mock)
            .oneshot(json_request(
                "POST",
                "/api/admin/assign-role",
                Some("tok"),
                Some(json!({"roles": ["user"]})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["userId"], "User ID is required");
    }

    #[tokio::test]
    async fn assign_role_rejects_a_malformed_user_id() {
        let admin_id = Uuid::new_v4();
        let mock = Arc::new(MockProvider::new());
        grant_access(&mock, admin_id, "admin@example.com", &["user", "admin"]);

        let response = app(mock)
            .oneshot(json_request(
                "POST",
                "/api/admin/assign-role",
                Some("tok"),
                Some(json!({"userId": "not-a-uuid"})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid user ID format");
    }
}
