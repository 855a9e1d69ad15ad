//! Supabase-backed identity provider
//!
//! Talks to the GoTrue auth API (`/auth/v1`) and the PostgREST profile store
//! (`/rest/v1/user_profiles`). The gateway never inspects tokens itself; it
//! hands them to these endpoints and relays the verdict.

use super::{
    classify_api_error, IdentityProvider, Profile, ProviderError, ProviderUser, Session, SignInData,
};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Request timeout for every provider call. A timeout surfaces as a
/// `ProviderError::Network` and ends up as a generic 500.
const REQUEST_TIMEOUT_SECS: u64 = 10;

const PROFILE_COLUMNS: &str = "id,roles,bio,avatar_url,created_at";

/// Session payload as GoTrue returns it from the token endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: ProviderUser,
}

impl TokenResponse {
    fn into_parts(self) -> (ProviderUser, Session) {
        // Older GoTrue versions send only expires_in.
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));
        let session = Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        };
        (self.user, session)
    }
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    users: Vec<ProviderUser>,
}

pub struct SupabaseProvider {
    http: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl SupabaseProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            service_key: config.service_key.clone(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn profiles_url(&self, query: &str) -> String {
        format!("{}/rest/v1/user_profiles{}", self.base_url, query)
    }

    /// Public-facing call: anon key only, optionally a caller token.
    fn anon(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    /// Admin call: service key as both api key and bearer.
    fn admin(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Decode a non-success response into a typed provider error.
    ///
    /// GoTrue and PostgREST disagree on field names (`msg` vs `message`,
    /// `error_code` vs `code`), so the body is probed as loose JSON before
    /// classification.
    async fn error_from_response(response: Response) -> ProviderError {
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        let code = body
            .get("error_code")
            .or_else(|| body.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = body
            .get("msg")
            .or_else(|| body.get("message"))
            .or_else(|| body.get("error_description"))
            .and_then(Value::as_str)
            .unwrap_or("provider request failed")
            .to_string();

        classify_api_error(status, code, message)
    }

    async fn check(response: Response) -> Result<Response, ProviderError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    /// Run a PATCH against the profile store and return the first updated
    /// row. PostgREST answers row updates with an array; an empty array
    /// means no row matched the id.
    async fn patch_profile(&self, id: Uuid, body: Value) -> Result<Profile, ProviderError> {
        let response = self
            .admin(
                self.http
                    .patch(self.profiles_url(&format!("?id=eq.{id}&select={PROFILE_COLUMNS}"))),
            )
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;

        let rows: Vec<Profile> = Self::check(response).await?.json().await?;
        rows.into_iter().next().ok_or(ProviderError::ProfileNotFound)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        email_confirm: bool,
    ) -> Result<ProviderUser, ProviderError> {
        debug!(email, email_confirm, "creating user");
        let response = self
            .admin(self.http.post(self.auth_url("/admin/users")))
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": email_confirm,
            }))
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInData, ProviderError> {
        let response = self
            .anon(self.http.post(self.auth_url("/token?grant_type=password")))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let token: TokenResponse = Self::check(response).await?.json().await?;
        let (user, session) = token.into_parts();
        Ok(SignInData { user, session })
    }

    async fn sign_out(&self, token: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.auth_url("/logout"))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn get_user(&self, token: &str) -> Result<ProviderUser, ProviderError> {
        let response = self
            .anon(self.http.get(self.auth_url("/user")))
            .bearer_auth(token)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn resend_verification(&self, email: &str) -> Result<(), ProviderError> {
        let response = self
            .anon(self.http.post(self.auth_url("/resend")))
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let response = self
            .anon(self.http.post(self.auth_url("/recover")))
            .json(&json!({ "email": email }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn update_password(&self, token: &str, password: &str) -> Result<(), ProviderError> {
        // The recovery session carried by `token` scopes the update.
        let response = self
            .anon(self.http.put(self.auth_url("/user")))
            .bearer_auth(token)
            .json(&json!({ "password": password }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn update_user_password(&self, id: Uuid, password: &str) -> Result<(), ProviderError> {
        let response = self
            .admin(self.http.put(self.auth_url(&format!("/admin/users/{id}"))))
            .json(&json!({ "password": password }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let response = self
            .anon(
                self.http
                    .post(self.auth_url("/token?grant_type=refresh_token")),
            )
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let token: TokenResponse = Self::check(response).await?.json().await?;
        let (_, session) = token.into_parts();
        Ok(session)
    }

    async fn list_users(&self) -> Result<Vec<ProviderUser>, ProviderError> {
        let response = self
            .admin(self.http.get(self.auth_url("/admin/users")))
            .send()
            .await?;

        let page: UsersPage = Self::check(response).await?.json().await?;
        Ok(page.users)
    }

    async fn fetch_profile(&self, id: Uuid) -> Result<Profile, ProviderError> {
        let response = self
            .admin(
                self.http
                    .get(self.profiles_url(&format!("?id=eq.{id}&select={PROFILE_COLUMNS}"))),
            )
            // Single-object mode: no matching row becomes a PGRST116 error.
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        bio: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Profile, ProviderError> {
        // Only send the columns that were supplied; absent fields stay
        // untouched in the store.
        let mut patch = Map::new();
        if let Some(bio) = bio {
            patch.insert("bio".to_string(), Value::String(bio));
        }
        if let Some(avatar_url) = avatar_url {
            patch.insert("avatar_url".to_string(), Value::String(avatar_url));
        }

        self.patch_profile(id, Value::Object(patch)).await
    }

    async fn update_roles(&self, id: Uuid, roles: &[String]) -> Result<Profile, ProviderError> {
        self.patch_profile(id, json!({ "roles": roles })).await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, ProviderError> {
        let response = self
            .admin(self.http.get(self.profiles_url(&format!(
                "?select={PROFILE_COLUMNS}&order=created_at.desc"
            ))))
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }
}
