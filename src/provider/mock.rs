//! Scriptable in-memory provider for tests.
//!
//! Each operation pops a pre-configured result; anything not configured
//! fails loudly so a test can assert the provider was never reached.

use super::{
    IdentityProvider, Profile, ProviderError, ProviderUser, Session, SignInData,
};
use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

type Slot<T> = Mutex<Option<Result<T, ProviderError>>>;

#[derive(Default)]
pub struct MockProvider {
    pub create_user_result: Slot<ProviderUser>,
    pub sign_in_result: Slot<SignInData>,
    pub sign_out_result: Slot<()>,
    pub get_user_result: Slot<ProviderUser>,
    pub resend_result: Slot<()>,
    pub reset_email_result: Slot<()>,
    pub update_password_result: Slot<()>,
    pub update_user_password_result: Slot<()>,
    pub refresh_result: Slot<Session>,
    pub list_users_result: Slot<Vec<ProviderUser>>,
    pub fetch_profile_result: Slot<Profile>,
    pub update_profile_result: Slot<Profile>,
    pub update_roles_result: Slot<Profile>,
    pub list_profiles_result: Slot<Vec<Profile>>,

    /// Operation names in invocation order.
    pub calls: Mutex<Vec<&'static str>>,
    /// Arguments captured from the last `update_roles` call.
    pub assigned_roles: Mutex<Option<(Uuid, Vec<String>)>>,
    /// `email_confirm` flag captured from the last `create_user` call.
    pub created_with_confirm: Mutex<Option<bool>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn take<T>(&self, slot: &Slot<T>, name: &'static str) -> Result<T, ProviderError> {
        self.calls.lock().unwrap().push(name);
        slot.lock().unwrap().take().unwrap_or_else(|| {
            Err(ProviderError::Api {
                code: None,
                status: 500,
                message: format!("mock: no result configured for {name}"),
            })
        })
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn create_user(
        &self,
        _email: &str,
        _password: &str,
        email_confirm: bool,
    ) -> Result<ProviderUser, ProviderError> {
        *self.created_with_confirm.lock().unwrap() = Some(email_confirm);
        self.take(&self.create_user_result, "create_user")
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<SignInData, ProviderError> {
        self.take(&self.sign_in_result, "sign_in")
    }

    async fn sign_out(&self, _token: &str) -> Result<(), ProviderError> {
        self.take(&self.sign_out_result, "sign_out")
    }

    async fn get_user(&self, _token: &str) -> Result<ProviderUser, ProviderError> {
        self.take(&self.get_user_result, "get_user")
    }

    async fn resend_verification(&self, _email: &str) -> Result<(), ProviderError> {
        self.take(&self.resend_result, "resend_verification")
    }

    async fn send_password_reset(&self, _email: &str) -> Result<(), ProviderError> {
        self.take(&self.reset_email_result, "send_password_reset")
    }

    async fn update_password(&self, _token: &str, _password: &str) -> Result<(), ProviderError> {
        self.take(&self.update_password_result, "update_password")
    }

    async fn update_user_password(&self, _id: Uuid, _password: &str) -> Result<(), ProviderError> {
        self.take(&self.update_user_password_result, "update_user_password")
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<Session, ProviderError> {
        self.take(&self.refresh_result, "refresh_session")
    }

    async fn list_users(&self) -> Result<Vec<ProviderUser>, ProviderError> {
        self.take(&self.list_users_result, "list_users")
    }

    async fn fetch_profile(&self, _id: Uuid) -> Result<Profile, ProviderError> {
        self.take(&self.fetch_profile_result, "fetch_profile")
    }

    async fn update_profile(
        &self,
        _id: Uuid,
        _bio: Option<String>,
        _avatar_url: Option<String>,
    ) -> Result<Profile, ProviderError> {
        self.take(&self.update_profile_result, "update_profile")
    }

    async fn update_roles(&self, id: Uuid, roles: &[String]) -> Result<Profile, ProviderError> {
        *self.assigned_roles.lock().unwrap() = Some((id, roles.to_vec()));
        self.take(&self.update_roles_result, "update_roles")
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, ProviderError> {
        self.take(&self.list_profiles_result, "list_profiles")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_operations_fail_and_are_recorded() {
        let mock = MockProvider::new();

        let result = tokio_test::block_on(mock.sign_in("a@b.com", "pw"));
        assert!(matches!(result, Err(ProviderError::Api { .. })));
        assert_eq!(mock.calls(), vec!["sign_in"]);
    }

    #[test]
    fn configured_results_are_consumed_once() {
        let mock = MockProvider::new();
        *mock.sign_out_result.lock().unwrap() = Some(Ok(()));

        assert!(tokio_test::block_on(mock.sign_out("tok")).is_ok());
        assert!(tokio_test::block_on(mock.sign_out("tok")).is_err());
    }
}
