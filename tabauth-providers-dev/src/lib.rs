//! # Tabauth Dev Provider
//!
//! An in-memory [`IdentityProviderClient`] for local development and tests. It signs in one of a
//! configured set of dev users without any network traffic, keeps a session-scoped account cache,
//! and can be told to fail the next sign-in or token request.

#![warn(missing_docs)]

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tabauth_core::url::Url;
use tabauth_core::{AccessToken, Account, ClaimSet, IdentityProviderClient, ProviderError, Scopes};

/// Tenant id stamped on dev accounts unless overridden.
pub const DEV_TENANT: &str = "dev-tenant";

/// A user the dev provider can sign in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevUser {
    /// Sign-in name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Values for the `roles` claim.
    pub roles: Vec<String>,
}

impl DevUser {
    /// Create a dev user with the given roles.
    pub fn new<I, S>(username: impl Into<String>, name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// How many times each provider operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Interactive sign-in requests.
    pub sign_in: usize,
    /// Sign-out requests.
    pub sign_out: usize,
    /// Silent token requests.
    pub acquire_token: usize,
}

#[derive(Default)]
struct DevState {
    users: Vec<DevUser>,
    selected: Option<usize>,
    cache: Vec<Account>,
    fail_next_sign_in: Option<ProviderError>,
    fail_next_token: Option<ProviderError>,
    last_sign_out_target: Option<Url>,
    calls: CallCounts,
}

/// In-memory identity provider.
pub struct DevProvider {
    tenant_id: String,
    state: Mutex<DevState>,
}

impl Default for DevProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DevProvider {
    /// Create a provider with no users. Sign-in behaves like a cancelled popup until one is added.
    pub fn new() -> Self {
        Self {
            tenant_id: DEV_TENANT.to_string(),
            state: Mutex::new(DevState::default()),
        }
    }

    /// Use a different tenant id for issued accounts.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    /// Add a user. The first user added is selected for sign-in.
    pub fn with_user(self, user: DevUser) -> Self {
        {
            let mut state = self.lock();
            state.users.push(user);
            if state.selected.is_none() {
                state.selected = Some(0);
            }
        }
        self
    }

    /// Seed the account cache, as if restored from a previous page load.
    pub fn with_cached_account(self, account: Account) -> Self {
        self.lock().cache.push(account);
        self
    }

    /// Choose which user the next sign-in returns. Returns `false` if no such user exists.
    pub fn select_user(&self, username: &str) -> bool {
        let mut state = self.lock();
        match state.users.iter().position(|u| u.username == username) {
            Some(index) => {
                state.selected = Some(index);
                true
            }
            None => false,
        }
    }

    /// Make the next interactive sign-in fail with `error`.
    pub fn fail_next_sign_in(&self, error: ProviderError) {
        self.lock().fail_next_sign_in = Some(error);
    }

    /// Make the next silent token request fail with `error`.
    pub fn fail_next_token(&self, error: ProviderError) {
        self.lock().fail_next_token = Some(error);
    }

    /// Drop all cached sessions, so silent renewal requires interaction.
    pub fn expire_sessions(&self) {
        self.lock().cache.clear();
    }

    /// Operation counters.
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// The return target passed to the most recent sign-out.
    pub fn last_sign_out_target(&self) -> Option<Url> {
        self.lock().last_sign_out_target.clone()
    }

    fn lock(&self) -> MutexGuard<'_, DevState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue_account(&self, user: &DevUser) -> Account {
        let object_id = uuid::Uuid::new_v4().to_string();
        let claims = ClaimSet::new()
            .with("oid", object_id.clone())
            .with("tid", self.tenant_id.clone())
            .with("preferred_username", user.username.clone())
            .with("name", user.name.clone())
            .with("roles", json!(user.roles));

        Account {
            home_account_id: format!("{}.{}", object_id, self.tenant_id),
            username: user.username.clone(),
            name: Some(user.name.clone()),
            tenant_id: Some(self.tenant_id.clone()),
            id_token_claims: Some(claims),
        }
    }
}

#[async_trait]
impl IdentityProviderClient for DevProvider {
    fn provider_id(&self) -> &str {
        "dev"
    }

    async fn sign_in_interactive(&self, scopes: &Scopes) -> Result<Account, ProviderError> {
        let user = {
            let mut state = self.lock();
            state.calls.sign_in += 1;
            if let Some(error) = state.fail_next_sign_in.take() {
                return Err(error);
            }
            match state.selected.and_then(|i| state.users.get(i)) {
                Some(user) => user.clone(),
                None => return Err(ProviderError::Cancelled),
            }
        };

        log::debug!(
            "dev provider signing in with scopes [{}]",
            scopes.to_space_separated()
        );

        let account = self.issue_account(&user);
        let mut state = self.lock();
        state.cache.retain(|a| a.username != account.username);
        state.cache.push(account.clone());
        Ok(account)
    }

    async fn sign_out_interactive(&self, return_to: Option<&Url>) {
        let mut state = self.lock();
        state.calls.sign_out += 1;
        state.cache.clear();
        state.last_sign_out_target = return_to.cloned();
    }

    async fn acquire_token_silent(
        &self,
        scopes: &Scopes,
        account: &Account,
    ) -> Result<AccessToken, ProviderError> {
        let mut state = self.lock();
        state.calls.acquire_token += 1;
        if let Some(error) = state.fail_next_token.take() {
            return Err(error);
        }
        if scopes.iter().next().is_none() {
            return Err(ProviderError::Provider("no scopes requested".into()));
        }
        if !state
            .cache
            .iter()
            .any(|a| a.home_account_id == account.home_account_id)
        {
            return Err(ProviderError::InteractionRequired(
                "no cached session for account".into(),
            ));
        }
        Ok(AccessToken::new(format!(
            "dev.{}",
            uuid::Uuid::new_v4().simple()
        )))
    }

    fn cached_accounts(&self) -> Vec<Account> {
        self.lock().cache.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> DevProvider {
        DevProvider::new()
            .with_user(DevUser::new("ada@example.com", "Ada", ["Admin"]))
            .with_user(DevUser::new("bob@example.com", "Bob", ["Viewer"]))
    }

    #[tokio::test]
    async fn test_sign_in_issues_account_with_roles() {
        let provider = provider();
        let account = provider
            .sign_in_interactive(&Scopes::new(["User.Read"]))
            .await
            .unwrap();

        assert_eq!(account.username, "ada@example.com");
        assert_eq!(account.roles(), vec!["Admin"]);
        assert_eq!(account.tenant_id.as_deref(), Some(DEV_TENANT));
        assert_eq!(provider.cached_accounts(), vec![account]);
    }

    #[tokio::test]
    async fn test_select_user() {
        let provider = provider();
        assert!(provider.select_user("bob@example.com"));
        assert!(!provider.select_user("eve@example.com"));

        let account = provider
            .sign_in_interactive(&Scopes::new(["User.Read"]))
            .await
            .unwrap();
        assert_eq!(account.roles(), vec!["Viewer"]);
    }

    #[tokio::test]
    async fn test_no_users_behaves_like_cancel() {
        let provider = DevProvider::new();
        let result = provider.sign_in_interactive(&Scopes::new(["User.Read"])).await;
        assert_eq!(result, Err(ProviderError::Cancelled));
    }

    #[tokio::test]
    async fn test_injected_failures_fire_once() {
        let provider = provider();
        provider.fail_next_sign_in(ProviderError::Network("offline".into()));
        let scopes = Scopes::new(["User.Read"]);

        assert!(provider.sign_in_interactive(&scopes).await.is_err());
        let account = provider.sign_in_interactive(&scopes).await.unwrap();

        let api = Scopes::new(["api://client/access_as_user"]);
        provider.fail_next_token(ProviderError::InteractionRequired("consent_required".into()));
        assert!(provider.acquire_token_silent(&api, &account).await.is_err());
        assert!(provider.acquire_token_silent(&api, &account).await.is_ok());

        assert_eq!(
            provider.calls(),
            CallCounts {
                sign_in: 2,
                sign_out: 0,
                acquire_token: 2
            }
        );
    }

    #[tokio::test]
    async fn test_token_requires_cached_session() {
        let provider = provider();
        let scopes = Scopes::new(["User.Read"]);
        let account = provider.sign_in_interactive(&scopes).await.unwrap();

        provider.expire_sessions();
        let result = provider.acquire_token_silent(&scopes, &account).await;
        assert!(matches!(result, Err(ProviderError::InteractionRequired(_))));
    }

    #[tokio::test]
    async fn test_sign_out_clears_cache() {
        let provider = provider();
        provider
            .sign_in_interactive(&Scopes::new(["User.Read"]))
            .await
            .unwrap();

        let target = Url::parse("https://app.example.com/").unwrap();
        provider.sign_out_interactive(Some(&target)).await;

        assert!(provider.cached_accounts().is_empty());
        assert_eq!(provider.last_sign_out_target(), Some(target));
    }
}
