//! # Tabauth Core
//!
//! `tabauth-core` provides the foundational traits and types for the Tabauth client-side session framework.
//! It defines the account and claim types, the error taxonomy, client configuration and the
//! [`IdentityProviderClient`] capability every session is driven through.

#![warn(missing_docs)]

use async_trait::async_trait;
use url::Url;

/// Errors that can occur during authentication.
pub mod error;
pub use crate::error::{AuthError, ErrorKind, ProviderError};

/// Accounts, claims, tokens and scopes.
pub mod state;
pub use crate::state::{AccessToken, Account, ClaimSet, Scopes};

/// Client configuration for the identity provider.
pub mod config;
pub use crate::config::{AuthConfig, CacheLocation};

pub use url;

/// Capability interface over an external identity provider SDK.
///
/// Implementations own the protocol: popups and redirects, token endpoints, signature
/// validation and token caching. Callers only see accounts, tokens and [`ProviderError`]s.
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Get the provider identifier, used in logs.
    fn provider_id(&self) -> &str;

    /// Run the interactive sign-in flow (popup or redirect).
    async fn sign_in_interactive(&self, scopes: &Scopes) -> Result<Account, ProviderError>;

    /// Run the interactive sign-out flow. Best effort; failures are the provider's concern.
    async fn sign_out_interactive(&self, return_to: Option<&Url>);

    /// Renew an access token without user interaction.
    ///
    /// Must not fall back to an interactive prompt. Escalation is the caller's decision.
    async fn acquire_token_silent(
        &self,
        scopes: &Scopes,
        account: &Account,
    ) -> Result<AccessToken, ProviderError>;

    /// Accounts the provider already holds, e.g. restored from its cache on page load.
    fn cached_accounts(&self) -> Vec<Account>;
}

#[async_trait]
impl<T: IdentityProviderClient + ?Sized> IdentityProviderClient for std::sync::Arc<T> {
    fn provider_id(&self) -> &str {
        (**self).provider_id()
    }

    async fn sign_in_interactive(&self, scopes: &Scopes) -> Result<Account, ProviderError> {
        (**self).sign_in_interactive(scopes).await
    }

    async fn sign_out_interactive(&self, return_to: Option<&Url>) {
        (**self).sign_out_interactive(return_to).await
    }

    async fn acquire_token_silent(
        &self,
        scopes: &Scopes,
        account: &Account,
    ) -> Result<AccessToken, ProviderError> {
        (**self).acquire_token_silent(scopes, account).await
    }

    fn cached_accounts(&self) -> Vec<Account> {
        (**self).cached_accounts()
    }
}

#[async_trait]
impl<T: IdentityProviderClient + ?Sized> IdentityProviderClient for Box<T> {
    fn provider_id(&self) -> &str {
        (**self).provider_id()
    }

    async fn sign_in_interactive(&self, scopes: &Scopes) -> Result<Account, ProviderError> {
        (**self).sign_in_interactive(scopes).await
    }

    async fn sign_out_interactive(&self, return_to: Option<&Url>) {
        (**self).sign_out_interactive(return_to).await
    }

    async fn acquire_token_silent(
        &self,
        scopes: &Scopes,
        account: &Account,
    ) -> Result<AccessToken, ProviderError> {
        (**self).acquire_token_silent(scopes, account).await
    }

    fn cached_accounts(&self) -> Vec<Account> {
        (**self).cached_accounts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Refusing;

    #[async_trait]
    impl IdentityProviderClient for Refusing {
        fn provider_id(&self) -> &str {
            "refusing"
        }

        async fn sign_in_interactive(&self, _scopes: &Scopes) -> Result<Account, ProviderError> {
            Err(ProviderError::Cancelled)
        }

        async fn sign_out_interactive(&self, _return_to: Option<&Url>) {}

        async fn acquire_token_silent(
            &self,
            _scopes: &Scopes,
            _account: &Account,
        ) -> Result<AccessToken, ProviderError> {
            Err(ProviderError::InteractionRequired("login_required".into()))
        }

        fn cached_accounts(&self) -> Vec<Account> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_erased_provider_forwards_calls() {
        let provider: Arc<dyn IdentityProviderClient> = Arc::new(Refusing);
        let boxed: Box<dyn IdentityProviderClient> = Box::new(provider.clone());

        assert_eq!(boxed.provider_id(), "refusing");
        assert!(boxed.cached_accounts().is_empty());
        assert_eq!(
            boxed.sign_in_interactive(&Scopes::new(["User.Read"])).await,
            Err(ProviderError::Cancelled)
        );
    }
}
