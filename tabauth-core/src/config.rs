use crate::error::AuthError;
use crate::state::Scopes;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

/// Tenant used when none is configured; accepts work and personal accounts.
pub const DEFAULT_TENANT: &str = "common";

/// Base URL of the identity provider's authority.
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Scope requested at sign-in.
pub const LOGIN_SCOPE: &str = "User.Read";

/// Environment variable holding the client id.
pub const ENV_CLIENT_ID: &str = "TABAUTH_CLIENT_ID";
/// Environment variable holding the tenant id.
pub const ENV_TENANT_ID: &str = "TABAUTH_TENANT_ID";
/// Environment variable overriding the redirect URI.
pub const ENV_REDIRECT_URI: &str = "TABAUTH_REDIRECT_URI";
/// Environment variable overriding the post-logout redirect URI.
pub const ENV_POST_LOGOUT_REDIRECT_URI: &str = "TABAUTH_POST_LOGOUT_REDIRECT_URI";
/// Environment variable selecting the token cache location.
pub const ENV_CACHE_LOCATION: &str = "TABAUTH_CACHE_LOCATION";

/// Where the provider keeps its token cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheLocation {
    /// Scoped to the tab; gone when the tab or browser closes.
    #[default]
    SessionStorage,
    /// Process memory only; gone on reload.
    Memory,
}

impl FromStr for CacheLocation {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sessionStorage" => Ok(CacheLocation::SessionStorage),
            "memory" => Ok(CacheLocation::Memory),
            other => Err(AuthError::Configuration(format!(
                "unknown cache location: {}",
                other
            ))),
        }
    }
}

/// Client configuration for the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Application (client) id registered with the provider.
    pub client_id: String,
    /// Directory id. `None` means the multi-tenant `common` authority.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Where the provider returns after sign-in.
    pub redirect_uri: Url,
    /// Where the provider returns after sign-out.
    pub post_logout_redirect_uri: Url,
    /// Token cache location.
    #[serde(default)]
    pub cache_location: CacheLocation,
}

impl AuthConfig {
    /// Create a configuration for `client_id`, redirecting back to `origin`.
    pub fn new(client_id: impl Into<String>, origin: Url) -> Self {
        Self {
            client_id: client_id.into(),
            tenant_id: None,
            redirect_uri: origin.clone(),
            post_logout_redirect_uri: origin,
            cache_location: CacheLocation::default(),
        }
    }

    /// Set the tenant id.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the redirect URI.
    pub fn with_redirect_uri(mut self, uri: Url) -> Self {
        self.redirect_uri = uri;
        self
    }

    /// Set the post-logout redirect URI.
    pub fn with_post_logout_redirect_uri(mut self, uri: Url) -> Self {
        self.post_logout_redirect_uri = uri;
        self
    }

    /// Set the cache location.
    pub fn with_cache_location(mut self, location: CacheLocation) -> Self {
        self.cache_location = location;
        self
    }

    /// Load from `TABAUTH_*` environment variables and validate.
    pub fn from_env(origin: Url) -> Result<Self, AuthError> {
        Self::from_lookup(origin, |key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup and validate.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(origin: Url, lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = get(ENV_CLIENT_ID).ok_or_else(|| {
            AuthError::Configuration(format!("{} is not configured", ENV_CLIENT_ID))
        })?;

        let mut config = Self::new(client_id, origin);

        match get(ENV_TENANT_ID) {
            Some(tenant) => config.tenant_id = Some(tenant),
            None => log::warn!(
                "{} is not configured, using '{}' tenant",
                ENV_TENANT_ID,
                DEFAULT_TENANT
            ),
        }

        if let Some(uri) = get(ENV_REDIRECT_URI) {
            config.redirect_uri = parse_url(ENV_REDIRECT_URI, &uri)?;
        }
        if let Some(uri) = get(ENV_POST_LOGOUT_REDIRECT_URI) {
            config.post_logout_redirect_uri = parse_url(ENV_POST_LOGOUT_REDIRECT_URI, &uri)?;
        }
        if let Some(location) = get(ENV_CACHE_LOCATION) {
            config.cache_location = location.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration. Failures are not recoverable without redeploying.
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_identifier("client id", &self.client_id)?;
        if let Some(tenant) = &self.tenant_id {
            validate_identifier("tenant id", tenant)?;
        }
        for (name, uri) in [
            ("redirect URI", &self.redirect_uri),
            ("post-logout redirect URI", &self.post_logout_redirect_uri),
        ] {
            if uri.cannot_be_a_base() || !matches!(uri.scheme(), "http" | "https") {
                return Err(AuthError::Configuration(format!(
                    "{} must be an http(s) URL: {}",
                    name, uri
                )));
            }
        }
        Ok(())
    }

    /// The effective tenant, defaulting to `common`.
    pub fn tenant(&self) -> &str {
        self.tenant_id.as_deref().unwrap_or(DEFAULT_TENANT)
    }

    /// Authority URL for the configured tenant.
    pub fn authority(&self) -> String {
        format!("{}/{}", AUTHORITY_HOST, self.tenant())
    }

    /// Scopes requested at interactive sign-in.
    pub fn login_scopes(&self) -> Scopes {
        Scopes::new([LOGIN_SCOPE])
    }

    /// Scopes requested for API access tokens.
    pub fn api_scopes(&self) -> Scopes {
        Scopes::new([format!("api://{}/access_as_user", self.client_id)])
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url, AuthError> {
    Url::parse(value)
        .map_err(|e| AuthError::Configuration(format!("{} is not a valid URL: {}", key, e)))
}

fn validate_identifier(name: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Configuration(format!("{} is empty", name)));
    }
    if value.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(AuthError::Configuration(format!(
            "{} contains invalid characters",
            name
        )));
    }
    Ok(())
}
