//! # Tabauth
//!
//! Client-side authentication sessions for Rust front ends. A [`SessionManager`] signs a user in
//! through a pluggable [`IdentityProviderClient`], keeps the account and last error for the
//! lifetime of the host, and hands out access tokens without ever prompting on its own.
//! [`RoleResolver`] turns the account's role claim into edit/manage capabilities.
//!
//! ```no_run
//! # #[cfg(all(feature = "session", feature = "dev"))]
//! # async fn run() -> Result<(), tabauth::AuthError> {
//! use std::sync::Arc;
//! use tabauth::providers::dev::{DevProvider, DevUser};
//! use tabauth::{AuthConfig, SessionManager};
//!
//! let origin = tabauth::url::Url::parse("http://localhost:5173").unwrap();
//! let config = AuthConfig::from_env(origin)?;
//! let provider = Arc::new(DevProvider::new().with_user(DevUser::new("ada@example.com", "Ada", ["Editor"])));
//! let session = SessionManager::new(provider, &config);
//!
//! session.login().await;
//! if session.capabilities().can_edit {
//!     let _token = session.access_token().await;
//! }
//! # Ok(())
//! # }
//! ```

pub use tabauth_core::*;

#[cfg(feature = "guard")]
pub use tabauth_guard::{Capabilities, Capability, Role, RoleClaim, RoleResolver, UnknownRole};

#[cfg(feature = "session")]
pub use tabauth_session::{AuthStatus, Session, SessionManager, SessionWatcher};

/// Identity provider implementations.
pub mod providers {
    /// In-memory provider for development and tests.
    #[cfg(feature = "dev")]
    pub mod dev {
        pub use tabauth_providers_dev::*;
    }
}
