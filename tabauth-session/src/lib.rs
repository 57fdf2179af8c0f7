//! # Tabauth Session
//!
//! Holds the authentication state of a single browser tab: the signed-in account, the last
//! error and whether an interactive sign-in is in flight. [`SessionManager`] drives an
//! [`IdentityProviderClient`](tabauth_core::IdentityProviderClient) and reconciles its results
//! into [`Session`] snapshots, which hosts either query on each render or watch for changes.

#![warn(missing_docs)]

use tabauth_core::{Account, AuthError};
use tabauth_guard::{Capabilities, RoleResolver};
use tokio::sync::watch;

/// The session state machine.
pub mod manager;
pub use manager::SessionManager;

/// Where the session stands in the sign-in lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// No account.
    Unauthenticated,
    /// An interactive sign-in is in flight.
    Authenticating,
    /// An account is present.
    Authenticated,
}

/// A read-only snapshot of the session.
///
/// `account` and `error` may both be set: a renewal failure does not sign the user out.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub(crate) account: Option<Account>,
    pub(crate) error: Option<AuthError>,
    pub(crate) authenticating: bool,
    pub(crate) generation: u64,
}

impl Session {
    /// The signed-in account.
    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// The error from the most recent failed operation.
    pub fn error(&self) -> Option<&AuthError> {
        self.error.as_ref()
    }

    /// True iff an account is present.
    pub fn is_authenticated(&self) -> bool {
        self.account.is_some()
    }

    /// Lifecycle status. An in-flight sign-in takes precedence over an existing account.
    pub fn status(&self) -> AuthStatus {
        if self.authenticating {
            AuthStatus::Authenticating
        } else if self.account.is_some() {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Unauthenticated
        }
    }

    /// Role capabilities of the account in this snapshot.
    pub fn capabilities(&self) -> Capabilities {
        RoleResolver::resolve(self.account())
    }
}

/// Observes a [`SessionManager`] for changes.
#[derive(Debug, Clone)]
pub struct SessionWatcher {
    rx: watch::Receiver<Session>,
}

impl SessionWatcher {
    pub(crate) fn new(rx: watch::Receiver<Session>) -> Self {
        Self { rx }
    }

    /// Wait until the session changes. Returns `false` once the manager is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// The latest session, marking it as seen.
    pub fn snapshot(&mut self) -> Session {
        self.rx.borrow_and_update().clone()
    }

    /// Whether a change arrived since the last [`snapshot`](Self::snapshot).
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}
