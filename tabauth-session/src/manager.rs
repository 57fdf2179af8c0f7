use crate::{Session, SessionWatcher};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tabauth_core::url::Url;
use tabauth_core::{AccessToken, AuthConfig, AuthError, IdentityProviderClient, Scopes};
use tabauth_guard::{Capabilities, RoleResolver};
use tokio::sync::watch;

/// Owns the authentication state of one host (a browser tab, a window, a CLI process).
///
/// Provider failures never escape as errors: they are normalized into [`AuthError`] and
/// stored on the session, where the host reads them. Every state change bumps or checks a
/// generation counter, so a continuation that was superseded by a later login or logout
/// drops its result instead of resurrecting old state.
pub struct SessionManager<P: IdentityProviderClient + ?Sized = dyn IdentityProviderClient> {
    provider: Arc<P>,
    login_scopes: Scopes,
    api_scopes: Scopes,
    post_logout_redirect_uri: Url,
    state: watch::Sender<Session>,
    alive: AtomicBool,
}

impl<P: IdentityProviderClient + ?Sized + 'static> SessionManager<P> {
    /// Create a manager, seeding the account from the provider's cache if it holds one.
    pub fn new(provider: Arc<P>, config: &AuthConfig) -> Self {
        let account = provider.cached_accounts().into_iter().next();
        if let Some(account) = &account {
            log::debug!(
                "Restored cached {} account {}",
                provider.provider_id(),
                account.home_account_id
            );
        }

        let (state, _) = watch::channel(Session {
            account,
            ..Default::default()
        });

        Self {
            provider,
            login_scopes: config.login_scopes(),
            api_scopes: config.api_scopes(),
            post_logout_redirect_uri: config.post_logout_redirect_uri.clone(),
            state,
            alive: AtomicBool::new(true),
        }
    }

    /// Sign in interactively.
    ///
    /// Clears any previous error first. On failure the error is stored and the account is
    /// left as it was. A call made while another sign-in is in flight does not start a second
    /// provider request; it waits for the pending one to settle.
    pub async fn login(&self) {
        if self.is_disposed() {
            log::debug!("Ignoring login on a disposed session");
            return;
        }

        let mut generation = None;
        self.state.send_if_modified(|s| {
            if s.authenticating {
                return false;
            }
            s.generation += 1;
            s.authenticating = true;
            s.error = None;
            generation = Some(s.generation);
            true
        });

        let Some(generation) = generation else {
            log::debug!("Sign-in already in flight, waiting for it");
            let mut rx = self.state.subscribe();
            let _ = rx.wait_for(|s| !s.authenticating).await;
            return;
        };

        let mut attempt = LoginAttempt {
            state: &self.state,
            generation,
            settled: false,
        };

        log::info!("Starting interactive sign-in via {}", self.provider.provider_id());
        let result = self.provider.sign_in_interactive(&self.login_scopes).await;
        match &result {
            Ok(account) => log::info!("Signed in account {}", account.home_account_id),
            Err(e) => log::warn!("Login failed: {}", e),
        }

        let applied = self.update(Some(generation), move |s| {
            s.authenticating = false;
            match result {
                Ok(account) => {
                    s.account = Some(account);
                    s.error = None;
                }
                Err(e) => s.error = Some(AuthError::Login(e)),
            }
            true
        });
        attempt.settled = applied;
        if !applied {
            log::debug!("Discarding superseded sign-in result");
        }
    }

    /// Sign out.
    ///
    /// The local account is cleared before this returns; any error is kept so the host can
    /// still show why the last action failed.
    ///
    /// Inside a tokio runtime the provider sign-out is spawned right away, so it runs whether
    /// or not the returned future is awaited; awaiting it waits for the provider to finish.
    /// Outside a runtime the sign-out only happens when the returned future is polled.
    #[must_use = "outside a tokio runtime the provider sign-out only runs when this future is polled"]
    pub fn logout(&self) -> impl Future<Output = ()> + Send + 'static {
        let sign_out = if self.is_disposed() {
            None
        } else {
            self.state.send_modify(|s| {
                s.generation += 1;
                s.account = None;
                s.authenticating = false;
            });
            log::info!("Signed out locally");

            let provider = self.provider.clone();
            let return_to = self.post_logout_redirect_uri.clone();
            Some(async move {
                provider.sign_out_interactive(Some(&return_to)).await;
            })
        };

        let (task, pending) = match (sign_out, tokio::runtime::Handle::try_current()) {
            (Some(sign_out), Ok(handle)) => (Some(handle.spawn(sign_out)), None),
            (sign_out, _) => (None, sign_out),
        };

        async move {
            if let Some(task) = task {
                if let Err(e) = task.await {
                    log::warn!("Provider sign-out task failed: {}", e);
                }
            }
            if let Some(sign_out) = pending {
                sign_out.await;
            }
        }
    }

    /// Get an access token for the API scopes without user interaction.
    ///
    /// Returns `None` straight away when nobody is signed in. On failure the error is stored
    /// and `None` is returned; the account is kept and no interactive prompt is opened.
    /// Whether to fall back to [`login`](Self::login) is the caller's decision.
    pub async fn access_token(&self) -> Option<AccessToken> {
        if self.is_disposed() {
            return None;
        }

        let (account, generation) = {
            let session = self.state.borrow();
            (session.account.clone()?, session.generation)
        };

        match self
            .provider
            .acquire_token_silent(&self.api_scopes, &account)
            .await
        {
            Ok(token) => {
                if self.update(Some(generation), |s| s.error.take().is_some()) {
                    Some(token)
                } else {
                    log::debug!("Discarding token for a superseded session");
                    None
                }
            }
            Err(e) => {
                log::warn!(
                    "Silent token acquisition failed for {}: {}",
                    account.home_account_id,
                    e
                );
                let applied = self.update(Some(generation), move |s| {
                    s.error = Some(AuthError::TokenAcquisition(e));
                    true
                });
                if !applied {
                    log::debug!("Discarding stale token acquisition failure");
                }
                None
            }
        }
    }

    /// Reset the error. The account is untouched.
    pub fn clear_error(&self) {
        self.update(None, |s| s.error.take().is_some());
    }

    /// A snapshot of the current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// True iff an account is present.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Role capabilities of the current account, derived afresh on every call.
    pub fn capabilities(&self) -> Capabilities {
        RoleResolver::resolve(self.state.borrow().account.as_ref())
    }

    /// Watch the session for changes.
    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher::new(self.state.subscribe())
    }

    /// Mark the owning host as gone.
    ///
    /// Results of operations still in flight are discarded and later operations do nothing.
    pub fn dispose(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            self.state.send_if_modified(|s| {
                s.generation += 1;
                std::mem::replace(&mut s.authenticating, false)
            });
            log::debug!("Session disposed");
        }
    }

    /// Whether [`dispose`](Self::dispose) was called.
    pub fn is_disposed(&self) -> bool {
        !self.alive.load(Ordering::SeqCst)
    }

    /// Apply `f` unless the session is disposed or, when `generation` is given, superseded.
    /// `f` returns whether it changed anything. Returns whether `f` ran.
    fn update<F>(&self, generation: Option<u64>, f: F) -> bool
    where
        F: FnOnce(&mut Session) -> bool,
    {
        if self.is_disposed() {
            return false;
        }
        let mut applied = false;
        self.state.send_if_modified(|s| {
            if generation.is_some_and(|g| g != s.generation) {
                return false;
            }
            applied = true;
            f(s)
        });
        applied
    }
}

/// Clears the in-flight flag if a sign-in future is dropped before it settles.
struct LoginAttempt<'a> {
    state: &'a watch::Sender<Session>,
    generation: u64,
    settled: bool,
}

impl Drop for LoginAttempt<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let generation = self.generation;
        self.state.send_if_modified(|s| {
            if s.generation == generation && s.authenticating {
                s.authenticating = false;
                true
            } else {
                false
            }
        });
    }
}
