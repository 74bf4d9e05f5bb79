//! The auth session manager: owns the client's one [`Session`].
//!
//! Everything that changes who is signed in goes through here: login,
//! registration, logout, confirmation of a rehydrated token, and the
//! forced logout that follows an `Unauthorized` answer from the server.
//!
//! # Concurrency note
//!
//! The current session lives in a `tokio::sync::watch` channel as an
//! `Arc<Session>`. Readers clone the `Arc` and never block writers for
//! longer than that clone. Writers take a small mutex so the credential
//! store and the published session always change together; the mutex is
//! never held across an `.await`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    AuthBackend, AuthGrant, CredentialStore, Identity, Session, SessionConfig,
    SessionError, TokenSource,
};

/// Owns the current session and its persisted token.
///
/// ## Lifecycle
///
/// ```text
///              login/register
/// Anonymous ─────────────────────→ Signed in (confirmed)
///     ↑                                  │
///     └──── logout / invalidate ─────────┘
///
/// store has token at startup
///     ──→ Signed in (provisional) ──confirm ok──→ Signed in (confirmed)
///                 │
///                 └──confirm Unauthorized──→ Anonymous
/// ```
pub struct AuthSessionManager<B: AuthBackend> {
    backend: B,
    store: Box<dyn CredentialStore>,
    state: watch::Sender<Arc<Session>>,
    /// Serializes "write the store, then publish" pairs.
    update: Mutex<()>,
    config: SessionConfig,
}

impl<B: AuthBackend> AuthSessionManager<B> {
    /// Creates a manager, rehydrating from `store`.
    ///
    /// A stored token yields a provisional session right away. Call
    /// [`spawn_confirmation`](Self::spawn_confirmation) (or
    /// [`confirm`](Self::confirm)) to check it with the server.
    pub fn new(
        backend: B,
        store: impl CredentialStore,
        config: SessionConfig,
    ) -> Self {
        let initial = match store.get() {
            Some(token) => {
                tracing::info!("rehydrated stored session, awaiting confirmation");
                Session::rehydrated(token)
            }
            None => Session::anonymous(),
        };
        let (state, _) = watch::channel(Arc::new(initial));

        Self {
            backend,
            store: Box::new(store),
            state,
            update: Mutex::new(()),
            config: config.validated(),
        }
    }

    /// The current session. Never blocks, never touches the network.
    pub fn current_session(&self) -> Arc<Session> {
        self.state.borrow().clone()
    }

    /// Observes every session transition.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Session>> {
        self.state.subscribe()
    }

    /// Signs in.
    ///
    /// On success the credential store and the current session are both
    /// updated before this returns.
    ///
    /// # Errors
    /// `InvalidCredentials` when the server rejects the pair, otherwise
    /// whatever the backend classified (`NetworkUnavailable`, ...).
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Arc<Session>, SessionError> {
        let grant = self
            .backend
            .login(username, password)
            .await
            .map_err(|e| match e {
                SessionError::Unauthorized => SessionError::InvalidCredentials,
                other => other,
            })?;
        Ok(self.adopt(grant))
    }

    /// Creates an account and signs in.
    ///
    /// The username must be non-empty and the password at least
    /// `min_password_len` characters; both are checked before any network
    /// call.
    ///
    /// # Errors
    /// `ValidationFailed`, `UsernameTaken`, or a network classification.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Arc<Session>, SessionError> {
        if username.trim().is_empty() {
            return Err(SessionError::ValidationFailed(
                "username must not be empty".into(),
            ));
        }
        if password.chars().count() < self.config.min_password_len {
            return Err(SessionError::ValidationFailed(format!(
                "password must be at least {} characters",
                self.config.min_password_len
            )));
        }

        let grant = self.backend.register(username, password).await?;
        Ok(self.adopt(grant))
    }

    /// Signs out. Idempotent; never fails.
    pub fn logout(&self) {
        let _guard = self.update.lock();
        self.store.clear();
        let changed = self.state.send_if_modified(|current| {
            if current.is_authenticated() {
                *current = Arc::new(Session::anonymous());
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!("signed out");
        }
    }

    /// Forced logout for a token the server refused.
    ///
    /// Only signs out if `token` is still the current token, so a late
    /// `Unauthorized` for an old token can't undo a newer login. Returns
    /// `true` if the session was cleared.
    pub fn invalidate(&self, token: &str) -> bool {
        let _guard = self.update.lock();
        if self.state.borrow().token() != Some(token) {
            tracing::debug!("ignoring unauthorized report for a stale token");
            return false;
        }
        self.store.clear();
        self.state.send_replace(Arc::new(Session::anonymous()));
        tracing::warn!("session rejected by server, signed out");
        true
    }

    /// Confirms the current token with the server (`whoami`).
    ///
    /// - Success replaces a provisional identity with the server's record,
    ///   but only if the token is still current.
    /// - `Unauthorized` signs out through [`invalidate`](Self::invalidate).
    /// - Any other failure leaves the session as it is.
    ///
    /// Returns the session as it stands afterwards. An anonymous session
    /// is returned unchanged without a network call.
    pub async fn confirm(&self) -> Result<Arc<Session>, SessionError> {
        let session = self.current_session();
        let Some(token) = session.token().map(str::to_owned) else {
            return Ok(session);
        };

        match self.backend.whoami(&token).await {
            Ok(user) => {
                let _guard = self.update.lock();
                self.state.send_if_modified(|current| {
                    if current.token() == Some(token.as_str()) {
                        *current = Arc::new(Session::authenticated(
                            token.as_str(),
                            Identity::confirmed(user),
                        ));
                        true
                    } else {
                        false
                    }
                });
                Ok(self.current_session())
            }
            Err(SessionError::Unauthorized) => {
                self.invalidate(&token);
                Err(SessionError::Unauthorized)
            }
            Err(e) => {
                tracing::warn!(error = %e, "session confirmation failed, keeping provisional session");
                Err(e)
            }
        }
    }

    fn adopt(&self, grant: AuthGrant) -> Arc<Session> {
        let user_id = grant.user.id;
        let session = Arc::new(Session::authenticated(
            grant.token.as_str(),
            Identity::confirmed(grant.user),
        ));

        let _guard = self.update.lock();
        self.store.set(&grant.token);
        self.state.send_replace(Arc::clone(&session));
        tracing::info!(%user_id, "signed in");
        session
    }
}

impl<B: AuthBackend> AuthSessionManager<B> {
    /// Runs [`confirm`](Self::confirm) on a background task if the current
    /// session is provisional. Returns `None` when there is nothing to
    /// confirm.
    pub fn spawn_confirmation(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.current_session().is_provisional() {
            return None;
        }
        let manager = Arc::clone(self);
        Some(tokio::spawn(async move {
            match manager.confirm().await {
                Ok(session) => tracing::debug!(
                    confirmed = !session.is_provisional(),
                    "session confirmation finished"
                ),
                Err(e) => tracing::debug!(error = %e, "session confirmation failed"),
            }
        }))
    }
}

impl<B: AuthBackend> TokenSource for AuthSessionManager<B> {
    fn bearer(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_owned)
    }

    fn on_unauthorized(&self, token: &str) {
        self.invalidate(token);
    }
}

// =========================================================================
// Tests
// =========================================================================
