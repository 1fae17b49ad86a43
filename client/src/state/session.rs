//! Session store: the single owner of the client's authentication state.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every front end builds one [`SessionStore`] around the shared
//! [`ApiClient`] and a [`Navigator`]. Route guards read it; commands and
//! pages call its actions.
//!
//! DESIGN
//! ======
//! - Memory and the persisted credential record move together: every action
//!   that changes one changes the other.
//! - The store subscribes to the client's unauthorized signal through a weak
//!   reference. On 401 it clears the persisted record first, then resets
//!   memory, then navigates to `/login`, so the login route never sees a
//!   stale token.
//! - Storage failures are logged and do not abort an action; the in-memory
//!   state stays authoritative for the process.
//! - The state lock is never held across an `.await`.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::auth::{AuthState, SessionPhase};
use crate::net::api::ApiClient;
use crate::net::error::ApiError;
use crate::net::types::{AuthResponse, Credentials, MessageResponse, PasswordChange, Registration, User};
use crate::routes::table::Route;
use crate::util::credentials::{self, CredentialStorage};
use crate::util::navigation::Navigator;

/// Process-wide session handle. Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
    state: RwLock<AuthState>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read();
        f.debug_struct("SessionStore")
            .field("phase", &state.phase)
            .field("user", &state.user)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Build an uninitialized store and subscribe it to the client's
    /// unauthorized signal.
    #[must_use]
    pub fn new(api: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        let inner = Arc::new(SessionInner { api, navigator, state: RwLock::new(AuthState::default()) });
        let weak = Arc::downgrade(&inner);
        inner.api.on_unauthorized(move || {
            if let Some(inner) = weak.upgrade() {
                inner.expire();
            }
        });
        Self { inner }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns the backend or transport error; any existing session is left
    /// as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        match self.inner.api.login(credentials).await {
            Ok(auth) => self.establish(auth),
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "login failed");
                Err(e)
            }
        }
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns the backend or transport error; any existing session is left
    /// as it was.
    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        match self.inner.api.register(registration).await {
            Ok(auth) => self.establish(auth),
            Err(e) => {
                tracing::warn!(username = %registration.username, error = %e, "registration failed");
                Err(e)
            }
        }
    }

    /// Drop the session locally. Idempotent; never contacts the backend.
    pub fn logout(&self) {
        let was_authenticated = self.is_authenticated();
        self.inner.clear();
        if was_authenticated {
            tracing::info!("logged out");
        }
    }

    /// Refresh the current user's profile.
    ///
    /// # Errors
    ///
    /// Returns the backend or transport error. The session is not cleared
    /// here; a 401 is torn down by the unauthorized listener.
    pub async fn fetch_user(&self) -> Result<User, ApiError> {
        let user = match self.inner.api.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::debug!(error = %e, "fetch user failed");
                return Err(e);
            }
        };

        let token = {
            let mut state = self.inner.write();
            if state.is_authenticated() {
                state.user = Some(user.clone());
                state.phase = SessionPhase::Authenticated;
            }
            state.token.clone()
        };
        // A logout that raced the fetch wins; don't resurrect the record.
        if !token.is_empty() {
            self.inner.persist(&token, &user);
        }
        Ok(user)
    }

    /// Bootstrap from the persisted credential record.
    ///
    /// # Errors
    ///
    /// Transport and server failures are returned after the session has been
    /// reset. An auth failure resolves to `Ok(Unauthenticated)`.
    pub async fn initialize(&self) -> Result<SessionPhase, ApiError> {
        let storage = self.inner.storage();
        let Some(token) = credentials::load_token(storage.as_ref()) else {
            self.inner.write().reset();
            tracing::debug!("no persisted token");
            return Ok(SessionPhase::Unauthenticated);
        };

        let persisted_user = credentials::load_user(storage.as_ref());
        {
            let mut state = self.inner.write();
            state.token = token;
            state.user = persisted_user;
        }

        match self.fetch_user().await {
            Ok(user) => {
                tracing::info!(username = %user.username, "session restored");
                Ok(SessionPhase::Authenticated)
            }
            Err(e) => {
                self.inner.clear();
                if e.is_auth_failure() {
                    tracing::info!("persisted token rejected; session cleared");
                    Ok(SessionPhase::Unauthenticated)
                } else {
                    tracing::warn!(error = %e, "session restore failed; session cleared");
                    Err(e)
                }
            }
        }
    }

    /// # Errors
    ///
    /// A wrong current password comes back as a validation error with the
    /// backend body intact. The session is unchanged either way.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<MessageResponse, ApiError> {
        let change = PasswordChange { current_password: current.to_owned(), new_password: new.to_owned() };
        let result = self.inner.api.change_password(&change).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "password change failed");
        }
        result
    }

    // =========================================================================
    // GETTERS
    // =========================================================================

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_authenticated()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.inner.read().is_root()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.read().user.clone()
    }

    /// Alias of [`user`](Self::user).
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.user()
    }

    #[must_use]
    pub fn token(&self) -> String {
        self.inner.read().token.clone()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.read().phase
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.inner.read().clone()
    }

    fn establish(&self, auth: AuthResponse) -> Result<User, ApiError> {
        if auth.token.is_empty() {
            return Err(ApiError::Decode("auth response carried an empty token".to_owned()));
        }
        self.inner.persist(&auth.token, &auth.user);
        tracing::info!(username = %auth.user.username, role = %auth.user.role, "session established");
        let user = auth.user.clone();
        *self.inner.write() = AuthState::authenticated(auth.token, auth.user);
        Ok(user)
    }
}

impl SessionInner {
    fn read(&self) -> RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn storage(&self) -> Arc<dyn CredentialStorage> {
        self.api.storage().clone()
    }

    fn persist(&self, token: &str, user: &User) {
        if let Err(e) = credentials::save_credentials(self.api.storage().as_ref(), token, user) {
            tracing::warn!(error = %e, "failed to persist credentials");
        }
    }

    fn clear(&self) {
        if let Err(e) = credentials::clear_credentials(self.api.storage().as_ref()) {
            tracing::warn!(error = %e, "failed to clear persisted credentials");
        }
        self.write().reset();
    }

    /// Unauthorized-signal handler: clear storage, reset memory, go to login.
    fn expire(&self) {
        tracing::info!("session expired; redirecting to login");
        self.clear();
        self.navigator.navigate(Route::Login.path());
    }
}
