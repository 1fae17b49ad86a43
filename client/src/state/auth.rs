//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Owned by [`SessionStore`](super::session::SessionStore) and read by the
//! route guard. Plain data: every mutation goes through store actions.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::net::types::User;

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// Built but not yet bootstrapped from storage.
    #[default]
    Uninitialized,
    Authenticated,
    Unauthenticated,
}

/// Authentication state tracking the current token and user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Bearer token; empty means unauthenticated.
    pub token: String,
    pub user: Option<User>,
    pub phase: SessionPhase,
}

impl AuthState {
    #[must_use]
    pub fn authenticated(token: impl Into<String>, user: User) -> Self {
        Self { token: token.into(), user: Some(user), phase: SessionPhase::Authenticated }
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self { phase: SessionPhase::Unauthenticated, ..Self::default() }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// Root only counts with a token; a leftover profile alone grants nothing.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.is_authenticated() && self.user.as_ref().is_some_and(User::is_root)
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::unauthenticated();
    }
}
