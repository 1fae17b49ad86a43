//! Navigation guard.
//!
//! DESIGN
//! ======
//! [`guard`] is a pure decision over a requirement and a session snapshot:
//! auth is checked before root, and guest routes bounce signed-in users home.
//! Redirect targets cannot loop: an unauthenticated redirect lands on a
//! guest route and an authenticated one lands on `/`.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use super::table::{Route, RouteRequirement};
use crate::state::auth::AuthState;
use crate::state::session::SessionStore;
use crate::util::navigation::Navigator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Route),
}

#[must_use]
pub fn guard(requirement: RouteRequirement, state: &AuthState) -> GuardDecision {
    if requirement.requires_auth() {
        if !state.is_authenticated() {
            return GuardDecision::Redirect(Route::Login);
        }
        if requirement.requires_root() && !state.is_root() {
            return GuardDecision::Redirect(Route::Home);
        }
        return GuardDecision::Proceed;
    }
    if requirement.guest() && state.is_authenticated() {
        return GuardDecision::Redirect(Route::Home);
    }
    GuardDecision::Proceed
}

/// Guard an arbitrary path. Unknown paths carry no requirements.
#[must_use]
pub fn guard_path(path: &str, state: &AuthState) -> GuardDecision {
    let requirement = Route::from_path(path).map_or(RouteRequirement::NONE, Route::requirement);
    guard(requirement, state)
}

/// Evaluate the guard for `route`, move the navigator to where the user
/// ends up, and return the decision.
pub fn navigate(route: Route, session: &SessionStore, navigator: &dyn Navigator) -> GuardDecision {
    let decision = guard(route.requirement(), &session.snapshot());
    match decision {
        GuardDecision::Proceed => navigator.navigate(route.path()),
        GuardDecision::Redirect(target) => {
            tracing::debug!(attempted = %route, redirect = %target, "route guard redirect");
            navigator.navigate(target.path());
        }
    }
    decision
}
