//! # scheduler-client
//!
//! Client core for the server-reservation admin tool: the configured REST
//! client with its bearer and 401 interceptors, the session store that owns
//! authentication state, and the route guard that admits or redirects
//! navigation. Domain endpoints (servers, reservations, users) ride on the
//! same client so they share auth handling.

pub mod net;
pub mod routes;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use net::api::{ApiClient, RequestOptions};
pub use net::config::ApiConfig;
pub use net::error::ApiError;
pub use routes::guard::{GuardDecision, guard, navigate};
pub use routes::table::{Route, RouteRequirement};
pub use state::auth::{AuthState, SessionPhase};
pub use state::session::SessionStore;
