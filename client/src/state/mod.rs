//! Client-side session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` holds the plain session data the route guard reads; `session`
//! owns it and exposes the login/logout/bootstrap actions.

pub mod auth;
pub mod session;
