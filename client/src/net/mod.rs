//! Networking modules for the reservation backend REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` is the configured client with its bearer/401 interceptors, the
//! `api_*` modules add typed endpoint wrappers on top of it, `config`
//! resolves the base URL and timeout, `error` classifies failures, and
//! `types` defines the wire schema.

pub mod api;
pub mod api_auth;
pub mod api_reservations;
pub mod api_servers;
pub mod api_users;
pub mod config;
pub mod error;
pub mod types;
