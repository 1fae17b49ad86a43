//! Application routes and the guard that admits or redirects navigation.

pub mod guard;
pub mod table;
