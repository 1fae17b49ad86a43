//! Navigation seam between session logic and whatever renders pages.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session store forces a navigation to `/login` when the backend
//! rejects the token, and the route guard moves the user to its decided
//! destination. Both only talk to [`Navigator`]; [`Location`] is the
//! in-process implementation that remembers where the app currently is.

#[cfg(test)]
#[path = "navigation_test.rs"]
mod navigation_test;

use std::sync::{Mutex, PoisonError};

/// Receives navigation requests.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Current app location plus the trail of every navigation.
#[derive(Debug)]
pub struct Location {
    inner: Mutex<LocationInner>,
}

#[derive(Debug)]
struct LocationInner {
    current: String,
    history: Vec<String>,
}

impl Location {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self { inner: Mutex::new(LocationInner { current: initial.into(), history: Vec::new() }) }
    }

    #[must_use]
    pub fn current(&self) -> String {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).current.clone()
    }

    /// Every path navigated to, oldest first. The initial location is not included.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).history.clone()
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for Location {
    fn navigate(&self, path: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(from = %inner.current, to = %path, "navigate");
        inner.current = path.to_owned();
        inner.history.push(path.to_owned());
    }
}
