//! Static route table and per-route requirements.

#[cfg(test)]
#[path = "table_test.rs"]
mod table_test;

/// Requirement construction errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("a route cannot be both guest-only and require authentication")]
    GuestWithAuth,
}

/// Access flags attached to a route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    requires_auth: bool,
    requires_root: bool,
    guest: bool,
}

impl RouteRequirement {
    pub const NONE: Self = Self { requires_auth: false, requires_root: false, guest: false };
    pub const AUTH: Self = Self { requires_auth: true, requires_root: false, guest: false };
    pub const ROOT: Self = Self { requires_auth: true, requires_root: true, guest: false };
    pub const GUEST: Self = Self { requires_auth: false, requires_root: false, guest: true };

    /// Root implies auth.
    ///
    /// # Errors
    ///
    /// [`RouteError::GuestWithAuth`] when `guest` is combined with either
    /// auth flag.
    pub fn new(requires_auth: bool, requires_root: bool, guest: bool) -> Result<Self, RouteError> {
        let requires_auth = requires_auth || requires_root;
        if guest && requires_auth {
            return Err(RouteError::GuestWithAuth);
        }
        Ok(Self { requires_auth, requires_root, guest })
    }

    #[must_use]
    pub fn requires_auth(self) -> bool {
        self.requires_auth
    }

    #[must_use]
    pub fn requires_root(self) -> bool {
        self.requires_root
    }

    #[must_use]
    pub fn guest(self) -> bool {
        self.guest
    }
}

/// Application routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Servers,
    Reservations,
    Calendar,
    Users,
}

impl Route {
    pub const ALL: [Self; 7] =
        [Self::Home, Self::Login, Self::Register, Self::Servers, Self::Reservations, Self::Calendar, Self::Users];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Servers => "/servers",
            Self::Reservations => "/reservations",
            Self::Calendar => "/calendar",
            Self::Users => "/users",
        }
    }

    #[must_use]
    pub fn requirement(self) -> RouteRequirement {
        match self {
            Self::Home | Self::Servers | Self::Reservations | Self::Calendar => RouteRequirement::AUTH,
            Self::Login | Self::Register => RouteRequirement::GUEST,
            Self::Users => RouteRequirement::ROOT,
        }
    }

    /// Resolve a path, ignoring any query string and a trailing slash.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}
