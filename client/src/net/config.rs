//! API client configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_DEV_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Build environment selecting how the base URL is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEnv {
    Development,
    Production,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown SCHEDULER_ENV: {0} (expected 'development' or 'production')")]
    UnknownEnv(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL prefixed to every request path. Empty means same-origin.
    pub base_url: String,
    /// Default per-request timeout.
    pub timeout: Duration,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS) }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build typed API config from environment variables.
    ///
    /// Optional:
    /// - `SCHEDULER_ENV`: `development` (default) or `production`
    /// - `SCHEDULER_API_URL`: base URL outside production, default `http://localhost:8080`
    /// - `SCHEDULER_TIMEOUT_MS`: default 10000
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnv`] when `SCHEDULER_ENV` holds an unrecognized value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = parse_build_env(std::env::var("SCHEDULER_ENV").ok().as_deref())?;
        let override_url = std::env::var("SCHEDULER_API_URL").ok();
        let base_url = resolve_base_url(env, override_url.as_deref());
        let timeout_ms = env_parse_u64("SCHEDULER_TIMEOUT_MS", DEFAULT_TIMEOUT_MS);
        Ok(Self::new(base_url).with_timeout(Duration::from_millis(timeout_ms)))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEV_API_URL)
    }
}

/// Same-origin (empty) in production, otherwise the override or the local dev origin.
#[must_use]
pub fn resolve_base_url(env: BuildEnv, override_url: Option<&str>) -> String {
    match env {
        BuildEnv::Production => String::new(),
        BuildEnv::Development => override_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_DEV_API_URL)
            .trim_end_matches('/')
            .to_owned(),
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_build_env(raw: Option<&str>) -> Result<BuildEnv, ConfigError> {
    match raw.map(str::trim).unwrap_or("development") {
        "" | "development" | "dev" | "test" => Ok(BuildEnv::Development),
        "production" | "prod" => Ok(BuildEnv::Production),
        other => Err(ConfigError::UnknownEnv(other.to_owned())),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
