//! Error taxonomy for REST calls against the reservation backend.
//!
//! DESIGN
//! ======
//! Status codes are classified once, at the response boundary, so callers
//! match on intent (`Unauthorized`, `Forbidden`, `Validation`) instead of raw
//! numbers. Error bodies are kept as `serde_json::Value` so structured
//! validation payloads reach the caller untouched.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

/// Errors produced by [`ApiClient`](super::api::ApiClient) requests.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend rejected the bearer token (HTTP 401).
    #[error("unauthorized: {}", describe_body(.body))]
    Unauthorized { body: Value },

    /// The caller is authenticated but not allowed to do this (HTTP 403).
    #[error("forbidden: {}", describe_body(.body))]
    Forbidden { body: Value },

    /// The backend rejected the request payload (HTTP 400 / 422).
    #[error("validation failed (status {status}): {}", describe_body(.body))]
    Validation { status: u16, body: Value },

    /// Any other non-success status.
    #[error("request failed with status {status}: {}", describe_body(.body))]
    Status { status: u16, body: Value },

    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure (refused, reset, DNS, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// A success response whose body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The request URL could not be built from the base URL and path.
    #[error("invalid request url: {0}")]
    Url(String),
}

impl ApiError {
    /// Classify a non-success HTTP status and its decoded body.
    #[must_use]
    pub fn from_status(status: u16, body: Value) -> Self {
        match status {
            401 => Self::Unauthorized { body },
            403 => Self::Forbidden { body },
            400 | 422 => Self::Validation { status, body },
            _ => Self::Status { status, body },
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::Validation { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Timeout | Self::Network(_) | Self::Decode(_) | Self::Url(_) => None,
        }
    }

    /// Response body carried by this error, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Unauthorized { body }
            | Self::Forbidden { body }
            | Self::Validation { body, .. }
            | Self::Status { body, .. } => Some(body),
            Self::Timeout | Self::Network(_) | Self::Decode(_) | Self::Url(_) => None,
        }
    }

    /// The backend's `{"error": "..."}` message, when present.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.body().and_then(|body| body.get("error")).and_then(Value::as_str)
    }

    /// True for 401 responses: the session is no longer valid.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// True for failures that never reached a backend response.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_builder() {
            Self::Url(error.to_string())
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

fn describe_body(body: &Value) -> String {
    match body {
        Value::Null => "no response body".to_owned(),
        Value::String(text) => text.clone(),
        other => other
            .get("error")
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), ToOwned::to_owned),
    }
}
