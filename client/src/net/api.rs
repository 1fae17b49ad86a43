//! Configured REST client for the reservation backend.
//!
//! ARCHITECTURE
//! ============
//! Every request passes two interceptors:
//! - outbound: the persisted bearer token is attached when present, after
//!   the default headers and before caller headers, so caller headers win;
//! - inbound: a 401 notifies the registered unauthorized listeners and is
//!   then returned to the caller. Everything else passes through.
//!
//! The client knows nothing about navigation. The session store subscribes
//! via [`ApiClient::on_unauthorized`] and owns teardown + redirect.
//!
//! Endpoint wrappers live in sibling `api_*` modules as extra `impl` blocks.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::config::ApiConfig;
use super::error::ApiError;
use super::types::MessageResponse;
use crate::util::credentials::{self, CredentialStorage};

type UnauthorizedListener = Arc<dyn Fn() + Send + Sync>;

/// Per-request overrides.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    /// Extra headers; these replace defaults with the same name.
    pub headers: Vec<(String, String)>,
    /// Overrides the configured timeout.
    pub timeout: Option<Duration>,
    /// When false, a 401 is returned without notifying listeners. Used by
    /// credential exchanges, where 401 means "wrong password" rather than
    /// "session expired".
    pub notify_unauthorized: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { headers: Vec::new(), timeout: None, notify_unauthorized: true }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub(crate) fn credential_exchange() -> Self {
        Self { notify_unauthorized: false, ..Self::default() }
    }
}

/// Shared REST client. Cloning is cheap; clones share listeners and storage.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ApiConfig,
    storage: Arc<dyn CredentialStorage>,
    listeners: RwLock<Vec<UnauthorizedListener>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("config", &self.inner.config).finish_non_exhaustive()
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the underlying HTTP client cannot be built.
    pub fn new(config: ApiConfig, storage: Arc<dyn CredentialStorage>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Network(format!("http client build failed: {e}")))?;
        Ok(Self {
            inner: Arc::new(ClientInner { http, config, storage, listeners: RwLock::new(Vec::new()) }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Storage holding the persisted credential record.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn CredentialStorage> {
        &self.inner.storage
    }

    /// Register a listener invoked synchronously, in registration order,
    /// whenever a request receives HTTP 401.
    pub fn on_unauthorized<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.config.base_url, path)
    }

    /// Send a request through both interceptors.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] for transport failures and
    /// non-success statuses.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<Response, ApiError> {
        let token = credentials::load_token(self.inner.storage.as_ref());
        let headers = build_headers(token.as_deref(), &options.headers)?;
        let timeout = options.timeout.unwrap_or(self.inner.config.timeout);

        let mut builder = self
            .inner
            .http
            .request(method.clone(), self.url(path))
            .headers(headers)
            .timeout(timeout);
        if let Some(json) = body {
            builder = builder.json(json);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let error = ApiError::from(e);
                tracing::debug!(%method, %path, error = %error, "request failed before response");
                return Err(error);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = read_error_body(response).await;
        let error = ApiError::from_status(status.as_u16(), body);
        if error.is_auth_failure() && options.notify_unauthorized {
            tracing::warn!(%method, %path, "backend rejected session token");
            self.notify_unauthorized();
        } else {
            tracing::debug!(%method, %path, status = status.as_u16(), "request returned error status");
        }
        Err(error)
    }

    /// # Errors
    ///
    /// See [`request`](Self::request); also [`ApiError::Decode`] for unexpected bodies.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(Method::GET, path, None, RequestOptions::default()).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request); also [`ApiError::Decode`] for unexpected bodies.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.send_json(Method::POST, path, Some(&body), RequestOptions::default()).await
    }

    /// # Errors
    ///
    /// See [`request`](Self::request); also [`ApiError::Decode`] for unexpected bodies.
    pub async fn put_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = encode_body(body)?;
        self.send_json(Method::PUT, path, Some(&body), RequestOptions::default()).await
    }

    /// `DELETE` returning the acknowledgement body (`null` when empty).
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete_json(&self, path: &str) -> Result<Value, ApiError> {
        self.send_json(Method::DELETE, path, None, RequestOptions::default()).await
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.request(method, path, body, options).await?;
        let text = response.text().await.map_err(ApiError::from)?;
        decode_body(&text)
    }

    fn notify_unauthorized(&self) {
        let listeners: Vec<UnauthorizedListener> =
            self.inner.listeners.read().unwrap_or_else(PoisonError::into_inner).clone();
        for listener in listeners {
            listener();
        }
    }
}

// =============================================================================
// INTERCEPTOR HELPERS
// =============================================================================

/// Default headers, then the bearer token, then caller headers.
pub(crate) fn build_headers(token: Option<&str>, extra: &[(String, String)]) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ApiError::Url(format!("invalid bearer token: {e}")))?;
        headers.insert(AUTHORIZATION, value);
    }

    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::Url(format!("invalid header name {name:?}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| ApiError::Url(format!("invalid header value for {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn encode_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(format!("request body encode failed: {e}")))
}

/// Decode a success body; an empty body decodes as JSON `null`.
pub(crate) fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let trimmed = text.trim();
    let raw = if trimmed.is_empty() { "null" } else { trimmed };
    serde_json::from_str(raw).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Error bodies are kept as JSON when possible, otherwise as a string.
async fn read_error_body(response: Response) -> Value {
    let text = response.text().await.unwrap_or_default();
    parse_error_body(&text)
}

pub(crate) fn parse_error_body(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_owned()))
}

/// Accept either a bare array or `{ "<key>": [...] }`; `null` is an empty list.
pub(crate) fn extract_list<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>, ApiError> {
    let list = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(inner) => inner,
        },
        other => return Err(ApiError::Decode(format!("expected list of {key}, got {other}"))),
    };
    serde_json::from_value(list).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Acknowledgement bodies are `{"message": "..."}`; an empty body is an empty message.
pub(crate) fn into_ack(value: Value) -> Result<MessageResponse, ApiError> {
    match value {
        Value::Null => Ok(MessageResponse::default()),
        other => serde_json::from_value(other).map_err(|e| ApiError::Decode(e.to_string())),
    }
}
