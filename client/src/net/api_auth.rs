//! Authentication endpoints.

#[cfg(test)]
#[path = "api_auth_test.rs"]
mod api_auth_test;

use reqwest::Method;

use super::api::{ApiClient, RequestOptions};
use super::error::ApiError;
use super::types::{AuthResponse, Credentials, MessageResponse, PasswordChange, Registration, User};

pub(crate) const LOGIN_PATH: &str = "/api/auth/login";
pub(crate) const REGISTER_PATH: &str = "/api/auth/register";
pub(crate) const CURRENT_USER_PATH: &str = "/api/auth/user";
pub(crate) const CHANGE_PASSWORD_PATH: &str = "/api/auth/change-password";

impl ApiClient {
    /// Exchange credentials for a token. A 401 here is returned as
    /// [`ApiError::Unauthorized`] without notifying unauthorized listeners.
    ///
    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let body = serde_json::to_value(credentials).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.send_json(Method::POST, LOGIN_PATH, Some(&body), RequestOptions::credential_exchange())
            .await
    }

    /// Create an account and receive a token for it.
    ///
    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        let body = serde_json::to_value(registration).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.send_json(Method::POST, REGISTER_PATH, Some(&body), RequestOptions::credential_exchange())
            .await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get_json(CURRENT_USER_PATH).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<MessageResponse, ApiError> {
        self.post_json(CHANGE_PASSWORD_PATH, change).await
    }
}
