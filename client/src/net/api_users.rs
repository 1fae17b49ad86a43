//! Account administration endpoints (root only).

#[cfg(test)]
#[path = "api_users_test.rs"]
mod api_users_test;

use serde_json::Value;

use super::api::{ApiClient, extract_list, into_ack};
use super::error::ApiError;
use super::types::{MessageResponse, NewUser, User, UserUpdate};

pub(crate) const USERS_PATH: &str = "/api/users";

pub(crate) fn user_path(id: i64) -> String {
    format!("{USERS_PATH}/{id}")
}

impl ApiClient {
    /// # Errors
    ///
    /// Propagates request and decode errors; non-root callers get `Forbidden`.
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let value: Value = self.get_json(USERS_PATH).await?;
        extract_list(value, "users")
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn get_user(&self, id: i64) -> Result<User, ApiError> {
        self.get_json(&user_path(id)).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.post_json(USERS_PATH, user).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<User, ApiError> {
        self.put_json(&user_path(id), update).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn delete_user(&self, id: i64) -> Result<MessageResponse, ApiError> {
        into_ack(self.delete_json(&user_path(id)).await?)
    }
}
