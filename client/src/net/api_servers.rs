//! Server inventory endpoints.

#[cfg(test)]
#[path = "api_servers_test.rs"]
mod api_servers_test;

use serde_json::Value;

use super::api::{ApiClient, extract_list, into_ack};
use super::error::ApiError;
use super::types::{MessageResponse, Server, ServerInput};

pub(crate) const SERVERS_PATH: &str = "/api/servers";

pub(crate) fn server_path(id: i64) -> String {
    format!("{SERVERS_PATH}/{id}")
}

impl ApiClient {
    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn list_servers(&self) -> Result<Vec<Server>, ApiError> {
        let value: Value = self.get_json(SERVERS_PATH).await?;
        extract_list(value, "servers")
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn get_server(&self, id: i64) -> Result<Server, ApiError> {
        self.get_json(&server_path(id)).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn create_server(&self, input: &ServerInput) -> Result<Server, ApiError> {
        self.post_json(SERVERS_PATH, input).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn update_server(&self, id: i64, input: &ServerInput) -> Result<Server, ApiError> {
        self.put_json(&server_path(id), input).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn delete_server(&self, id: i64) -> Result<MessageResponse, ApiError> {
        into_ack(self.delete_json(&server_path(id)).await?)
    }
}
