//! Reservation endpoints.
//!
//! A bare `DELETE` cancels (the record stays with status `cancelled`);
//! `DELETE /:id/delete` removes it permanently and is root only.

#[cfg(test)]
#[path = "api_reservations_test.rs"]
mod api_reservations_test;

use serde_json::Value;

use super::api::{ApiClient, extract_list, into_ack};
use super::error::ApiError;
use super::types::{MessageResponse, Reservation, ReservationInput};

pub(crate) const RESERVATIONS_PATH: &str = "/api/reservations";

pub(crate) fn reservation_path(id: i64) -> String {
    format!("{RESERVATIONS_PATH}/{id}")
}

impl ApiClient {
    /// Reservations visible to the caller. The backend may answer `null`
    /// when there are none.
    ///
    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, ApiError> {
        let value: Value = self.get_json(RESERVATIONS_PATH).await?;
        extract_list(value, "reservations")
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn get_reservation(&self, id: i64) -> Result<Reservation, ApiError> {
        self.get_json(&reservation_path(id)).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors; overlapping bookings come back
    /// as a non-success status from the backend.
    pub async fn create_reservation(&self, input: &ReservationInput) -> Result<Reservation, ApiError> {
        self.post_json(RESERVATIONS_PATH, input).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn update_reservation(&self, id: i64, input: &ReservationInput) -> Result<Reservation, ApiError> {
        self.put_json(&reservation_path(id), input).await
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn cancel_reservation(&self, id: i64) -> Result<MessageResponse, ApiError> {
        into_ack(self.delete_json(&reservation_path(id)).await?)
    }

    /// # Errors
    ///
    /// Propagates request and decode errors.
    pub async fn delete_reservation(&self, id: i64) -> Result<MessageResponse, ApiError> {
        into_ack(self.delete_json(&format!("{}/delete", reservation_path(id))).await?)
    }
}
