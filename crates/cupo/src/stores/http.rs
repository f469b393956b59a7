//! HTTP/JSON clients for the capacity and reservation stores.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::experience::Experience;
use crate::reservation::{NewReservation, Reservation};
use crate::version::CUPO_VERSION;

use super::{CapacityAdjust, CapacityStore, ReservationStore, StoreError};

/// Build the shared outbound client: user agent and a bounded per-request
/// timeout, so a hung store cannot wedge an admission request.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Ok(value) = reqwest::header::HeaderValue::from_str(&format!("cupo/{}", CUPO_VERSION)) {
        headers.insert(reqwest::header::USER_AGENT, value);
    }
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::Rejected(format!("malformed store response: {e}")))
}

fn status_error(store: &str, status: StatusCode) -> StoreError {
    if status.is_server_error() {
        StoreError::Unavailable(format!("{store} returned {status}"))
    } else {
        StoreError::Rejected(format!("{store} returned {status}"))
    }
}

#[derive(Debug, Deserialize)]
struct RemainingDoc {
    remaining: u32,
}

/// Client for the capacity store (the experiences service).
pub struct HttpCapacityStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCapacityStore {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl CapacityStore for HttpCapacityStore {
    async fn experience(&self, experience_id: &str) -> Result<Experience, StoreError> {
        let url = format!("{}/experiences/{}", self.base_url, experience_id);
        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => read_json(response).await,
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status => Err(status_error("capacity store", status)),
        }
    }

    async fn adjust_capacity(
        &self,
        experience_id: &str,
        adjust: &CapacityAdjust,
    ) -> Result<u32, StoreError> {
        let url = format!("{}/experiences/{}/capacity", self.base_url, experience_id);
        let response = self
            .client
            .patch(&url)
            .json(adjust)
            .send()
            .await
            .map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => {
                let doc: RemainingDoc = read_json(response).await?;
                Ok(doc.remaining)
            }
            StatusCode::CONFLICT => {
                // Precondition failed; the body carries the remaining hint.
                let remaining = response
                    .json::<RemainingDoc>()
                    .await
                    .map(|doc| doc.remaining)
                    .unwrap_or(0);
                Err(StoreError::PreconditionFailed { remaining })
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status => Err(status_error("capacity store", status)),
        }
    }
}

/// Client for the reservation store (the reservations service).
pub struct HttpReservationStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpReservationStore {
    pub fn new(base_url: String, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn reservation_url(&self, reservation_id: &str) -> String {
        format!("{}/reservations/{}", self.base_url, reservation_id)
    }
}

#[async_trait]
impl ReservationStore for HttpReservationStore {
    async fn create(&self, reservation: &NewReservation) -> Result<Reservation, StoreError> {
        let url = format!("{}/reservations", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(reservation)
            .send()
            .await
            .map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => read_json(response).await,
            status => Err(status_error("reservation store", status)),
        }
    }

    async fn get(&self, reservation_id: &str) -> Result<Reservation, StoreError> {
        let response = self
            .client
            .get(self.reservation_url(reservation_id))
            .send()
            .await
            .map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => read_json(response).await,
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status => Err(status_error("reservation store", status)),
        }
    }

    async fn set_attended(&self, reservation_id: &str) -> Result<Reservation, StoreError> {
        let response = self
            .client
            .patch(self.reservation_url(reservation_id))
            .json(&serde_json::json!({ "attended": true }))
            .send()
            .await
            .map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => read_json(response).await,
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status => Err(status_error("reservation store", status)),
        }
    }

    async fn delete(&self, reservation_id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.reservation_url(reservation_id))
            .send()
            .await
            .map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status => Err(status_error("reservation store", status)),
        }
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Reservation>, StoreError> {
        let url = format!("{}/reservations", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id)])
            .send()
            .await
            .map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => read_json(response).await,
            status => Err(status_error("reservation store", status)),
        }
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Reservation>, StoreError> {
        let url = format!("{}/reservations", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id), ("idempotency_key", key)])
            .send()
            .await
            .map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => {
                let matches: Vec<Reservation> = read_json(response).await?;
                Ok(matches.into_iter().next())
            }
            status => Err(status_error("reservation store", status)),
        }
    }
}
