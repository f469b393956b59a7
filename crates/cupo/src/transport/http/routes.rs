//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;

use crate::admission::{AdmissionController, CreateReservation};
use crate::error::AdmissionError;

#[derive(Debug, Deserialize)]
pub struct CreateReservationBody {
    pub experience_id: String,
    pub user_id: String,
    pub date: String,
    #[serde(default = "default_party_size")]
    pub party_size: u32,
    #[serde(default)]
    pub notes: String,
    pub idempotency_key: Option<String>,
}

// A booking without an explicit size is for one seat.
fn default_party_size() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    user_id: Option<String>,
}

fn error_response(err: &AdmissionError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        AdmissionError::Validation(_) => StatusCode::BAD_REQUEST,
        AdmissionError::CapacityRejected { .. } => StatusCode::CONFLICT,
        AdmissionError::NotFound(_) => StatusCode::NOT_FOUND,
        AdmissionError::Unavailable(_) | AdmissionError::Inconsistency(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    let mut body = serde_json::json!({ "error": err.to_string() });
    if let AdmissionError::CapacityRejected { remaining } = err {
        body["remaining"] = serde_json::json!(remaining);
    }
    if err.is_retryable() {
        body["retryable"] = serde_json::json!(true);
    }
    (status, Json(body))
}

async fn create_reservation(
    State(controller): State<Arc<AdmissionController>>,
    body: Result<Json<CreateReservationBody>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!("invalid request body: {rejection}")
                })),
            );
        }
    };

    let request = CreateReservation {
        experience_id: body.experience_id,
        user_id: body.user_id,
        date: body.date,
        party_size: body.party_size,
        notes: body.notes,
        idempotency_key: body.idempotency_key,
    };
    match controller.create_reservation(request).await {
        Ok(reservation) => (StatusCode::CREATED, Json(serde_json::json!(reservation))),
        Err(err) => error_response(&err),
    }
}

async fn get_reservation(
    State(controller): State<Arc<AdmissionController>>,
    Path(reservation_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match controller.get_reservation(&reservation_id).await {
        Ok(reservation) => (StatusCode::OK, Json(serde_json::json!(reservation))),
        Err(err) => error_response(&err),
    }
}

async fn mark_attended(
    State(controller): State<Arc<AdmissionController>>,
    Path(reservation_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match controller.mark_attended(&reservation_id).await {
        Ok(reservation) => (StatusCode::OK, Json(serde_json::json!(reservation))),
        Err(err) => error_response(&err),
    }
}

async fn cancel_reservation(
    State(controller): State<Arc<AdmissionController>>,
    Path(reservation_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match controller.cancel_reservation(&reservation_id).await {
        Ok(reservation) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": reservation.id,
                "released_seats": reservation.party_size
            })),
        ),
        Err(err) => error_response(&err),
    }
}

async fn list_reservations(
    State(controller): State<Arc<AdmissionController>>,
    Query(query): Query<ListQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(user_id) = query.user_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "user_id query parameter is required" })),
        );
    };
    match controller.list_reservations(&user_id).await {
        Ok(reservations) => (StatusCode::OK, Json(serde_json::json!(reservations))),
        Err(err) => error_response(&err),
    }
}

async fn health(
    State(controller): State<Arc<AdmissionController>>,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!(controller.health())),
    )
}

pub fn routes(controller: Arc<AdmissionController>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/reservations", post(create_reservation).get(list_reservations))
        .route(
            "/reservations/{id}",
            get(get_reservation).delete(cancel_reservation),
        )
        .route("/reservations/{id}/attend", post(mark_attended))
        .with_state(controller)
}
