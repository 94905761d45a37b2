use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use utoipa::OpenApi;

use super::error::OrderError;
use super::{ApiDoc, AppState, ErrorResponse};
use crate::domain::entity::import_outcome::StampEntry;
use crate::domain::entity::order::NaturalKey;

#[utoipa::path(get, path = "/healthz", responses((status = 200, description = "Health check OK")))]
pub async fn healthz() -> &'static str {
    "ok"
}

#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Ready"),
        (status = 503, description = "Database not ready"),
    )
)]
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(ref pool) = state.db_pool {
        match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => (StatusCode::OK, "ready"),
            Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "database not ready"),
        }
    } else {
        (StatusCode::OK, "ready")
    }
}

#[utoipa::path(get, path = "/metrics", responses((status = 200, description = "Prometheus metrics")))]
pub async fn metrics(State(state): State<AppState>) -> Result<String, OrderError> {
    state
        .metrics
        .gather_metrics()
        .map_err(|e| OrderError::Internal(e.to_string()))
}

pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{order_id}/items/{transaction_id}/stamp",
    params(
        ("order_id" = String, Path, description = "External order ID"),
        ("transaction_id" = String, Path, description = "Transaction (line item) ID"),
    ),
    responses(
        (status = 200, description = "Stamp regenerated", body = StampEntry),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 502, description = "Stamp renderer failed", body = ErrorResponse),
    )
)]
pub async fn regenerate_stamp(
    State(state): State<AppState>,
    Path((order_id, transaction_id)): Path<(String, String)>,
) -> Result<Json<StampEntry>, OrderError> {
    let key = NaturalKey::new(order_id, transaction_id);
    let entry = state.regenerate_stamp_uc.execute(&key).await?;
    Ok(Json(entry))
}
