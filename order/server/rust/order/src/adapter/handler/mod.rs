pub mod error;
pub mod import_handler;
pub mod order_handler;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::infrastructure::metrics::ImportMetrics;
use crate::usecase::{GetImportJobUseCase, RegenerateStampUseCase, RunImportJobUseCase};

/// AppState はアプリケーション全体の共有状態を表す。
#[derive(Clone)]
pub struct AppState {
    pub run_import_job_uc: Arc<RunImportJobUseCase>,
    pub get_import_job_uc: Arc<GetImportJobUseCase>,
    pub regenerate_stamp_uc: Arc<RegenerateStampUseCase>,
    pub metrics: Arc<ImportMetrics>,
    pub db_pool: Option<sqlx::PgPool>,
    /// multipart 本文全体の上限（バイト）
    pub max_upload_bytes: usize,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        order_handler::healthz,
        order_handler::readyz,
        order_handler::metrics,
        import_handler::submit_import,
        import_handler::import_sync,
        import_handler::get_import_job,
        order_handler::regenerate_stamp,
    ),
    components(schemas(
        import_handler::UploadForm,
        import_handler::ImportAcceptedResponse,
        crate::usecase::ImportJobSnapshot,
        crate::domain::entity::import_job::ImportJobStatus,
        crate::domain::entity::import_outcome::ImportOutcome,
        crate::domain::entity::import_outcome::SkippedRow,
        crate::domain::entity::import_outcome::StampEntry,
        crate::domain::entity::import_outcome::FailedRow,
        ErrorResponse,
        ErrorBody,
    )),
)]
pub struct ApiDoc;

/// REST API ルーターを構築する。
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        // Health / Readiness / Metrics
        .route("/healthz", get(order_handler::healthz))
        .route("/readyz", get(order_handler::readyz))
        .route("/metrics", get(order_handler::metrics))
        .route("/api-docs/openapi.json", get(order_handler::openapi))
        // Import endpoints
        .route(
            "/api/v1/orders/import",
            post(import_handler::submit_import),
        )
        .route(
            "/api/v1/orders/import/sync",
            post(import_handler::import_sync),
        )
        .route(
            "/api/v1/orders/import/jobs/{job_id}",
            get(import_handler::get_import_job),
        )
        // Stamp endpoints
        .route(
            "/api/v1/orders/{order_id}/items/{transaction_id}/stamp",
            post(order_handler::regenerate_stamp),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

/// ErrorResponse は統一エラーレスポンス。
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
    pub details: Vec<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
                request_id: uuid::Uuid::new_v4().to_string(),
                details: vec![],
            },
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.error.details = details;
        self
    }
}
