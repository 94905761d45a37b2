use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use super::error::OrderError;
use super::{AppState, ErrorResponse};
use crate::domain::entity::dataset::UploadedDataset;
use crate::domain::entity::import_outcome::ImportOutcome;
use crate::usecase::ImportJobSnapshot;

/// アップロードで受け付ける multipart フィールド名
const FILE_FIELD: &str = "file";

/// UploadForm は取込ファイルの multipart フォーム（OpenAPI 用）。
#[derive(Debug, utoipa::ToSchema)]
pub struct UploadForm {
    /// .xlsx / .xlsm / .xls / .ods / .csv
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportAcceptedResponse {
    pub message: String,
    pub job_id: String,
    pub status: String,
}

/// multipart から `file` フィールドを取り出し、拡張子と空ファイルを検証する。
async fn read_upload(mut multipart: Multipart) -> Result<UploadedDataset, OrderError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(ToString::to_string)
            .ok_or_else(|| OrderError::Validation("file name is required".to_string()))?;
        let content = field.bytes().await.map_err(multipart_error)?;
        return Ok(UploadedDataset::new(file_name, content)?);
    }
    Err(OrderError::Validation(format!(
        "multipart field '{FILE_FIELD}' is required"
    )))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> OrderError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OrderError::PayloadTooLarge(err.body_text())
    } else {
        OrderError::Validation(err.body_text())
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/import",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Import job accepted", body = ImportAcceptedResponse),
        (status = 400, description = "Invalid upload", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse),
    )
)]
pub async fn submit_import(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImportAcceptedResponse>), OrderError> {
    let dataset = read_upload(multipart).await?;
    let file_name = dataset.file_name.clone();

    let job_id = state
        .run_import_job_uc
        .submit(dataset)
        .await
        .map_err(|e| OrderError::Internal(e.to_string()))?;

    info!(job_id = %job_id, file_name = %file_name, "order import submitted");
    Ok((
        StatusCode::ACCEPTED,
        Json(ImportAcceptedResponse {
            message: "import started".to_string(),
            job_id,
            status: "processing".to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/import/sync",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Import finished", body = ImportOutcome),
        (status = 400, description = "Invalid upload", body = ErrorResponse),
        (status = 422, description = "Dataset could not be imported", body = ErrorResponse),
    )
)]
pub async fn import_sync(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImportOutcome>, OrderError> {
    let dataset = read_upload(multipart).await?;
    let outcome = state.run_import_job_uc.import_sync(dataset).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/import/jobs/{job_id}",
    params(("job_id" = String, Path, description = "Import job ID")),
    responses(
        (status = 200, description = "Import job state", body = ImportJobSnapshot),
        (status = 404, description = "Unknown or expired job", body = ErrorResponse),
    )
)]
pub async fn get_import_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ImportJobSnapshot>, OrderError> {
    let snapshot = state.get_import_job_uc.execute(&job_id).await?;
    Ok(Json(snapshot))
}
