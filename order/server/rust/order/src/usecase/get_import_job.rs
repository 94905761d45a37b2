use std::sync::Arc;

use serde::Serialize;

use crate::domain::entity::import_job::{ImportJob, ImportJobStatus};
use crate::domain::entity::import_outcome::ImportOutcome;
use crate::domain::service::ImportJobRegistry;

/// ImportJobSnapshot はポーリング応答用のジョブ状態。
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobSnapshot {
    pub job_id: String,
    pub status: ImportJobStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ImportOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ImportJob> for ImportJobSnapshot {
    fn from(job: ImportJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress: job.progress,
            message: job.message,
            result: job.result,
            error: job.error,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetImportJobError {
    #[error("import job not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

/// GetImportJobUseCase はジョブ状態の参照のみを行う。
pub struct GetImportJobUseCase {
    registry: Arc<ImportJobRegistry>,
}

impl GetImportJobUseCase {
    pub fn new(registry: Arc<ImportJobRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(&self, job_id: &str) -> Result<ImportJobSnapshot, GetImportJobError> {
        self.registry
            .get(job_id)
            .await?
            .map(ImportJobSnapshot::from)
            .ok_or_else(|| GetImportJobError::NotFound(job_id.to_string()))
    }
}
