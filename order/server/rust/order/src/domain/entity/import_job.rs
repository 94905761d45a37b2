use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::import_outcome::ImportOutcome;

/// ImportJobStatus は一括取込ジョブの状態を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for ImportJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl ImportJobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// JobTransitionError はジョブ状態の不正な遷移を表す。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobTransitionError {
    #[error("job {id} is already {status}")]
    AlreadyTerminal { id: String, status: ImportJobStatus },

    #[error("invalid transition for job {id}: {reason}")]
    Invalid { id: String, reason: String },
}

/// JobUpdate はジョブへの部分更新。None のフィールドは変更しない。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<ImportJobStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub result: Option<ImportOutcome>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn processing(progress: u8, message: impl Into<String>) -> Self {
        Self {
            status: Some(ImportJobStatus::Processing),
            progress: Some(progress),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn completed(outcome: ImportOutcome) -> Self {
        Self {
            status: Some(ImportJobStatus::Completed),
            progress: Some(100),
            message: Some(format!(
                "import completed: {} created, {} skipped, {} failed",
                outcome.created, outcome.skipped, outcome.failed
            )),
            result: Some(outcome),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(ImportJobStatus::Failed),
            message: Some("import failed".to_string()),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// ImportJob は一括取込ジョブの進捗状態。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: String,
    pub status: ImportJobStatus,
    pub progress: u8,
    pub message: String,
    pub result: Option<ImportOutcome>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    /// 新しい pending 状態のジョブを作成する。
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: ImportJobStatus::Pending,
            progress: 0,
            message: "waiting to start".to_string(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 部分更新を適用する。検証に失敗した場合はジョブを一切変更しない。
    ///
    /// - 終端状態のジョブは変更できない
    /// - `result` は completed、`error` は failed と同時にしか設定できない
    /// - `progress` は 100 で頭打ちにし、減少させない
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), JobTransitionError> {
        if self.is_terminal() {
            return Err(JobTransitionError::AlreadyTerminal {
                id: self.id.clone(),
                status: self.status,
            });
        }

        let next_status = update.status.unwrap_or(self.status);
        if next_status == ImportJobStatus::Pending && self.status != ImportJobStatus::Pending {
            return Err(self.invalid("cannot return to pending"));
        }
        if next_status == ImportJobStatus::Completed && update.result.is_none() {
            return Err(self.invalid("completed requires a result"));
        }
        if next_status == ImportJobStatus::Failed && update.error.is_none() {
            return Err(self.invalid("failed requires an error"));
        }
        if update.result.is_some() && next_status != ImportJobStatus::Completed {
            return Err(self.invalid("result is only allowed on completed"));
        }
        if update.error.is_some() && next_status != ImportJobStatus::Failed {
            return Err(self.invalid("error is only allowed on failed"));
        }

        self.status = next_status;
        if let Some(progress) = update.progress {
            self.progress = self.progress.max(progress.min(100));
        }
        if let Some(message) = update.message {
            self.message = message;
        }
        if update.result.is_some() {
            self.result = update.result;
        }
        if update.error.is_some() {
            self.error = update.error;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn invalid(&self, reason: &str) -> JobTransitionError {
        JobTransitionError::Invalid {
            id: self.id.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Default for ImportJob {
    fn default() -> Self {
        Self::new()
    }
}
