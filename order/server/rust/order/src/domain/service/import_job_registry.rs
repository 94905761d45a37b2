use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::entity::import_job::{ImportJob, JobTransitionError, JobUpdate};
use crate::domain::repository::ImportJobStore;

/// JobRegistryError はジョブレジストリ操作のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum JobRegistryError {
    #[error("import job not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Transition(#[from] JobTransitionError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// ImportJobRegistry はジョブの作成・部分更新・遅延削除を担う。
///
/// 1 ジョブにつき書き込みは実行中の取込タスク 1 つだけなので、
/// 取得 → マージ → 置換の順で更新してもジョブ単位の競合は起きない。
/// 置換はストア側で値ごと差し替えるため、読み手が途中状態を見ることはない。
pub struct ImportJobRegistry {
    store: Arc<dyn ImportJobStore>,
}

impl ImportJobRegistry {
    pub fn new(store: Arc<dyn ImportJobStore>) -> Self {
        Self { store }
    }

    /// pending 状態のジョブを登録する。
    pub async fn create(&self) -> anyhow::Result<ImportJob> {
        let job = ImportJob::new();
        self.store.insert(&job).await?;
        debug!(job_id = %job.id, "import job registered");
        Ok(job)
    }

    pub async fn get(&self, id: &str) -> anyhow::Result<Option<ImportJob>> {
        self.store.get(id).await
    }

    /// 部分更新をマージして保存し、更新後のジョブを返す。
    pub async fn update(&self, id: &str, update: JobUpdate) -> Result<ImportJob, JobRegistryError> {
        let mut job = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| JobRegistryError::NotFound(id.to_string()))?;

        job.apply(update)?;

        // 取得後に削除された場合は復活させない
        if !self.store.replace(&job).await? {
            return Err(JobRegistryError::NotFound(id.to_string()));
        }
        Ok(job)
    }

    /// 呼び出し時点から `after` 経過後にジョブを削除するタスクを起動する。
    pub fn schedule_eviction(&self, id: &str, after: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        let id = id.to_string();
        let deadline = tokio::time::Instant::now() + after;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            match store.remove(&id).await {
                Ok(true) => debug!(job_id = %id, "import job evicted"),
                Ok(false) => {}
                Err(e) => warn!(job_id = %id, error = %e, "failed to evict import job"),
            }
        })
    }
}
