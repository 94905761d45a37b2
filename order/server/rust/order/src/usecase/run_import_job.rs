use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::domain::entity::dataset::UploadedDataset;
use crate::domain::entity::import_job::JobUpdate;
use crate::domain::entity::import_outcome::ImportOutcome;
use crate::domain::service::ImportJobRegistry;
use crate::infrastructure::metrics::ImportMetrics;
use crate::usecase::import_orders::{
    ImportError, ImportOrdersUseCase, NoopProgressReporter, ProgressReporter,
};

/// RunImportJobUseCase は取込をバックグラウンドで実行し、ジョブ状態を更新する。
///
/// 取込全体を中断させるエラーをジョブの終端状態に変換するのはここだけ。
pub struct RunImportJobUseCase {
    registry: Arc<ImportJobRegistry>,
    import_uc: Arc<ImportOrdersUseCase>,
    retention: Duration,
    metrics: Option<Arc<ImportMetrics>>,
}

impl RunImportJobUseCase {
    pub fn new(
        registry: Arc<ImportJobRegistry>,
        import_uc: Arc<ImportOrdersUseCase>,
        retention: Duration,
    ) -> Self {
        Self {
            registry,
            import_uc,
            retention,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ImportMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// ジョブを登録して取込を起動し、ジョブ ID を即座に返す。
    pub async fn submit(&self, dataset: UploadedDataset) -> anyhow::Result<String> {
        let job = self.registry.create().await?;
        // ポーリングの有無にかかわらず作成時刻から保持期間で削除する
        self.registry.schedule_eviction(&job.id, self.retention);
        self.record_job("submitted");

        info!(
            job_id = %job.id,
            file_name = %dataset.file_name,
            "import job accepted, launching background execution"
        );

        let registry = self.registry.clone();
        let import_uc = self.import_uc.clone();
        let metrics = self.metrics.clone();
        let job_id = job.id.clone();
        tokio::spawn(async move {
            Self::run(registry, import_uc, metrics, job_id, dataset).await;
        });

        Ok(job.id)
    }

    /// ジョブを作らずに取込を実行し、結果を返す。
    pub async fn import_sync(&self, dataset: UploadedDataset) -> Result<ImportOutcome, ImportError> {
        self.import_uc.execute(&dataset, &NoopProgressReporter).await
    }

    async fn run(
        registry: Arc<ImportJobRegistry>,
        import_uc: Arc<ImportOrdersUseCase>,
        metrics: Option<Arc<ImportMetrics>>,
        job_id: String,
        dataset: UploadedDataset,
    ) {
        let started = JobUpdate::processing(0, format!("reading {}", dataset.file_name));
        if let Err(e) = registry.update(&job_id, started).await {
            warn!(job_id = %job_id, error = %e, "failed to mark import job as processing");
        }

        let reporter = JobProgressReporter {
            registry: registry.clone(),
            job_id: job_id.clone(),
        };
        // パニックも終端状態に変換するため別タスクで実行する
        let handle = tokio::spawn(async move { import_uc.execute(&dataset, &reporter).await });

        let (update, status) = match handle.await {
            Ok(Ok(outcome)) => {
                info!(
                    job_id = %job_id,
                    created = outcome.created,
                    skipped = outcome.skipped,
                    failed = outcome.failed,
                    "import job completed"
                );
                (JobUpdate::completed(outcome), "completed")
            }
            Ok(Err(e)) => {
                error!(job_id = %job_id, error = %e, "import job failed");
                (JobUpdate::failed(e.to_string()), "failed")
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "import worker terminated unexpectedly");
                (JobUpdate::failed(format!("import worker terminated: {e}")), "failed")
            }
        };

        if let Some(metrics) = &metrics {
            metrics.record_job(status);
        }
        if let Err(e) = registry.update(&job_id, update).await {
            warn!(job_id = %job_id, error = %e, "failed to record import job result");
        }
    }

    fn record_job(&self, status: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_job(status);
        }
    }
}

/// 処理済み行数をジョブの進捗率に変換して書き込む。
struct JobProgressReporter {
    registry: Arc<ImportJobRegistry>,
    job_id: String,
}

#[async_trait]
impl ProgressReporter for JobProgressReporter {
    async fn report(&self, processed: usize, total: usize) {
        let update = JobUpdate::processing(
            progress_percent(processed, total),
            format!("processed {processed} of {total} rows"),
        );
        if let Err(e) = self.registry.update(&self.job_id, update).await {
            debug!(job_id = %self.job_id, error = %e, "progress update dropped");
        }
    }
}

fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(processed.min(total) * 100 / total).unwrap_or(100)
}
