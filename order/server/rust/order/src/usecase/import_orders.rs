use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::entity::dataset::{DatasetError, DatasetRow, UploadedDataset};
use crate::domain::entity::import_outcome::ImportOutcome;
use crate::domain::entity::order::{NaturalKey, Order};
use crate::domain::repository::OrderRepository;
use crate::domain::service::order_row_parser::{parse_order_row, partial_key};
use crate::infrastructure::metrics::ImportMetrics;
use crate::infrastructure::spreadsheet::read_dataset;
use crate::infrastructure::stamp_renderer::StampRenderer;

/// ProgressReporter は取込の進捗を呼び出し元へ通知する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// 1 行処理するごとに呼ばれる。`processed` は 1 から `total` まで増加する。
    async fn report(&self, processed: usize, total: usize);
}

/// 進捗を捨てるレポーター（同期取込用）。
pub struct NoopProgressReporter;

#[async_trait]
impl ProgressReporter for NoopProgressReporter {
    async fn report(&self, _processed: usize, _total: usize) {}
}

/// ImportError は取込全体を中断させるエラー。行単位のエラーは `ImportOutcome` に記録される。
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("dataset reader failed: {0}")]
    Internal(String),
}

/// ImportOrdersUseCase はデータセットを解析し、重複を除いて注文を登録し、印影を生成する。
pub struct ImportOrdersUseCase {
    order_repo: Arc<dyn OrderRepository>,
    stamp_renderer: Arc<dyn StampRenderer>,
    max_rows: usize,
    metrics: Option<Arc<ImportMetrics>>,
}

impl ImportOrdersUseCase {
    pub fn new(
        order_repo: Arc<dyn OrderRepository>,
        stamp_renderer: Arc<dyn StampRenderer>,
        max_rows: usize,
    ) -> Self {
        Self {
            order_repo,
            stamp_renderer,
            max_rows,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ImportMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// データセットを取り込む。行はファイル順に 1 行ずつ処理する。
    pub async fn execute(
        &self,
        dataset: &UploadedDataset,
        progress: &dyn ProgressReporter,
    ) -> Result<ImportOutcome, ImportError> {
        let rows = self.read_rows(dataset).await?;
        let total = rows.len();
        let mut outcome = ImportOutcome::new(total);
        // 登録済みまたは既存と確認できたキーのみを保持する
        let mut seen: HashSet<NaturalKey> = HashSet::new();

        for (index, row) in rows.iter().enumerate() {
            self.import_row(row, &mut seen, &mut outcome).await;
            progress.report(index + 1, total).await;
        }

        self.record_metrics(&outcome);
        info!(
            file_name = %dataset.file_name,
            total = outcome.total,
            created = outcome.created,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "order import finished"
        );
        Ok(outcome)
    }

    async fn read_rows(&self, dataset: &UploadedDataset) -> Result<Vec<DatasetRow>, ImportError> {
        let dataset = dataset.clone();
        let max_rows = self.max_rows;
        let rows = tokio::task::spawn_blocking(move || read_dataset(&dataset, max_rows))
            .await
            .map_err(|e| ImportError::Internal(e.to_string()))??;
        Ok(rows)
    }

    async fn import_row(
        &self,
        row: &DatasetRow,
        seen: &mut HashSet<NaturalKey>,
        outcome: &mut ImportOutcome,
    ) {
        let new_order = match parse_order_row(row) {
            Ok(order) => order,
            Err(e) => {
                outcome.record_failure(row.row_number, partial_key(row).as_ref(), e.to_string());
                return;
            }
        };

        let key = new_order.natural_key();
        if seen.contains(&key) {
            outcome.record_duplicate(&key);
            return;
        }

        match self.order_repo.exists_by_natural_key(&key).await {
            Ok(true) => {
                seen.insert(key.clone());
                outcome.record_duplicate(&key);
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(row = row.row_number, natural_key = %key, error = %e, "existence check failed");
                outcome.record_failure(
                    row.row_number,
                    Some(&key),
                    format!("existence check failed: {e}"),
                );
                return;
            }
        }

        let order = Order::from_new(new_order);
        let order_id = match self.order_repo.insert(&order).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                // 存在確認の後に別のジョブが同じキーを登録した
                seen.insert(key.clone());
                outcome.record_duplicate(&key);
                return;
            }
            Err(e) => {
                warn!(row = row.row_number, natural_key = %key, error = %e, "failed to persist order");
                outcome.record_failure(
                    row.row_number,
                    Some(&key),
                    format!("failed to persist order: {e}"),
                );
                return;
            }
        };
        seen.insert(key.clone());
        outcome.record_created();

        // 印影生成に失敗しても注文は取り消さない
        let generated = match self.stamp_renderer.render(&order).await {
            Ok(path) => self
                .order_repo
                .attach_stamp(order_id, &path)
                .await
                .map(|()| path),
            Err(e) => Err(e),
        };
        match generated {
            Ok(path) => outcome.record_stamp(&key, path),
            Err(e) => {
                warn!(row = row.row_number, natural_key = %key, error = %e, "stamp generation failed");
                if let Err(mark_err) = self.order_repo.mark_stamp_failed(order_id).await {
                    warn!(natural_key = %key, error = %mark_err, "failed to mark stamp as failed");
                }
                outcome.record_stamp_failure(
                    row.row_number,
                    &key,
                    format!("stamp generation failed: {e}"),
                );
            }
        }
    }

    fn record_metrics(&self, outcome: &ImportOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rows("created", outcome.created);
            metrics.record_rows("skipped", outcome.skipped);
            metrics.record_rows("failed", outcome.failed);
            metrics.record_rows("stamp_failed", outcome.stamp_failed);
        }
    }
}
