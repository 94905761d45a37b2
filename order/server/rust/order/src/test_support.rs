//! テスト用インメモリ実装とヘルパー。
//! 統合テスト（tests/integration_test.rs）から利用する。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::adapter::handler::AppState;
use crate::domain::entity::order::Order;
use crate::domain::repository::{ImportJobStore, OrderRepository};
use crate::domain::service::ImportJobRegistry;
use crate::infrastructure::metrics::ImportMetrics;
use crate::infrastructure::stamp_renderer::StampRenderer;
use crate::usecase::{
    GetImportJobUseCase, ImportOrdersUseCase, RegenerateStampUseCase, RunImportJobUseCase,
};

pub use crate::adapter::repository::import_job_in_memory::InMemoryImportJobStore;
pub use crate::adapter::repository::order_in_memory::InMemoryOrderRepository;

// ---------------------------------------------------------------------------
// FakeStampRenderer
// ---------------------------------------------------------------------------

/// 指定した取引 ID の注文だけ生成に失敗するレンダラー。
/// 成功時は `stamps/{order_id}-{transaction_id}.png` を返す。
#[derive(Default)]
pub struct FakeStampRenderer {
    failing_transactions: HashSet<String>,
}

impl FakeStampRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(transaction_ids: &[&str]) -> Self {
        Self {
            failing_transactions: transaction_ids.iter().map(ToString::to_string).collect(),
        }
    }
}

#[async_trait]
impl StampRenderer for FakeStampRenderer {
    async fn render(&self, order: &Order) -> anyhow::Result<String> {
        if self.failing_transactions.contains(&order.transaction_id) {
            anyhow::bail!("renderer rejected transaction {}", order.transaction_id);
        }
        Ok(format!(
            "stamps/{}-{}.png",
            order.order_id, order.transaction_id
        ))
    }
}

// ---------------------------------------------------------------------------
// make_test_app_state
// ---------------------------------------------------------------------------

pub const TEST_JOB_RETENTION: Duration = Duration::from_secs(3600);
pub const TEST_MAX_UPLOAD_BYTES: usize = 1024 * 1024;
pub const TEST_MAX_ROWS: usize = 1000;

pub fn make_test_app_state(
    order_repo: Arc<dyn OrderRepository>,
    job_store: Arc<dyn ImportJobStore>,
    stamp_renderer: Arc<dyn StampRenderer>,
) -> AppState {
    let metrics = Arc::new(ImportMetrics::new("test").unwrap_or_else(|e| panic!("metrics: {e}")));
    let registry = Arc::new(ImportJobRegistry::new(job_store));

    let import_uc = Arc::new(
        ImportOrdersUseCase::new(order_repo.clone(), stamp_renderer.clone(), TEST_MAX_ROWS)
            .with_metrics(metrics.clone()),
    );
    let run_import_job_uc = Arc::new(
        RunImportJobUseCase::new(registry.clone(), import_uc, TEST_JOB_RETENTION)
            .with_metrics(metrics.clone()),
    );
    let get_import_job_uc = Arc::new(GetImportJobUseCase::new(registry));
    let regenerate_stamp_uc = Arc::new(RegenerateStampUseCase::new(order_repo, stamp_renderer));

    AppState {
        run_import_job_uc,
        get_import_job_uc,
        regenerate_stamp_uc,
        metrics,
        db_pool: None,
        max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
    }
}
