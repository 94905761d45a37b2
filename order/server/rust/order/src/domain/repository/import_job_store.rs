use async_trait::async_trait;

use crate::domain::entity::import_job::ImportJob;

/// ImportJobStore は取込ジョブ状態の保存先。
/// 既定ではプロセス内のマップだが、永続ストアに差し替えられる。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImportJobStore: Send + Sync {
    async fn get(&self, id: &str) -> anyhow::Result<Option<ImportJob>>;

    async fn insert(&self, job: &ImportJob) -> anyhow::Result<()>;

    /// 既存のジョブを丸ごと置き換える。存在しない場合は何もせず false を返す。
    async fn replace(&self, job: &ImportJob) -> anyhow::Result<bool>;

    /// ジョブを削除する。削除した場合は true。
    async fn remove(&self, id: &str) -> anyhow::Result<bool>;
}
