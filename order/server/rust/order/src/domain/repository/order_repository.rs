use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::order::{NaturalKey, Order};

/// OrderRepository は注文永続化のためのリポジトリトレイト。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 自然キーで注文の存在を確認する。
    async fn exists_by_natural_key(&self, key: &NaturalKey) -> anyhow::Result<bool>;

    /// 新しい注文を登録し、サロゲート ID を返す。
    /// 同じ自然キーの注文が既にある場合は何もせず None を返す。
    async fn insert(&self, order: &Order) -> anyhow::Result<Option<Uuid>>;

    /// 自然キーで注文を取得する。
    async fn find_by_natural_key(&self, key: &NaturalKey) -> anyhow::Result<Option<Order>>;

    /// 生成済みの印影パスを注文に紐づける。
    async fn attach_stamp(&self, id: Uuid, stamp_path: &str) -> anyhow::Result<()>;

    /// 印影生成の失敗を記録する。
    async fn mark_stamp_failed(&self, id: Uuid) -> anyhow::Result<()>;
}
