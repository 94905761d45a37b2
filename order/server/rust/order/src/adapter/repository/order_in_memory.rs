use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entity::order::{NaturalKey, Order};
use crate::domain::repository::OrderRepository;

/// InMemoryOrderRepository はインメモリの注文リポジトリ（DB 未設定時と統合テスト用）。
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<NaturalKey, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders: RwLock::new(
                orders
                    .into_iter()
                    .map(|o| (o.natural_key(), o))
                    .collect(),
            ),
        }
    }

    /// 登録済み注文のスナップショットを返す。
    pub async fn orders(&self) -> Vec<Order> {
        self.orders.read().await.values().cloned().collect()
    }
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn exists_by_natural_key(&self, key: &NaturalKey) -> anyhow::Result<bool> {
        Ok(self.orders.read().await.contains_key(key))
    }

    async fn insert(&self, order: &Order) -> anyhow::Result<Option<Uuid>> {
        let mut orders = self.orders.write().await;
        let key = order.natural_key();
        if orders.contains_key(&key) {
            return Ok(None);
        }
        orders.insert(key, order.clone());
        Ok(Some(order.id))
    }

    async fn find_by_natural_key(&self, key: &NaturalKey) -> anyhow::Result<Option<Order>> {
        Ok(self.orders.read().await.get(key).cloned())
    }

    async fn attach_stamp(&self, id: Uuid, stamp_path: &str) -> anyhow::Result<()> {
        let mut orders = self.orders.write().await;
        let order = orders
            .values_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| anyhow::anyhow!("order not found: {}", id))?;
        order.attach_stamp(stamp_path.to_string());
        Ok(())
    }

    async fn mark_stamp_failed(&self, id: Uuid) -> anyhow::Result<()> {
        let mut orders = self.orders.write().await;
        if let Some(order) = orders.values_mut().find(|o| o.id == id) {
            order.mark_stamp_failed();
        }
        Ok(())
    }
}
