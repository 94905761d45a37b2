use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::entity::import_outcome::StampEntry;
use crate::domain::entity::order::NaturalKey;
use crate::domain::repository::OrderRepository;
use crate::infrastructure::stamp_renderer::StampRenderer;

#[derive(Debug, thiserror::Error)]
pub enum RegenerateStampError {
    #[error("order not found: {0}")]
    NotFound(NaturalKey),
    #[error("stamp generation failed: {0}")]
    Render(String),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

/// RegenerateStampUseCase は登録済み注文の印影を作り直す。
pub struct RegenerateStampUseCase {
    order_repo: Arc<dyn OrderRepository>,
    stamp_renderer: Arc<dyn StampRenderer>,
}

impl RegenerateStampUseCase {
    pub fn new(
        order_repo: Arc<dyn OrderRepository>,
        stamp_renderer: Arc<dyn StampRenderer>,
    ) -> Self {
        Self {
            order_repo,
            stamp_renderer,
        }
    }

    pub async fn execute(&self, key: &NaturalKey) -> Result<StampEntry, RegenerateStampError> {
        let order = self
            .order_repo
            .find_by_natural_key(key)
            .await?
            .ok_or_else(|| RegenerateStampError::NotFound(key.clone()))?;

        let path = match self.stamp_renderer.render(&order).await {
            Ok(path) => path,
            Err(e) => {
                warn!(natural_key = %key, error = %e, "stamp regeneration failed");
                self.order_repo.mark_stamp_failed(order.id).await?;
                return Err(RegenerateStampError::Render(e.to_string()));
            }
        };
        self.order_repo.attach_stamp(order.id, &path).await?;

        info!(natural_key = %key, stamp_path = %path, "stamp regenerated");
        Ok(StampEntry {
            natural_key: key.to_string(),
            artifact_path: path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::repository::order_in_memory::InMemoryOrderRepository;
    use crate::domain::entity::order::{NewOrder, Order, StampStatus};
    use crate::domain::repository::order_repository::MockOrderRepository;
    use crate::infrastructure::stamp_renderer::MockStampRenderer;

    fn failed_order() -> Order {
        let mut order = Order::from_new(NewOrder {
            order_id: "1001".to_string(),
            transaction_id: "T-2".to_string(),
            buyer_name: Some("Sato".to_string()),
            item_name: None,
            quantity: 1,
            stamp_text: "佐藤".to_string(),
            font_name: Some("kaisho".to_string()),
        });
        order.mark_stamp_failed();
        order
    }

    #[tokio::test]
    async fn test_regenerate_success() {
        let repo = Arc::new(InMemoryOrderRepository::with_orders(vec![failed_order()]));
        let mut renderer = MockStampRenderer::new();
        renderer
            .expect_render()
            .withf(|order| order.font_name.as_deref() == Some("kaisho"))
            .returning(|_| Ok("stamps/1001-T-2.png".to_string()));

        let uc = RegenerateStampUseCase::new(repo.clone(), Arc::new(renderer));
        let key = NaturalKey::new("1001", "T-2");
        let entry = uc.execute(&key).await.unwrap();
        assert_eq!(entry.natural_key, "1001:T-2");
        assert_eq!(entry.artifact_path, "stamps/1001-T-2.png");

        let order = repo.find_by_natural_key(&key).await.unwrap().unwrap();
        assert_eq!(order.stamp_status, StampStatus::Generated);
    }

    #[tokio::test]
    async fn test_regenerate_unknown_order() {
        let mut repo = MockOrderRepository::new();
        repo.expect_find_by_natural_key().returning(|_| Ok(None));
        let mut renderer = MockStampRenderer::new();
        renderer.expect_render().never();

        let uc = RegenerateStampUseCase::new(Arc::new(repo), Arc::new(renderer));
        let err = uc.execute(&NaturalKey::new("9", "x")).await.unwrap_err();
        assert!(matches!(err, RegenerateStampError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_regenerate_render_failure_marks_failed() {
        let order = failed_order();
        let order_id = order.id;
        let mut repo = MockOrderRepository::new();
        repo.expect_find_by_natural_key()
            .returning(move |_| Ok(Some(order.clone())));
        repo.expect_mark_stamp_failed()
            .withf(move |id| *id == order_id)
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_attach_stamp().never();

        let mut renderer = MockStampRenderer::new();
        renderer
            .expect_render()
            .returning(|_| Err(anyhow::anyhow!("renderer timeout")));

        let uc = RegenerateStampUseCase::new(Arc::new(repo), Arc::new(renderer));
        let err = uc.execute(&NaturalKey::new("1001", "T-2")).await.unwrap_err();
        assert!(matches!(err, RegenerateStampError::Render(msg) if msg.contains("renderer timeout")));
    }
}
