use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::order::{NaturalKey, Order, StampStatus};
use crate::domain::repository::OrderRepository;

/// OrderPostgresRepository は PostgreSQL 実装の注文リポジトリ。
pub struct OrderPostgresRepository {
    pool: PgPool,
}

impl OrderPostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for OrderPostgresRepository {
    async fn exists_by_natural_key(&self, key: &NaturalKey) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM orders.orders
                WHERE order_id = $1 AND transaction_id = $2
            )
            "#,
        )
        .bind(&key.order_id)
        .bind(&key.transaction_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert(&self, order: &Order) -> anyhow::Result<Option<Uuid>> {
        let quantity = i32::try_from(order.quantity)?;
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders.orders
                (id, order_id, transaction_id, buyer_name, item_name, quantity, stamp_text, font_name, stamp_status, stamp_path, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (order_id, transaction_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(order.id)
        .bind(&order.order_id)
        .bind(&order.transaction_id)
        .bind(&order.buyer_name)
        .bind(&order.item_name)
        .bind(quantity)
        .bind(&order.stamp_text)
        .bind(&order.font_name)
        .bind(order.stamp_status.to_string())
        .bind(&order.stamp_path)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn find_by_natural_key(&self, key: &NaturalKey) -> anyhow::Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, order_id, transaction_id, buyer_name, item_name, quantity, stamp_text, font_name, stamp_status, stamp_path, created_at, updated_at
            FROM orders.orders
            WHERE order_id = $1 AND transaction_id = $2
            "#,
        )
        .bind(&key.order_id)
        .bind(&key.transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn attach_stamp(&self, id: Uuid, stamp_path: &str) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders.orders
            SET stamp_status = $2, stamp_path = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(StampStatus::Generated.to_string())
        .bind(stamp_path)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("order not found: {}", id);
        }
        Ok(())
    }

    async fn mark_stamp_failed(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE orders.orders
            SET stamp_status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(StampStatus::Failed.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// OrderRow は DB 行からのマッピング用。
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_id: String,
    transaction_id: String,
    buyer_name: Option<String>,
    item_name: Option<String>,
    quantity: i32,
    stamp_text: String,
    font_name: Option<String>,
    stamp_status: String,
    stamp_path: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = anyhow::Error;

    fn try_from(row: OrderRow) -> anyhow::Result<Self> {
        Ok(Order {
            id: row.id,
            order_id: row.order_id,
            transaction_id: row.transaction_id,
            buyer_name: row.buyer_name,
            item_name: row.item_name,
            quantity: u32::try_from(row.quantity)?,
            stamp_text: row.stamp_text,
            font_name: row.font_name,
            stamp_status: StampStatus::from_str_value(&row.stamp_status)?,
            stamp_path: row.stamp_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
