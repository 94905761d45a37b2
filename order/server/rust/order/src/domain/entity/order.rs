use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// NaturalKey は注文 ID と取引（明細）ID の複合キー。重複判定はこのキーで行う。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    pub order_id: String,
    pub transaction_id: String,
}

impl NaturalKey {
    pub fn new(order_id: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            transaction_id: transaction_id.into(),
        }
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.order_id, self.transaction_id)
    }
}

/// StampStatus は注文に紐づく印影画像の生成状態を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StampStatus {
    Pending,
    Generated,
    Failed,
}

impl std::fmt::Display for StampStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Generated => write!(f, "generated"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StampStatus {
    pub fn from_str_value(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "generated" => Ok(Self::Generated),
            "failed" => Ok(Self::Failed),
            _ => anyhow::bail!("invalid stamp status: {}", s),
        }
    }
}

/// NewOrder はアップロードされた 1 行を正規化した注文データ。
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NewOrder {
    #[validate(length(min = 1, max = 64))]
    pub order_id: String,
    #[validate(length(min = 1, max = 64))]
    pub transaction_id: String,
    #[validate(length(max = 255))]
    pub buyer_name: Option<String>,
    #[validate(length(max = 255))]
    pub item_name: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[validate(length(min = 1, max = 200))]
    pub stamp_text: String,
    #[validate(length(max = 100))]
    pub font_name: Option<String>,
}

impl NewOrder {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(self.order_id.clone(), self.transaction_id.clone())
    }
}

/// Order は永続化済みの注文明細。
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_id: String,
    pub transaction_id: String,
    pub buyer_name: Option<String>,
    pub item_name: Option<String>,
    pub quantity: u32,
    pub stamp_text: String,
    pub font_name: Option<String>,
    pub stamp_status: StampStatus,
    pub stamp_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// 取込行から印影未生成の注文を作成する。
    pub fn from_new(new: NewOrder) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            transaction_id: new.transaction_id,
            buyer_name: new.buyer_name,
            item_name: new.item_name,
            quantity: new.quantity,
            stamp_text: new.stamp_text,
            font_name: new.font_name,
            stamp_status: StampStatus::Pending,
            stamp_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(self.order_id.clone(), self.transaction_id.clone())
    }

    /// 生成済みの印影パスを紐づける。
    pub fn attach_stamp(&mut self, path: String) {
        self.stamp_path = Some(path);
        self.stamp_status = StampStatus::Generated;
        self.updated_at = Utc::now();
    }

    pub fn mark_stamp_failed(&mut self) {
        self.stamp_status = StampStatus::Failed;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_new_order() -> NewOrder {
        NewOrder {
            order_id: "1001".to_string(),
            transaction_id: "T-1".to_string(),
            buyer_name: Some("Sato".to_string()),
            item_name: Some("Round stamp".to_string()),
            quantity: 1,
            stamp_text: "佐藤".to_string(),
            font_name: None,
        }
    }

    #[test]
    fn test_natural_key_display() {
        let key = NaturalKey::new("1001", "T-1");
        assert_eq!(key.to_string(), "1001:T-1");
    }

    #[test]
    fn test_from_new_starts_pending() {
        let order = Order::from_new(make_new_order());
        assert_eq!(order.stamp_status, StampStatus::Pending);
        assert!(order.stamp_path.is_none());
        assert_eq!(order.natural_key(), NaturalKey::new("1001", "T-1"));
    }

    #[test]
    fn test_attach_stamp() {
        let mut order = Order::from_new(make_new_order());
        order.attach_stamp("stamps/1001-T-1.png".to_string());
        assert_eq!(order.stamp_status, StampStatus::Generated);
        assert_eq!(order.stamp_path.as_deref(), Some("stamps/1001-T-1.png"));
    }

    #[test]
    fn test_new_order_validation() {
        assert!(make_new_order().validate().is_ok());

        let mut invalid = make_new_order();
        invalid.quantity = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = make_new_order();
        invalid.stamp_text = String::new();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_stamp_status_round_trip() {
        for status in [StampStatus::Pending, StampStatus::Generated, StampStatus::Failed] {
            assert_eq!(
                StampStatus::from_str_value(&status.to_string()).unwrap(),
                status
            );
        }
        assert!(StampStatus::from_str_value("unknown").is_err());
    }
}
