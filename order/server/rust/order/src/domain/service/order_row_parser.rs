//! アップロード行を `NewOrder` に変換する。
//!
//! ヘッダーは前後空白を除去して小文字化し、空白とハイフンを `_` に置き換えた後、
//! 別名表で正規の列名に解決する。

use validator::Validate;

use crate::domain::entity::dataset::DatasetRow;
use crate::domain::entity::order::{NaturalKey, NewOrder};

pub const ORDER_ID: &str = "order_id";
pub const TRANSACTION_ID: &str = "transaction_id";
pub const BUYER_NAME: &str = "buyer_name";
pub const ITEM_NAME: &str = "item_name";
pub const QUANTITY: &str = "quantity";
pub const STAMP_TEXT: &str = "stamp_text";
pub const FONT_NAME: &str = "font_name";

/// ヘッダー行に必須の列。
pub const REQUIRED_COLUMNS: [&str; 2] = [ORDER_ID, TRANSACTION_ID];

const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    (ORDER_ID, &["order_id", "order_number", "order_no", "order"]),
    (
        TRANSACTION_ID,
        &["transaction_id", "line_item_id", "item_id", "transaction"],
    ),
    (
        BUYER_NAME,
        &["buyer_name", "buyer", "customer", "customer_name", "full_name"],
    ),
    (
        ITEM_NAME,
        &["item_name", "item", "product", "product_name", "title"],
    ),
    (QUANTITY, &["quantity", "qty"]),
    (STAMP_TEXT, &["stamp_text", "personalization", "text"]),
    (FONT_NAME, &["font_name", "font"]),
];

/// RowError は 1 行の構造的な解析エラー。バッチ全体は中断しない。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid value '{value}' for '{field}'")]
    InvalidValue {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: {message}")]
    Validation { row: usize, message: String },

    #[error("row {row}: {reason}")]
    Undecodable { row: usize, reason: String },
}

pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// ヘッダー文字列を正規の列名に解決する。未知の列は None。
pub fn canonical_column(header: &str) -> Option<&'static str> {
    let normalized = normalize_header(header);
    COLUMN_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
        .map(|(canonical, _)| *canonical)
}

/// 解析に失敗した行でも、両方の ID が読めれば自然キーを返す。
pub fn partial_key(row: &DatasetRow) -> Option<NaturalKey> {
    Some(NaturalKey::new(row.get(ORDER_ID)?, row.get(TRANSACTION_ID)?))
}

pub fn parse_order_row(row: &DatasetRow) -> Result<NewOrder, RowError> {
    if let Some(reason) = &row.decode_error {
        return Err(RowError::Undecodable {
            row: row.row_number,
            reason: reason.clone(),
        });
    }

    let required = |field: &'static str| {
        row.get(field)
            .map(ToString::to_string)
            .ok_or(RowError::MissingField {
                row: row.row_number,
                field,
            })
    };

    let order_id = required(ORDER_ID)?;
    let transaction_id = required(TRANSACTION_ID)?;
    let stamp_text = required(STAMP_TEXT)?;

    let quantity = match row.get(QUANTITY) {
        None => 1,
        Some(raw) => raw.parse::<u32>().map_err(|_| RowError::InvalidValue {
            row: row.row_number,
            field: QUANTITY,
            value: raw.to_string(),
        })?,
    };

    let order = NewOrder {
        order_id,
        transaction_id,
        buyer_name: row.get(BUYER_NAME).map(ToString::to_string),
        item_name: row.get(ITEM_NAME).map(ToString::to_string),
        quantity,
        stamp_text,
        font_name: row.get(FONT_NAME).map(ToString::to_string),
    };

    order.validate().map_err(|e| RowError::Validation {
        row: row.row_number,
        message: e.to_string(),
    })?;

    Ok(order)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn make_row(pairs: &[(&str, &str)]) -> DatasetRow {
        DatasetRow {
            row_number: 2,
            cells: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<HashMap<_, _>>(),
            decode_error: None,
        }
    }

    #[test]
    fn test_canonical_column_aliases() {
        assert_eq!(canonical_column("Order ID"), Some(ORDER_ID));
        assert_eq!(canonical_column(" order-number "), Some(ORDER_ID));
        assert_eq!(canonical_column("Transaction ID"), Some(TRANSACTION_ID));
        assert_eq!(canonical_column("Personalization"), Some(STAMP_TEXT));
        assert_eq!(canonical_column("QTY"), Some(QUANTITY));
        assert_eq!(canonical_column("Shipping Address"), None);
    }

    #[test]
    fn test_parse_full_row() {
        let row = make_row(&[
            (ORDER_ID, "1001"),
            (TRANSACTION_ID, "T-1"),
            (BUYER_NAME, "Sato"),
            (QUANTITY, "2"),
            (STAMP_TEXT, "佐藤"),
            (FONT_NAME, "kaisho"),
        ]);
        let order = parse_order_row(&row).unwrap();
        assert_eq!(order.natural_key(), NaturalKey::new("1001", "T-1"));
        assert_eq!(order.quantity, 2);
        assert_eq!(order.font_name.as_deref(), Some("kaisho"));
        assert!(order.item_name.is_none());
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let row = make_row(&[(ORDER_ID, "1"), (TRANSACTION_ID, "a"), (STAMP_TEXT, "x")]);
        assert_eq!(parse_order_row(&row).unwrap().quantity, 1);
    }

    #[test]
    fn test_missing_required_field() {
        let row = make_row(&[(ORDER_ID, "1001"), (STAMP_TEXT, "x")]);
        assert_eq!(
            parse_order_row(&row).unwrap_err(),
            RowError::MissingField {
                row: 2,
                field: TRANSACTION_ID
            }
        );
        assert!(partial_key(&row).is_none());
    }

    #[test]
    fn test_invalid_quantity_keeps_partial_key() {
        let row = make_row(&[
            (ORDER_ID, "1001"),
            (TRANSACTION_ID, "T-9"),
            (QUANTITY, "two"),
            (STAMP_TEXT, "x"),
        ]);
        assert!(matches!(
            parse_order_row(&row),
            Err(RowError::InvalidValue { field: QUANTITY, .. })
        ));
        assert_eq!(partial_key(&row), Some(NaturalKey::new("1001", "T-9")));
    }

    #[test]
    fn test_undecodable_row_is_rejected_with_partial_key() {
        let mut row = make_row(&[(ORDER_ID, "1001"), (TRANSACTION_ID, "T-3")]);
        row.decode_error = Some("column 'stamp_text' is not valid UTF-8".to_string());
        assert_eq!(
            parse_order_row(&row).unwrap_err(),
            RowError::Undecodable {
                row: 2,
                reason: "column 'stamp_text' is not valid UTF-8".to_string()
            }
        );
        assert_eq!(partial_key(&row), Some(NaturalKey::new("1001", "T-3")));
    }

    #[test]
    fn test_validation_failure() {
        let row = make_row(&[
            (ORDER_ID, "1"),
            (TRANSACTION_ID, "a"),
            (QUANTITY, "0"),
            (STAMP_TEXT, "x"),
        ]);
        assert!(matches!(
            parse_order_row(&row),
            Err(RowError::Validation { .. })
        ));
    }
}
