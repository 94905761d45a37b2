use serde::{Deserialize, Serialize};

use super::order::NaturalKey;

/// SkippedRow は重複としてスキップされた行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    pub natural_key: String,
    pub reason: String,
}

/// StampEntry は印影生成に成功した注文とそのパス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StampEntry {
    pub natural_key: String,
    pub artifact_path: String,
}

/// FailedRow は失敗した行と、その理由（ベストエフォート）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailedRow {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_key: Option<String>,
    pub reason: String,
}

/// ImportOutcome は一括取込 1 回分の集計結果。
///
/// 印影生成に失敗した行は `created` と `failed` の両方に数える（注文自体は登録済み）。
/// そのため `total == created + skipped + (failed - stamp_failed)` が常に成り立つ。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub total: usize,
    pub created: usize,
    pub skipped: usize,
    pub skipped_reasons: Vec<SkippedRow>,
    pub failed: usize,
    pub stamp_failed: usize,
    pub stamps: Vec<StampEntry>,
    pub errors: Vec<FailedRow>,
}

impl ImportOutcome {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record_created(&mut self) {
        self.created += 1;
    }

    pub fn record_duplicate(&mut self, key: &NaturalKey) {
        self.skipped += 1;
        self.skipped_reasons.push(SkippedRow {
            natural_key: key.to_string(),
            reason: "duplicate".to_string(),
        });
    }

    pub fn record_stamp(&mut self, key: &NaturalKey, artifact_path: String) {
        self.stamps.push(StampEntry {
            natural_key: key.to_string(),
            artifact_path,
        });
    }

    /// 登録前に失敗した行（解析失敗・ストレージ障害）を記録する。
    pub fn record_failure(&mut self, row: usize, key: Option<&NaturalKey>, reason: String) {
        self.failed += 1;
        self.errors.push(FailedRow {
            row,
            natural_key: key.map(ToString::to_string),
            reason,
        });
    }

    /// 登録済み注文の印影生成失敗を記録する。
    pub fn record_stamp_failure(&mut self, row: usize, key: &NaturalKey, reason: String) {
        self.stamp_failed += 1;
        self.record_failure(row, Some(key), reason);
    }

    /// 件数の整合性を検査する。
    pub fn is_balanced(&self) -> bool {
        self.failed >= self.stamp_failed
            && self.total == self.created + self.skipped + (self.failed - self.stamp_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_balance_with_stamp_failure() {
        let mut outcome = ImportOutcome::new(4);
        let dup = NaturalKey::new("1", "a");
        let ok = NaturalKey::new("2", "b");
        let broken = NaturalKey::new("3", "c");

        outcome.record_duplicate(&dup);
        outcome.record_created();
        outcome.record_stamp(&ok, "stamps/2-b.png".to_string());
        outcome.record_created();
        outcome.record_stamp_failure(4, &broken, "renderer unavailable".to_string());
        outcome.record_failure(5, None, "missing order_id".to_string());

        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.stamp_failed, 1);
        assert!(outcome.is_balanced());
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut outcome = ImportOutcome::new(1);
        outcome.record_duplicate(&NaturalKey::new("1", "a"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["skippedReasons"][0]["naturalKey"], "1:a");
        assert_eq!(json["skippedReasons"][0]["reason"], "duplicate");
        assert_eq!(json["stampFailed"], 0);
    }
}
