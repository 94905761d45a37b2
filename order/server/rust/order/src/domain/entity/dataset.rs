use std::collections::HashMap;

use bytes::Bytes;

/// DatasetError はアップロードされたデータセット全体に関するエラー。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasetError {
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("uploaded file is empty")]
    Empty,

    #[error("failed to open dataset: {0}")]
    Unreadable(String),

    #[error("dataset contains no worksheet")]
    NoWorksheet,

    #[error("dataset has no header row")]
    MissingHeader,

    #[error("required columns are missing: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("dataset has {rows} rows, exceeding the limit of {limit}")]
    TooManyRows { rows: usize, limit: usize },
}

/// DatasetFormat は取込可能なファイル形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// xlsx / xlsm / xls / ods
    Spreadsheet,
    Csv,
}

impl DatasetFormat {
    /// ファイル名の拡張子から形式を判定する（大文字小文字は区別しない）。
    pub fn from_file_name(file_name: &str) -> Result<Self, DatasetError> {
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(Self::Spreadsheet),
            "csv" => Ok(Self::Csv),
            _ => Err(DatasetError::UnsupportedExtension(file_name.to_string())),
        }
    }
}

/// UploadedDataset は拡張子検証済みのアップロードファイル。
#[derive(Debug, Clone)]
pub struct UploadedDataset {
    pub file_name: String,
    pub format: DatasetFormat,
    pub content: Bytes,
}

impl UploadedDataset {
    /// 拡張子と空ファイルを検証してデータセットを作成する。
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Result<Self, DatasetError> {
        let file_name = file_name.into();
        let content = content.into();
        let format = DatasetFormat::from_file_name(&file_name)?;
        if content.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Self {
            file_name,
            format,
            content,
        })
    }
}

/// DatasetRow はヘッダー名で引ける 1 データ行。`row_number` はファイル上の 1 始まりの行番号。
///
/// `decode_error` はセルを文字列として読めなかった場合の理由。読めなかったセルは `cells` に含まない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetRow {
    pub row_number: usize,
    pub cells: HashMap<String, String>,
    pub decode_error: Option<String>,
}

impl DatasetRow {
    /// 空白を除いた値を返す。空セルは None。
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
