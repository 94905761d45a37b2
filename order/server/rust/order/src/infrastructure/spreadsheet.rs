//! アップロードされたスプレッドシート / CSV を `DatasetRow` の列に変換する。

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::domain::entity::dataset::{DatasetError, DatasetFormat, DatasetRow, UploadedDataset};
use crate::domain::service::order_row_parser::{canonical_column, REQUIRED_COLUMNS};

/// データセットを読み込み、ヘッダー行を除いた非空行を返す。
///
/// 最初のワークシートの最初の非空行をヘッダーとして扱う。
/// 必須列の欠落や行数超過はデータセット全体のエラーになる。
pub fn read_dataset(
    dataset: &UploadedDataset,
    max_rows: usize,
) -> Result<Vec<DatasetRow>, DatasetError> {
    let grid = match dataset.format {
        DatasetFormat::Spreadsheet => read_spreadsheet_grid(&dataset.content)?,
        DatasetFormat::Csv => read_csv_grid(&dataset.content)?,
    };
    rows_from_grid(grid, max_rows)
}

/// 読み込んだ 1 行。`undecodable` は文字列に変換できなかったセルの列位置。
struct GridLine {
    row_number: usize,
    cells: Vec<String>,
    undecodable: Vec<usize>,
}

impl GridLine {
    fn is_blank(&self) -> bool {
        self.undecodable.is_empty() && self.cells.iter().all(|c| c.trim().is_empty())
    }
}

type Grid = Vec<GridLine>;

fn read_spreadsheet_grid(content: &[u8]) -> Result<Grid, DatasetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))
        .map_err(|e| DatasetError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DatasetError::NoWorksheet)?
        .map_err(|e| DatasetError::Unreadable(e.to_string()))?;

    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    Ok(range
        .rows()
        .enumerate()
        .map(|(i, cells)| GridLine {
            row_number: first_row + i + 1,
            cells: cells.iter().map(cell_to_string).collect(),
            undecodable: Vec::new(),
        })
        .collect())
}

/// CSV を読み込む。UTF-8 として読めないセルは行単位のエラーとして扱い、
/// CSV 自体の構造が壊れている場合のみデータセット全体のエラーにする。
fn read_csv_grid(content: &[u8]) -> Result<Grid, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let mut grid = Vec::new();
    for (i, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|e| DatasetError::Unreadable(e.to_string()))?;
        let row_number = record.position().map_or(i + 1, |p| p.line() as usize);

        let mut cells = Vec::with_capacity(record.len());
        let mut undecodable = Vec::new();
        for (column, field) in record.iter().enumerate() {
            match std::str::from_utf8(field) {
                Ok(value) => cells.push(value.to_string()),
                Err(_) => {
                    cells.push(String::new());
                    undecodable.push(column);
                }
            }
        }
        grid.push(GridLine {
            row_number,
            cells,
            undecodable,
        });
    }
    Ok(grid)
}

/// 整数値の浮動小数点セルは末尾の ".0" を付けずに文字列化する。
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}

fn rows_from_grid(grid: Grid, max_rows: usize) -> Result<Vec<DatasetRow>, DatasetError> {
    let mut lines = grid.into_iter().filter(|line| !line.is_blank());

    let header = lines.next().ok_or(DatasetError::MissingHeader)?;
    if !header.undecodable.is_empty() {
        return Err(DatasetError::Unreadable(format!(
            "header row {} is not valid UTF-8",
            header.row_number
        )));
    }
    let columns: Vec<Option<&'static str>> =
        header.cells.iter().map(|h| canonical_column(h)).collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !columns.contains(&Some(**required)))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(DatasetError::MissingColumns(missing));
    }

    let lines: Vec<GridLine> = lines.collect();
    if lines.len() > max_rows {
        return Err(DatasetError::TooManyRows {
            rows: lines.len(),
            limit: max_rows,
        });
    }

    let mut rows = Vec::with_capacity(lines.len());
    for line in lines {
        let mut mapped = HashMap::new();
        for (index, (column, value)) in columns.iter().zip(line.cells).enumerate() {
            if line.undecodable.contains(&index) {
                continue;
            }
            if let Some(column) = column {
                // 同じ列名が複数ある場合は左端を採用する
                mapped.entry((*column).to_string()).or_insert(value);
            }
        }
        let decode_error = line.undecodable.first().map(|&index| {
            let name = header
                .cells
                .get(index)
                .map_or_else(|| format!("#{}", index + 1), |h| h.trim().to_string());
            format!("column '{name}' is not valid UTF-8")
        });
        rows.push(DatasetRow {
            row_number: line.row_number,
            cells: mapped,
            decode_error,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::order_row_parser::{
        BUYER_NAME, ORDER_ID, QUANTITY, STAMP_TEXT, TRANSACTION_ID,
    };

    fn csv_dataset(content: &str) -> UploadedDataset {
        UploadedDataset::new("orders.csv", content.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_read_csv_with_aliases() {
        let dataset = csv_dataset(
            "Order Number,Line-Item ID,Personalization,Qty,Shipping\n\
             1001,T-1,佐藤,2,Tokyo\n\
             1001,T-2,鈴木,,Osaka\n",
        );
        let rows = read_dataset(&dataset, 100).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].get(ORDER_ID), Some("1001"));
        assert_eq!(rows[0].get(TRANSACTION_ID), Some("T-1"));
        assert_eq!(rows[0].get(STAMP_TEXT), Some("佐藤"));
        assert_eq!(rows[0].get(QUANTITY), Some("2"));
        assert_eq!(rows[1].get(QUANTITY), None);
        assert!(!rows[0].cells.contains_key("shipping"));
    }

    #[test]
    fn test_blank_rows_are_ignored() {
        let dataset = csv_dataset("\norder_id,transaction_id,stamp_text\n,,\n1,a,x\n , ,\n2,b,y\n");
        let rows = read_dataset(&dataset, 100).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(ORDER_ID), Some("1"));
        assert_eq!(rows[1].get(ORDER_ID), Some("2"));
        assert!(rows[0].row_number < rows[1].row_number);
    }

    #[test]
    fn test_missing_required_columns() {
        let dataset = csv_dataset("order_id,stamp_text\n1,x\n");
        assert_eq!(
            read_dataset(&dataset, 100).unwrap_err(),
            DatasetError::MissingColumns(vec![TRANSACTION_ID.to_string()])
        );
    }

    #[test]
    fn test_header_only_yields_no_rows() {
        let dataset = csv_dataset("order_id,transaction_id,stamp_text\n");
        assert!(read_dataset(&dataset, 100).unwrap().is_empty());
    }

    #[test]
    fn test_blank_file_has_no_header() {
        let dataset = csv_dataset("\n\n");
        assert_eq!(
            read_dataset(&dataset, 100).unwrap_err(),
            DatasetError::MissingHeader
        );
    }

    #[test]
    fn test_row_limit() {
        let dataset = csv_dataset("order_id,transaction_id,stamp_text\n1,a,x\n2,b,y\n3,c,z\n");
        assert!(read_dataset(&dataset, 3).is_ok());
        assert_eq!(
            read_dataset(&dataset, 2).unwrap_err(),
            DatasetError::TooManyRows { rows: 3, limit: 2 }
        );
        assert_eq!(
            read_dataset(&dataset, 1).unwrap_err(),
            DatasetError::TooManyRows { rows: 3, limit: 1 }
        );
    }

    #[test]
    fn test_undecodable_csv_field_fails_only_its_row() {
        let mut content = b"order_id,transaction_id,stamp_text\n1,a,x\n2,b,".to_vec();
        content.extend_from_slice(&[0xFF, 0xFE]);
        content.extend_from_slice(b"\n3,c,z\n");
        let dataset = UploadedDataset::new("orders.csv", content).unwrap();

        let rows = read_dataset(&dataset, 100).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].decode_error.is_none());
        assert_eq!(rows[1].row_number, 3);
        assert_eq!(rows[1].get(ORDER_ID), Some("2"));
        assert_eq!(rows[1].get(STAMP_TEXT), None);
        assert_eq!(
            rows[1].decode_error.as_deref(),
            Some("column 'stamp_text' is not valid UTF-8")
        );
        assert_eq!(rows[2].get(ORDER_ID), Some("3"));
    }

    #[test]
    fn test_undecodable_row_is_not_treated_as_blank() {
        let mut content = b"order_id,transaction_id\n".to_vec();
        content.extend_from_slice(&[0xC3, b',', 0xFF, b'\n']);
        let dataset = UploadedDataset::new("orders.csv", content).unwrap();

        let rows = read_dataset(&dataset, 100).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].cells.is_empty());
        assert!(rows[0].decode_error.is_some());
    }

    #[test]
    fn test_undecodable_header_is_unreadable() {
        let mut content = vec![0xFF];
        content.extend_from_slice(b"order_id,transaction_id\n1,a\n");
        let dataset = UploadedDataset::new("orders.csv", content).unwrap();
        assert!(matches!(
            read_dataset(&dataset, 100),
            Err(DatasetError::Unreadable(_))
        ));
    }

    #[test]
    fn test_read_xlsx_workbook() {
        let content = include_bytes!("../../tests/fixtures/orders.xlsx");
        let dataset = UploadedDataset::new("orders.xlsx", content.to_vec()).unwrap();

        let rows = read_dataset(&dataset, 100).unwrap();
        assert_eq!(rows.len(), 3);

        // ヘッダーは 2 行目、4 行目は空行
        let numbers: Vec<usize> = rows.iter().map(|r| r.row_number).collect();
        assert_eq!(numbers, vec![3, 5, 6]);

        assert_eq!(rows[0].get(ORDER_ID), Some("1001"));
        assert_eq!(rows[0].get(TRANSACTION_ID), Some("T-1"));
        assert_eq!(rows[0].get(QUANTITY), Some("2"));
        assert_eq!(rows[0].get(STAMP_TEXT), Some("佐藤"));
        assert_eq!(rows[0].get(BUYER_NAME), Some("Sato"));
        assert_eq!(rows[1].get(QUANTITY), None);
        assert_eq!(rows[2].get(TRANSACTION_ID), Some("5001"));
        assert!(rows.iter().all(|r| r.decode_error.is_none()));
    }

    #[test]
    fn test_garbage_workbook_is_unreadable() {
        let dataset = UploadedDataset::new("orders.xlsx", b"this is not a zip archive".to_vec()).unwrap();
        assert!(matches!(
            read_dataset(&dataset, 100),
            Err(DatasetError::Unreadable(_))
        ));
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Float(1001.0)), "1001");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::String("T-1".to_string())), "T-1");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }
}
