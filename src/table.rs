//! # Table Loading
//!
//! Reads the source spreadsheet into an immutable in-memory [`Table`].
//!
//! Loading happens exactly once, before the server accepts traffic. Every
//! way the source can be bad (missing file, corrupt bytes, wrong columns)
//! is captured as a [`LoadState::Failed`] value rather than an error that
//! escapes this module, so the server still starts and `/health` can
//! report what went wrong.

use std::{fs::File, path::Path};

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;
use tracing::{error, info};

/// Column that identifies a food row; lookups and search run against it.
pub const KEY_COLUMN: &str = "식품명";

/// One spreadsheet cell. Payload cells are kept verbatim; comparisons go
/// through [`CellValue::as_text`] so numeric and text cells compare the
/// same way.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Float(f64),
    Empty,
}

impl CellValue {
    /// Canonical text form used for every comparison. `Empty` has none,
    /// so a row without a key value can never be a lookup or search hit.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(text) => Some(text.clone()),
            CellValue::Int(number) => Some(number.to_string()),
            CellValue::Float(number) => Some(number.to_string()),
            CellValue::Empty => None,
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(text) => CellValue::Text(text.clone()),
            Data::Int(number) => CellValue::Int(*number),
            Data::Float(number) => CellValue::Float(*number),
            Data::DateTime(stamp) => CellValue::Float(stamp.as_f64()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CellValue::Text(text) => serializer.serialize_str(text),
            CellValue::Int(number) => serializer.serialize_i64(*number),
            CellValue::Float(number) => serializer.serialize_f64(*number),
            CellValue::Empty => serializer.serialize_unit(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source not found: {path}")]
    SourceNotFound { path: String },

    #[error("parse error: {detail}")]
    Parse { detail: String },

    #[error("missing key column; candidates: {candidates:?}")]
    MissingKeyColumn { candidates: Vec<String> },
}

/// Ordered rows sharing one column set. The key column index is located
/// once here, so a `Table` cannot exist without it.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    key_idx: usize,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, LoadError> {
        let Some(key_idx) = columns.iter().position(|label| label == KEY_COLUMN) else {
            // Near-miss labels (superstring of the key, or sharing its
            // trailing character) point at trailing-space or spacing
            // variants in the source.
            let candidates = columns
                .iter()
                .filter(|label| {
                    label.contains(KEY_COLUMN)
                        || KEY_COLUMN
                            .chars()
                            .next_back()
                            .is_some_and(|tail| label.contains(tail))
                })
                .cloned()
                .collect();

            return Err(LoadError::MissingKeyColumn { candidates });
        };

        Ok(Self {
            columns,
            rows,
            key_idx,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn record(&self, index: usize) -> Record<'_> {
        Record {
            columns: &self.columns,
            cells: &self.rows[index],
            key_idx: self.key_idx,
        }
    }

    /// Rows in table order.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|cells| Record {
            columns: &self.columns,
            cells,
            key_idx: self.key_idx,
        })
    }
}

/// Borrowed view of one row; serializes as a map in column order.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    cells: &'a [CellValue],
    key_idx: usize,
}

impl Record<'_> {
    /// Key cell in canonical text form, `None` when the cell is empty.
    pub fn key(&self) -> Option<String> {
        self.cells[self.key_idx].as_text()
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|label| label == column)
            .map(|index| &self.cells[index])
    }
}

impl Serialize for Record<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

#[derive(Debug)]
pub enum LoadState {
    Unloaded,
    Loaded(Table),
    Failed(LoadError),
}

impl LoadState {
    /// Reads the source table, containing every failure as `Failed`.
    pub fn load(path: &Path) -> LoadState {
        match read_table(path) {
            Ok(table) => {
                info!(
                    rows = table.len(),
                    columns = table.column_count(),
                    "loaded food table from {}",
                    path.display()
                );
                LoadState::Loaded(table)
            }
            Err(err) => {
                error!("failed to load food table from {}: {err}", path.display());
                LoadState::Failed(err)
            }
        }
    }
}

fn read_table(path: &Path) -> Result<Table, LoadError> {
    if !path.exists() {
        return Err(LoadError::SourceNotFound {
            path: path.display().to_string(),
        });
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let (columns, rows) = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?,
        "csv" => read_csv(path)?,
        other => {
            return Err(LoadError::Parse {
                detail: format!("unsupported format: .{other}"),
            });
        }
    };

    Table::new(columns, rows)
}

fn read_workbook(path: &Path) -> Result<(Vec<String>, Vec<Vec<CellValue>>), LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|err| LoadError::Parse {
        detail: err.to_string(),
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Parse {
            detail: "workbook has no sheets".to_string(),
        })?
        .map_err(|err| LoadError::Parse {
            detail: err.to_string(),
        })?;

    let mut source_rows = range.rows();
    let columns = match source_rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| header_label(&CellValue::from(cell)))
            .collect(),
        None => {
            return Err(LoadError::Parse {
                detail: "sheet has no header row".to_string(),
            });
        }
    };

    let rows = source_rows
        .map(|row| row.iter().map(CellValue::from).collect())
        .collect();

    Ok((columns, rows))
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<CellValue>>), LoadError> {
    let file = File::open(path).map_err(|err| LoadError::Parse {
        detail: err.to_string(),
    })?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

    let columns = reader
        .headers()
        .map_err(|err| LoadError::Parse {
            detail: err.to_string(),
        })?
        .iter()
        .map(|label| label.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| LoadError::Parse {
            detail: err.to_string(),
        })?;
        rows.push(record.iter().map(infer_cell).collect());
    }

    Ok((columns, rows))
}

/// Header labels are trimmed once here and compared verbatim afterward;
/// sources regularly carry trailing-space variants.
fn header_label(cell: &CellValue) -> String {
    cell.as_text().unwrap_or_default().trim().to_string()
}

/// CSV carries no cell types, so apply spreadsheet-style inference.
fn infer_cell(raw: &str) -> CellValue {
    if raw.is_empty() {
        CellValue::Empty
    } else if let Ok(number) = raw.parse::<i64>() {
        CellValue::Int(number)
    } else if let Ok(number) = raw.parse::<f64>() {
        CellValue::Float(number)
    } else {
        CellValue::Text(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn write_file(suffix: &str, lines: &[&str]) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_well_formed_table() {
        let file = write_file(".csv", &["식품명,열량", "백미밥,150"]);

        let state = LoadState::load(file.path());
        let LoadState::Loaded(table) = state else {
            panic!("expected Loaded, got {state:?}");
        };

        assert_eq!(table.len(), 1);
        assert_eq!(table.column_count(), 2);
        assert_eq!(
            serde_json::to_value(table.record(0)).unwrap(),
            serde_json::json!({"식품명": "백미밥", "열량": 150})
        );
    }

    #[test]
    fn trims_padded_header_labels() {
        let file = write_file(".csv", &[" 식품명 , 열량", "현미밥,160"]);

        let LoadState::Loaded(table) = LoadState::load(file.path()) else {
            panic!("expected Loaded");
        };

        assert_eq!(table.record(0).key().as_deref(), Some("현미밥"));
        assert_eq!(table.record(0).get("열량"), Some(&CellValue::Int(160)));
    }

    #[test]
    fn missing_key_column_reports_candidates() {
        let file = write_file(".csv", &["식품 명,열량", "백미밥,150"]);

        let state = LoadState::load(file.path());
        let LoadState::Failed(LoadError::MissingKeyColumn { candidates }) = state else {
            panic!("expected MissingKeyColumn, got {state:?}");
        };

        assert_eq!(candidates, vec!["식품 명".to_string()]);
    }

    #[test]
    fn nonexistent_path_is_source_not_found() {
        let state = LoadState::load(Path::new("no_such_table.xlsx"));

        assert!(matches!(
            state,
            LoadState::Failed(LoadError::SourceNotFound { .. })
        ));
    }

    #[test]
    fn corrupt_workbook_is_parse_error() {
        let mut file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"not a workbook").unwrap();
        file.flush().unwrap();

        let state = LoadState::load(file.path());

        assert!(matches!(state, LoadState::Failed(LoadError::Parse { .. })));
    }

    #[test]
    fn unknown_extension_is_parse_error() {
        let file = write_file(".txt", &["식품명,열량", "백미밥,150"]);

        let state = LoadState::load(file.path());
        let LoadState::Failed(LoadError::Parse { detail }) = state else {
            panic!("expected Parse failure");
        };

        assert!(detail.contains("unsupported format"));
    }

    #[test]
    fn csv_cells_get_typed() {
        let file = write_file(".csv", &["식품명,열량,비고", ",150,", "라면,500.5,매움"]);

        let LoadState::Loaded(table) = LoadState::load(file.path()) else {
            panic!("expected Loaded");
        };

        assert_eq!(table.record(0).key(), None);
        assert_eq!(table.record(0).get("비고"), Some(&CellValue::Empty));
        assert_eq!(table.record(1).get("열량"), Some(&CellValue::Float(500.5)));
        assert_eq!(
            table.record(1).get("비고"),
            Some(&CellValue::Text("매움".to_string()))
        );
    }
}
