#![cfg(not(tarpaulin_include))]

use crate::error::{Result, SweeperError};
use crate::table::{ColumnType, Table, Value};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use csv::ReaderBuilder;
use log::{info, warn};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

/// Cell texts read as missing values
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "NULL", "null", "#N/A"];

/// Source format of an uploaded file, chosen by extension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Spreadsheet,
}

impl FileKind {
    /// Detect the file kind from a file name (case-insensitive extension)
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(FileKind::Csv),
            Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => Ok(FileKind::Spreadsheet),
            Some(ext) => Err(SweeperError::UnsupportedFile(format!(
                "unsupported file extension: {}",
                ext
            ))),
            None => Err(SweeperError::UnsupportedFile(format!(
                "{} has no extension",
                name
            ))),
        }
    }
}

/// A file handed in by the user, before parsing
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        UploadedFile {
            name: name.into(),
            bytes,
        }
    }

    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }
}

/// Result of loading one uploaded file
#[derive(Debug)]
pub struct LoadOutcome {
    pub name: String,
    pub size_kb: f64,
    pub result: Result<Table>,
}

/// Load a table from CSV bytes
///
/// The first record is the header. Short rows are padded with missing
/// cells; a row wider than the header is an error.
///
/// # Examples
/// ```
/// use sweeper::loader::from_csv_bytes;
/// use sweeper::table::{ColumnType, Value};
///
/// let table = from_csv_bytes(b"id,score\n1,2.5\n2,\n").unwrap();
/// assert_eq!(table.shape(), (2, 2));
/// assert_eq!(table.column_type("score").unwrap(), ColumnType::Float);
/// assert_eq!(table.rows()[1][1], Value::Empty);
/// ```
pub fn from_csv_bytes(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Err(SweeperError::EmptyFile("CSV file has no header row".to_string())),
    };
    let columns = normalize_headers(header.iter().map(str::to_string).collect());
    let width = columns.len();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for (i, record) in records.enumerate() {
        let record = record?;
        if record.len() > width {
            return Err(SweeperError::InvalidTable(format!(
                "line {} has {} fields, expected {}",
                i + 2,
                record.len(),
                width
            )));
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        raw_rows.push(row);
    }

    let types: Vec<ColumnType> = (0..width)
        .map(|c| infer_text_column(raw_rows.iter().map(|row| row[c].as_str())))
        .collect();

    let rows = raw_rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&types)
                .map(|(cell, ty)| parse_cell(cell, *ty))
                .collect()
        })
        .collect();

    Table::new(columns, rows)
}

/// Load a table from a CSV file on disk
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Table> {
    let bytes = std::fs::read(filepath)?;
    from_csv_bytes(&bytes)
}

/// Load a table from the first worksheet of a spreadsheet workbook
///
/// Handles every workbook format the reader detects (xlsx, xlsm, xls,
/// ods). The first row is the header.
pub fn from_excel_bytes(bytes: &[u8]) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SweeperError::EmptyFile("no sheets found in workbook".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;

    let mut sheet_rows = range.rows();
    let header = match sheet_rows.next() {
        Some(row) => row,
        None => return Err(SweeperError::EmptyFile(format!("sheet '{}' is empty", sheet_name))),
    };
    let columns = normalize_headers(header.iter().map(header_text).collect());
    let width = columns.len();

    let mut rows: Vec<Vec<Value>> = sheet_rows
        .map(|row| {
            let mut values: Vec<Value> = row.iter().map(excel_value).collect();
            values.resize(width, Value::Empty);
            values
        })
        .collect();

    for c in 0..width {
        unify_column(&mut rows, c);
    }

    Table::new(columns, rows)
}

/// Load a table from a spreadsheet file on disk
pub fn from_excel(filepath: impl AsRef<Path>) -> Result<Table> {
    let bytes = std::fs::read(filepath)?;
    from_excel_bytes(&bytes)
}

/// Parse uploaded bytes according to the file name's extension
pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<Table> {
    match FileKind::from_name(name)? {
        FileKind::Csv => from_csv_bytes(bytes),
        FileKind::Spreadsheet => from_excel_bytes(bytes),
    }
}

/// Detect file type and load the appropriate format from disk
///
/// # Examples
/// ```no_run
/// use sweeper::loader::load_spreadsheet;
///
/// match load_spreadsheet("data.csv") {
///     Ok(table) => println!("Loaded {} rows", table.shape().0),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_spreadsheet(filepath: impl AsRef<Path>) -> Result<Table> {
    let path = filepath.as_ref();
    let name = path.to_string_lossy();
    match FileKind::from_name(&name)? {
        FileKind::Csv => from_csv(path),
        FileKind::Spreadsheet => from_excel(path),
    }
}

/// Load every uploaded file, collecting one outcome per file
///
/// A file that fails to parse does not stop the others; its error is kept
/// in its own outcome.
pub fn load_uploads(files: impl IntoIterator<Item = UploadedFile>) -> Vec<LoadOutcome> {
    files
        .into_iter()
        .map(|file| {
            let result = load_bytes(&file.name, &file.bytes);
            match &result {
                Ok(table) => {
                    let (rows, cols) = table.shape();
                    info!("Loaded {} ({} rows x {} columns)", file.name, rows, cols);
                }
                Err(e) => warn!("Error loading {}: {}", file.name, e),
            }
            LoadOutcome {
                size_kb: file.size_kb(),
                name: file.name,
                result,
            }
        })
        .collect()
}

/// Fill blank header cells and make repeated names unique
///
/// Blank headers become `Unnamed: {index}`; repeats become `name.1`,
/// `name.2`, and so on.
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(raw.len());

    for (i, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while used.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        used.insert(candidate.clone());
        result.push(candidate);
    }

    result
}

fn is_missing_marker(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

// Infer a column type from raw CSV cell texts
fn infer_text_column<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut seen = false;
    let mut all_int = true;
    let mut all_numeric = true;
    let mut all_bool = true;

    for cell in cells.filter(|c| !is_missing_marker(c)) {
        seen = true;
        let trimmed = cell.trim();
        if all_int && trimmed.parse::<i64>().is_err() {
            all_int = false;
        }
        if all_numeric && trimmed.parse::<f64>().is_err() {
            all_numeric = false;
        }
        if all_bool && parse_bool(trimmed).is_none() {
            all_bool = false;
        }
        if !all_int && !all_numeric && !all_bool {
            return ColumnType::Text;
        }
    }

    if !seen {
        ColumnType::Empty
    } else if all_int {
        ColumnType::Integer
    } else if all_numeric {
        ColumnType::Float
    } else if all_bool {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}

fn parse_cell(cell: &str, column_type: ColumnType) -> Value {
    if is_missing_marker(cell) {
        return Value::Empty;
    }
    let trimmed = cell.trim();
    match column_type {
        ColumnType::Integer => trimmed.parse().map(Value::Int).unwrap_or(Value::Empty),
        ColumnType::Float => trimmed.parse().map(Value::Float).unwrap_or(Value::Empty),
        ColumnType::Boolean => parse_bool(trimmed).map(Value::Bool).unwrap_or(Value::Empty),
        ColumnType::Text => Value::Text(cell.to_string()),
        ColumnType::Empty => Value::Empty,
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn excel_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Empty,
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if is_missing_marker(s) => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

// Workbooks store every number as a float; columns of whole numbers come
// back as integers and mixed columns fall back to text.
fn unify_column(rows: &mut [Vec<Value>], c: usize) {
    let column_type = ColumnType::infer(rows.iter().map(|row| &row[c]));
    let all_whole = rows.iter().all(|row| match &row[c] {
        Value::Float(f) => f.is_nan() || (f.fract() == 0.0 && f.abs() < 9.0e15),
        _ => true,
    });

    for row in rows.iter_mut() {
        let cell = &mut row[c];
        if cell.is_missing() {
            *cell = Value::Empty;
            continue;
        }
        match column_type {
            ColumnType::Float if all_whole => {
                if let Value::Float(f) = *cell {
                    *cell = Value::Int(f as i64);
                }
            }
            ColumnType::Float => {
                if let Value::Int(i) = *cell {
                    *cell = Value::Float(i as f64);
                }
            }
            ColumnType::Text => {
                if !matches!(cell, Value::Text(_)) {
                    *cell = Value::Text(cell.to_string());
                }
            }
            _ => {}
        }
    }
}
