#![cfg(not(tarpaulin_include))]

use crate::error::{Result, SweeperError};
use crate::table::{Table, Value};
use csv::WriterBuilder;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CSV_MIME: &str = "text/csv";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Target format for a converted download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[serde(alias = "xlsx")]
    Excel,
}

impl ExportFormat {
    /// File extension including the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => ".csv",
            ExportFormat::Excel => ".xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_MIME,
            ExportFormat::Excel => XLSX_MIME,
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = SweeperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            other => Err(SweeperError::Validation(format!(
                "unknown export format '{}', expected csv or excel",
                other
            ))),
        }
    }
}

/// A converted file ready to be offered as a download
#[derive(Clone, Debug)]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Convert a table to CSV
///
/// Writes a header row followed by the data rows, without an index column.
/// Fields containing commas, quotes or newlines are quoted.
///
/// # Examples
/// ```
/// use sweeper::downloader::to_csv;
/// use sweeper::table::{Table, Value};
///
/// let table = Table::new(
///     vec!["name".to_string(), "score".to_string()],
///     vec![vec![Value::Text("a, b".to_string()), Value::Float(2.0)]],
/// )
/// .unwrap();
/// let csv = String::from_utf8(to_csv(&table).unwrap()).unwrap();
/// assert_eq!(csv, "name,score\n\"a, b\",2.0\n");
/// ```
pub fn to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| SweeperError::Io(e.into_error()))
}

/// Convert a table to XLSX
///
/// The header row is written as strings; numbers, booleans and text keep
/// their cell types. Missing cells and infinite floats stay blank.
///
/// # Arguments
/// * `table` - Table to convert
///
/// # Returns
/// * `Result<Vec<u8>>` - Workbook bytes with a single worksheet
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (c, name) in table.columns().iter().enumerate() {
        worksheet.write_string(0, c as u16, name)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let excel_col = c as u16;
            match value {
                Value::Empty => {}
                Value::Int(i) => {
                    worksheet.write_number(excel_row, excel_col, *i as f64)?;
                }
                // XLSX has no NaN or infinity
                Value::Float(f) if !f.is_finite() => {}
                Value::Float(f) => {
                    worksheet.write_number(excel_row, excel_col, *f)?;
                }
                Value::Bool(b) => {
                    worksheet.write_boolean(excel_row, excel_col, *b)?;
                }
                Value::Text(s) => {
                    worksheet.write_string(excel_row, excel_col, s)?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Name of the converted file: the upload's name with its extension swapped
///
/// # Examples
/// ```
/// use sweeper::downloader::{ExportFormat, export_file_name};
///
/// assert_eq!(export_file_name("sales.csv", ExportFormat::Excel), "sales.xlsx");
/// assert_eq!(export_file_name("q1.data.XLSX", ExportFormat::Csv), "q1.data.csv");
/// assert_eq!(export_file_name("notes", ExportFormat::Csv), "notes.csv");
/// ```
pub fn export_file_name(original: &str, format: ExportFormat) -> String {
    let stem = match Path::new(original).extension().and_then(|e| e.to_str()) {
        Some(ext) => &original[..original.len() - ext.len() - 1],
        None => original,
    };
    format!("{}{}", stem, format.extension())
}

/// Encode a table in the chosen format, named after the uploaded file
///
/// # Arguments
/// * `table` - Table to encode
/// * `original_name` - Name of the uploaded file the table came from
/// * `format` - Target format
///
/// # Returns
/// * `Result<Download>` - Encoded bytes with their file name and MIME type
pub fn export(table: &Table, original_name: &str, format: ExportFormat) -> Result<Download> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(table)?,
        ExportFormat::Excel => to_xlsx(table)?,
    };

    Ok(Download {
        file_name: export_file_name(original_name, format),
        mime_type: format.mime_type(),
        bytes,
    })
}
