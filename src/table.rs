use crate::error::{Result, SweeperError};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A single cell of a tabular dataset
///
/// Serializes without a tag so a preview row renders as plain JSON
/// (`null`, numbers, booleans and strings).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing cell
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Whether the cell counts as missing (empty or a NaN float)
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of the cell, `None` for missing and non-numeric cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Format a float so that it always reads back as a float
///
/// Whole numbers keep a trailing `.0` (`2.0` rather than `2`), which keeps a
/// float column a float column after a CSV round trip.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Column type inferred from the non-missing cells of a column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    /// Every cell is missing
    Empty,
}

impl ColumnType {
    /// Numeric columns take part in mean-fill and charting
    ///
    /// An all-missing column counts as numeric; its mean is undefined so
    /// filling it is a no-op.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float | ColumnType::Empty)
    }

    /// Infer the type of a column from its cells
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut seen = false;
        let mut all_int = true;
        let mut all_numeric = true;
        let mut all_bool = true;

        for cell in cells.into_iter().filter(|c| !c.is_missing()) {
            seen = true;
            match cell {
                Value::Int(_) => all_bool = false,
                Value::Float(_) => {
                    all_int = false;
                    all_bool = false;
                }
                Value::Bool(_) => {
                    all_int = false;
                    all_numeric = false;
                }
                _ => {
                    all_int = false;
                    all_numeric = false;
                    all_bool = false;
                }
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
}

/// In-memory table of rows and named columns
///
/// Every row holds exactly one value per column. The column set only
/// changes through [`Table::select`].
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table from column names and rows
    ///
    /// # Arguments
    /// * `columns` - Column names, which must be unique
    /// * `rows` - Row values, each exactly `columns.len()` wide
    ///
    /// # Returns
    /// * `Result<Table>` - The table, or `InvalidTable` when a row has the
    ///   wrong width or a column name repeats
    ///
    /// # Examples
    /// ```
    /// use sweeper::table::{Table, Value};
    ///
    /// let table = Table::new(
    ///     vec!["name".to_string(), "age".to_string()],
    ///     vec![vec![Value::Text("ada".to_string()), Value::Int(36)]],
    /// )
    /// .unwrap();
    /// assert_eq!(table.shape(), (1, 2));
    /// ```
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(SweeperError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SweeperError::InvalidTable(format!(
                    "row {} has {} values, expected {}",
                    i + 1,
                    row.len(),
                    columns.len()
                )));
            }
        }

        Ok(Table { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }

    /// (row count, column count)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The first `n` rows as a new table
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Inferred type of the column at `index`
    pub fn column_type_at(&self, index: usize) -> ColumnType {
        ColumnType::infer(self.rows.iter().map(|row| &row[index]))
    }

    /// Inferred type of a named column
    pub fn column_type(&self, name: &str) -> Result<ColumnType> {
        let index = self
            .column_index(name)
            .ok_or_else(|| SweeperError::UnknownColumn(name.to_string()))?;
        Ok(self.column_type_at(index))
    }

    /// Names of the numeric columns, in table order
    pub fn numeric_columns(&self) -> Vec<String> {
        (0..self.columns.len())
            .filter(|&i| self.column_type_at(i).is_numeric())
            .map(|i| self.columns[i].clone())
            .collect()
    }

    /// All values of a named column, top to bottom
    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>> {
        let index = self
            .column_index(name)
            .ok_or_else(|| SweeperError::UnknownColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Project the table onto a subset of its columns
    ///
    /// Columns come out in the order given. An empty selection keeps every
    /// column, and a name listed twice is only taken once.
    ///
    /// # Arguments
    /// * `names` - Columns to keep
    ///
    /// # Returns
    /// * `Result<Table>` - The projected table, or `UnknownColumn`
    ///
    /// # Examples
    /// ```
    /// use sweeper::table::{Table, Value};
    ///
    /// let table = Table::new(
    ///     vec!["a".to_string(), "b".to_string()],
    ///     vec![vec![Value::Int(1), Value::Int(2)]],
    /// )
    /// .unwrap();
    /// let only_b = table.select(&["b"]).unwrap();
    /// assert_eq!(only_b.columns(), &["b".to_string()]);
    /// assert!(table.select(&["c"]).is_err());
    /// ```
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        if names.is_empty() {
            return Ok(self.clone());
        }

        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let index = self
                .column_index(name)
                .ok_or_else(|| SweeperError::UnknownColumn(name.to_string()))?;
            if !indices.contains(&index) {
                indices.push(index);
            }
        }

        Ok(Table {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }
}
