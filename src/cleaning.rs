use crate::table::{Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which cleaning steps to run
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CleaningOptions {
    #[serde(default)]
    pub remove_duplicates: bool,
    #[serde(default)]
    pub fill_missing: bool,
}

/// What a cleaning pass changed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub duplicates_removed: usize,
    pub cells_filled: usize,
}

// Hashable stand-in for a cell. Whole floats share a key with the equal
// integer, and every missing cell shares one key.
#[derive(Hash, PartialEq, Eq)]
enum CellKey<'a> {
    Missing,
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(&'a str),
}

fn cell_key(value: &Value) -> CellKey<'_> {
    match value {
        Value::Empty => CellKey::Missing,
        Value::Float(f) if f.is_nan() => CellKey::Missing,
        Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => CellKey::Int(*f as i64),
        // -0.0 and 0.0 are caught above, so the bit pattern is canonical here
        Value::Float(f) => CellKey::Float(f.to_bits()),
        Value::Int(i) => CellKey::Int(*i),
        Value::Bool(b) => CellKey::Bool(*b),
        Value::Text(s) => CellKey::Text(s),
    }
}

/// Remove rows equal to an earlier row, keeping the first occurrence
///
/// Missing cells compare equal to each other. Running it twice gives the
/// same table as running it once.
///
/// # Returns
/// * `usize` - Number of rows removed
///
/// # Examples
/// ```
/// use sweeper::cleaning::drop_duplicates;
/// use sweeper::loader::from_csv_bytes;
///
/// let mut table = from_csv_bytes(b"a,b\n1,x\n1,x\n2,y\n").unwrap();
/// assert_eq!(drop_duplicates(&mut table), 1);
/// assert_eq!(table.shape(), (2, 2));
/// ```
pub fn drop_duplicates(table: &mut Table) -> usize {
    let rows = std::mem::take(table.rows_mut());
    let before = rows.len();

    let mut kept = Vec::with_capacity(rows.len());
    {
        let mut seen: HashSet<Vec<CellKey<'_>>> = HashSet::new();
        for (i, row) in rows.iter().enumerate() {
            if seen.insert(row.iter().map(cell_key).collect()) {
                kept.push(i);
            }
        }
    }

    let mut kept = kept.into_iter().peekable();
    *table.rows_mut() = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            if kept.peek() == Some(&i) {
                kept.next();
                Some(row)
            } else {
                None
            }
        })
        .collect();

    before - table.rows().len()
}

/// Fill missing cells of numeric columns with the column mean
///
/// The mean is taken over the non-missing values present when this runs.
/// Non-missing cells are never changed and non-numeric columns are never
/// touched. Columns with no values at all are left as they are.
///
/// # Returns
/// * `usize` - Number of cells filled
pub fn fill_missing_with_mean(table: &mut Table) -> usize {
    let numeric: Vec<usize> = (0..table.columns().len())
        .filter(|&c| table.column_type_at(c).is_numeric())
        .collect();

    let mut filled = 0;
    for c in numeric {
        let (sum, count) = table
            .rows()
            .iter()
            .filter_map(|row| row[c].as_f64())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

        if count == 0 {
            continue;
        }
        let mean = sum / count as f64;

        for row in table.rows_mut().iter_mut() {
            if row[c].is_missing() {
                row[c] = Value::Float(mean);
                filled += 1;
            }
        }
    }

    filled
}

/// Run the selected cleaning steps, duplicates first
///
/// # Arguments
/// * `table` - Table cleaned in place
/// * `options` - Which steps to run
///
/// # Returns
/// * `CleaningReport` - Rows removed and cells filled
pub fn apply_cleaning(table: &mut Table, options: CleaningOptions) -> CleaningReport {
    let mut report = CleaningReport::default();
    if options.remove_duplicates {
        report.duplicates_removed = drop_duplicates(table);
    }
    if options.fill_missing {
        report.cells_filled = fill_missing_with_mean(table);
    }
    report
}
