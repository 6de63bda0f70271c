//! Tabular corpus model
//!
//! A `Table` is the in-memory form of the corpus source: named columns in
//! first-seen order and rows of [`Value`] cells. Hierarchy columns and
//! constraint columns are read through it; every other column rides along
//! on the rows untouched.

pub mod filter;
pub mod value;

pub use filter::HardConstraint;
pub use value::Value;

use indexmap::IndexMap;
use std::io::Read;
use thiserror::Error;

/// One corpus row, keyed by column name in column order
pub type Row = IndexMap<String, Value>;

static NULL: Value = Value::Null;

/// Table errors
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column {column} row {row}: expected a number, found {found}")]
    NotNumeric {
        column: String,
        row: usize,
        found: String,
    },

    #[error("Malformed JSON corpus: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TableResult<T> = Result<T, TableError>;

/// In-memory tabular corpus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with a fixed column set
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from rows; the column set is the union of row keys in first-seen order
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Parse a JSON array of objects
    pub fn from_json_str(json: &str) -> TableResult<Self> {
        let records: Vec<IndexMap<String, serde_json::Value>> = serde_json::from_str(json)?;
        Ok(Self::from_json_records(records))
    }

    /// Read a JSON array of objects from any reader
    pub fn from_reader<R: Read>(reader: R) -> TableResult<Self> {
        let records: Vec<IndexMap<String, serde_json::Value>> = serde_json::from_reader(reader)?;
        Ok(Self::from_json_records(records))
    }

    fn from_json_records(records: Vec<IndexMap<String, serde_json::Value>>) -> Self {
        Self::from_rows(
            records
                .into_iter()
                .map(|record| record.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
                .collect(),
        )
    }

    /// Append a row, registering any new columns it introduces
    pub fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Cell at (row, column); missing cells read as null
    pub fn cell(&self, row: usize, column: &str) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    /// Iterate one column top to bottom
    pub fn column(&self, column: &str) -> TableResult<impl Iterator<Item = &Value> + '_> {
        if !self.has_column(column) {
            return Err(TableError::UnknownColumn(column.to_string()));
        }
        let column = column.to_string();
        Ok(self
            .rows
            .iter()
            .map(move |r| r.get(&column).unwrap_or(&NULL)))
    }

    /// Distinct categorical keys of a column, sorted case-insensitively.
    ///
    /// Keys equal up to case are ordered by their exact spelling so the order is total.
    pub fn distinct_keys(&self, column: &str) -> TableResult<Vec<String>> {
        let mut keys: Vec<String> = self.column(column)?.filter_map(Value::as_key).collect();
        sort_case_insensitive(&mut keys);
        keys.dedup();
        Ok(keys)
    }

    /// Empirical (min, max) over the numeric cells of a column
    pub fn numeric_range(&self, column: &str) -> TableResult<Option<(f64, f64)>> {
        let mut range: Option<(f64, f64)> = None;
        for x in self.column(column)?.filter_map(Value::as_f64) {
            if x.is_nan() {
                continue;
            }
            range = Some(match range {
                None => (x, x),
                Some((lo, hi)) => (lo.min(x), hi.max(x)),
            });
        }
        Ok(range)
    }

    /// Numeric cell that must be present, e.g. a repeat count
    pub fn require_f64(&self, row: usize, column: &str) -> TableResult<f64> {
        let cell = self.cell(row, column);
        cell.as_f64().ok_or_else(|| TableError::NotNumeric {
            column: column.to_string(),
            row,
            found: cell.type_name().to_string(),
        })
    }

    /// Keep the rows matching a predicate, preserving order and columns
    pub fn retain_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

/// Case-insensitive ordering with an exact-spelling tie break
pub fn sort_case_insensitive(keys: &mut [String]) {
    keys.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}

/// Quote a CSV field when it holds a comma, quote or newline
pub fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
