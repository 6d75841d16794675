#![deny(unsafe_code)]

use std::collections::HashSet;

use crate::ModelError;
use crate::lookup::column_key;

/// Rectangular table of string cells with ordered, unique column names.
///
/// Every row has exactly `columns.len()` cells. Cells are never typed:
/// zero-padded identifiers and `YYYYMMDD` dates must survive untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordTable {
    /// Empty table. Duplicate names are silently dropped, keeping the first.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let columns = columns
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| seen.insert(name.clone()))
            .collect();
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ModelError> {
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(ModelError::DuplicateColumn(name.clone()));
            }
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ModelError::RowWidth {
                    row: idx,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), ModelError> {
        if row.len() != self.columns.len() {
            return Err(ModelError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Exact position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Position of a column by exact name, falling back to the folded
    /// comparison key so `Numero_Garantia` finds `Número_Garantía`.
    pub fn resolve_column(&self, name: &str) -> Option<usize> {
        self.column_index(name).or_else(|| {
            let key = column_key(name);
            self.columns
                .iter()
                .position(|column| column_key(column) == key)
        })
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }

    /// Cell by column name (resolved with [`RecordTable::resolve_column`]).
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        self.resolve_column(column)
            .and_then(|col| self.cell(row, col))
    }

    /// Overwrite a cell, returning the previous value.
    pub fn set_cell(
        &mut self,
        row: usize,
        column: usize,
        value: impl Into<String>,
    ) -> Option<String> {
        let cell = self.rows.get_mut(row)?.get_mut(column)?;
        Some(std::mem::replace(cell, value.into()))
    }

    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).map_or("", String::as_str))
    }

    /// Keep only rows for which `keep(index, row)` is true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &[String]) -> bool,
    {
        let rows = std::mem::take(&mut self.rows);
        self.rows = rows
            .into_iter()
            .enumerate()
            .filter(|(idx, row)| keep(*idx, row))
            .map(|(_, row)| row)
            .collect();
    }

    /// Assert the column list is exactly `expected`, in order.
    pub fn ensure_columns(&self, expected: &[String]) -> Result<(), ModelError> {
        if self.columns == expected {
            return Ok(());
        }
        Err(ModelError::ColumnSetMismatch {
            expected: expected.join(", "),
            actual: self.columns.join(", "),
        })
    }
}
