//! Join keys.
//!
//! Every join-based rule normalizes both sides with [`normalize_key`]; a key
//! that normalizes to nothing is missing and never matches anything,
//! including another missing key.

use std::collections::HashMap;

use atoms_model::RecordTable;
use chrono::NaiveDate;

use crate::dates::parse_date;
use crate::error::RuleError;

/// Digits only, leading zeros removed. `None` when nothing is left.
pub fn normalize_key(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        None
    } else {
        Some(significant.to_string())
    }
}

/// Natural key made of several raw fields, each trimmed.
pub fn composite_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .collect::<Vec<_>>()
        .join("|")
}

/// Which auxiliary row wins when several share one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TieBreak {
    /// Earliest row in table order.
    First,
    /// Row with the most recent date in `column`; unparseable dates lose and
    /// equal dates keep the earlier row.
    LatestDate(String),
}

/// One row per normalized key over an auxiliary table.
#[derive(Debug)]
pub struct JoinIndex<'a> {
    table: &'a RecordTable,
    rows: HashMap<String, usize>,
}

impl<'a> JoinIndex<'a> {
    /// Index `table` by `key_column`, resolving duplicates with `tie_break`.
    ///
    /// `name` identifies the table in errors.
    pub fn build(
        name: &str,
        table: &'a RecordTable,
        key_column: &str,
        tie_break: &TieBreak,
    ) -> Result<Self, RuleError> {
        let key_col = table
            .resolve_column(key_column)
            .ok_or_else(|| RuleError::missing_column(name, key_column))?;
        let date_col = match tie_break {
            TieBreak::First => None,
            TieBreak::LatestDate(column) => Some(
                table
                    .resolve_column(column)
                    .ok_or_else(|| RuleError::missing_column(name, column.as_str()))?,
            ),
        };

        let mut rows: HashMap<String, usize> = HashMap::new();
        let mut dates: HashMap<String, Option<NaiveDate>> = HashMap::new();
        for (idx, row) in table.rows().iter().enumerate() {
            let Some(key) = normalize_key(&row[key_col]) else {
                continue;
            };
            match date_col {
                None => {
                    rows.entry(key).or_insert(idx);
                }
                Some(col) => {
                    let date = parse_date(&row[col]);
                    let newer = match dates.get(&key) {
                        None => true,
                        Some(current) => date > *current,
                    };
                    if newer {
                        dates.insert(key.clone(), date);
                        rows.insert(key, idx);
                    }
                }
            }
        }
        Ok(Self { table, rows })
    }

    /// Row matching the raw `key`, normalized the same way as the index.
    pub fn lookup(&self, key: &str) -> Option<usize> {
        normalize_key(key).and_then(|key| self.rows.get(&key).copied())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Value of `column` in the row matching `key`.
    pub fn value(&self, key: &str, column: usize) -> Option<&'a str> {
        let table = self.table;
        self.lookup(key).and_then(|row| table.cell(row, column))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
