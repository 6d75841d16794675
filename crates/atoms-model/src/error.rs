use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid subtype: {0:?}")]
    InvalidSubtype(String),
    #[error("invalid period {0:?}, expected YYYYMM or YYYYMMDD")]
    InvalidPeriod(String),
    #[error("duplicate column {0:?}")]
    DuplicateColumn(String),
    #[error("row {row} has {actual} cells, table has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("column set changed: expected [{expected}], found [{actual}]")]
    ColumnSetMismatch { expected: String, actual: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
