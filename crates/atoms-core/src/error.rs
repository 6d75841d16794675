//! Error types for the correction engine.

use std::path::PathBuf;

use atoms_ingest::IngestError;
use atoms_map::MapError;
use atoms_model::ModelError;
use atoms_standards::StandardsError;

/// Errors raised while running a period.
///
/// Everything except [`CoreError::NoInputs`] and the setup variants is caught
/// by the orchestrator and turned into a failed subtype entry.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Standards(#[from] StandardsError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("critical rule {rule} failed for {subtype}: {message}")]
    CriticalRule {
        rule: String,
        subtype: String,
        message: String,
    },

    #[error("rule {rule} changed the column set of {subtype}: {source}")]
    ColumnSetChanged {
        rule: String,
        subtype: String,
        #[source]
        source: ModelError,
    },

    #[error("no input files for period {period} in {dir}")]
    NoInputs { period: String, dir: PathBuf },

    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Failures while persisting a sequence registry.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("failed to {operation} sequence state {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to replace {target_path} with {temp_path}: {source}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode sequence state {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Error returned by a single rule. The cascade turns it into a failed
/// outcome and carries on with the unmodified table.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("required column {column} not found in {table}")]
    MissingColumn { table: String, column: String },

    #[error("auxiliary dataset {name} is not loaded")]
    MissingDataset { name: String },

    #[error("record {index}: {message}")]
    Record { index: usize, message: String },

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl RuleError {
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Row the failure refers to, when the rule knows it.
    pub fn record_index(&self) -> Option<usize> {
        match self {
            Self::Record { index, .. } => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_error_reports_record_index() {
        let err = RuleError::Record {
            index: 4,
            message: "bad value".to_string(),
        };
        assert_eq!(err.record_index(), Some(4));
        assert_eq!(err.to_string(), "record 4: bad value");
        assert_eq!(
            RuleError::missing_column("BASE_AT12", "Tipo_Poliza").record_index(),
            None
        );
    }
}
