//! Where a run writes its files.
//!
//! Everything lives below `output_dir/{period}/`:
//!
//! ```text
//! processed/AT12_{subtype}_{period}.csv
//! processed/MAPPING_{subtype}_{period}.json
//! incidencias/EEOO_TABULAR_{group}_AT12_{period}.csv
//! incidencias/INCIDENCES_SUMMARY_{period}.json
//! consolidated/AT12_Cobis_{period}__run-{run_id}.TXT
//! RUN_SUMMARY_{period}__run-{run_id}.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{CoreError, Result};

pub const PROCESSED_DIR: &str = "processed";
pub const INCIDENCES_DIR: &str = "incidencias";
pub const CONSOLIDATED_DIR: &str = "consolidated";

/// Output paths of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    period: String,
    run_id: String,
}

impl OutputLayout {
    pub fn new(output_dir: &Path, period: impl Into<String>, run_id: impl Into<String>) -> Self {
        let period = period.into();
        Self {
            root: output_dir.join(&period),
            period,
            run_id: run_id.into(),
        }
    }

    /// `output_dir/{period}`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn processed_table(&self, subtype: &str) -> PathBuf {
        self.root
            .join(PROCESSED_DIR)
            .join(format!("AT12_{subtype}_{}.csv", self.period))
    }

    pub fn mapping_report(&self, subtype: &str) -> PathBuf {
        self.root
            .join(PROCESSED_DIR)
            .join(format!("MAPPING_{subtype}_{}.json", self.period))
    }

    pub fn incidence_table(&self, group: &str) -> PathBuf {
        self.root
            .join(INCIDENCES_DIR)
            .join(format!("EEOO_TABULAR_{}_AT12_{}.csv", file_token(group), self.period))
    }

    pub fn incidence_summary(&self) -> PathBuf {
        self.root
            .join(INCIDENCES_DIR)
            .join(format!("INCIDENCES_SUMMARY_{}.json", self.period))
    }

    pub fn consolidated(&self) -> PathBuf {
        self.root.join(CONSOLIDATED_DIR).join(format!(
            "AT12_Cobis_{}__run-{}.TXT",
            self.period, self.run_id
        ))
    }

    pub fn run_summary(&self) -> PathBuf {
        self.root.join(format!(
            "RUN_SUMMARY_{}__run-{}.json",
            self.period, self.run_id
        ))
    }
}

/// Group names become part of a filename.
fn file_token(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Ensure a parent directory exists for a file path.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| CoreError::io("create directory", parent, e))?;
    }
    Ok(())
}

/// Write `value` as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let text = serde_json::to_string_pretty(value).map_err(|source| CoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|e| CoreError::io("write", path, e))?;
    tracing::debug!(path = %path.display(), "wrote json");
    Ok(())
}
