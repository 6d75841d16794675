use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::incidence::IncidenceSummary;

/// Cascade phase a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePhase {
    /// Needs no auxiliary data; always runs.
    Independent,
    /// Runs only when every required auxiliary dataset is present and non-empty.
    Dependent,
}

impl fmt::Display for RulePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Independent => "A",
            Self::Dependent => "B",
        })
    }
}

/// Result of one rule invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RuleOutcome {
    Applied { changes: usize },
    Skipped { reason: String },
    Failed { error: String },
}

impl RuleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReport {
    pub rule: String,
    pub phase: RulePhase,
    pub outcome: RuleOutcome,
    pub incidences: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtypeRole {
    /// Cascaded, exported and consolidated.
    Primary,
    /// Standardized and offered to rules as join input.
    Auxiliary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubtypeStatus {
    Completed,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtypeSummary {
    pub subtype: String,
    pub role: SubtypeRole,
    pub status: SubtypeStatus,
    pub input_rows: usize,
    pub output_rows: usize,
    pub added_columns: Vec<String>,
    pub dropped_columns: Vec<String>,
    pub rules: Vec<RuleReport>,
    pub incidences: usize,
    pub output_path: Option<PathBuf>,
}

impl SubtypeSummary {
    pub fn new(subtype: impl Into<String>, role: SubtypeRole) -> Self {
        Self {
            subtype: subtype.into(),
            role,
            status: SubtypeStatus::Completed,
            input_rows: 0,
            output_rows: 0,
            added_columns: Vec::new(),
            dropped_columns: Vec::new(),
            rules: Vec::new(),
            incidences: 0,
            output_path: None,
        }
    }

    pub fn failed(subtype: impl Into<String>, role: SubtypeRole, reason: impl Into<String>) -> Self {
        let mut summary = Self::new(subtype, role);
        summary.status = SubtypeStatus::Failed {
            reason: reason.into(),
        };
        summary
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SubtypeStatus::Failed { .. })
    }

    pub fn rule_count(&self, label: &str) -> usize {
        self.rules
            .iter()
            .filter(|report| report.outcome.label() == label)
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub period: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub subtypes: Vec<SubtypeSummary>,
    pub incidences: IncidenceSummary,
    pub consolidated_path: Option<PathBuf>,
}

impl RunSummary {
    pub fn failed_subtypes(&self) -> impl Iterator<Item = &SubtypeSummary> {
        self.subtypes.iter().filter(|summary| summary.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failed_subtypes().next().is_some()
    }

    pub fn subtype(&self, name: &str) -> Option<&SubtypeSummary> {
        self.subtypes.iter().find(|summary| summary.subtype == name)
    }
}
