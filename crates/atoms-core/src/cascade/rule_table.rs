//! Rule table infrastructure for the correction cascade.
//!
//! # Architecture
//!
//! - `CascadeRule` - Trait for individual correction/enrichment rules
//! - `RuleMetadata` - Rule id, phase, targets and required auxiliary data
//! - `RuleContext` - What a rule may consult while it runs
//! - `RuleEffect` - Change count and findings returned by a rule
//! - `AuxiliaryData` - Already-loaded tables offered to dependent rules

use std::collections::BTreeMap;

use atoms_model::{Period, RecordTable, RulePhase, Subtype};

use crate::error::RuleError;
use crate::incidence::Finding;
use crate::run_context::RunContext;

/// Metadata about a cascade rule.
#[derive(Debug, Clone)]
pub struct RuleMetadata {
    /// Unique rule identifier, also the rule name in incidences.
    pub id: String,
    pub phase: RulePhase,
    /// Human-readable description.
    pub description: String,
    /// Columns this rule may rewrite.
    pub target_columns: Vec<String>,
    /// Auxiliary datasets that must be present and non-empty.
    pub requires: Vec<String>,
    /// A failure of a critical rule fails the whole subtype.
    pub critical: bool,
}

impl RuleMetadata {
    /// Create new rule metadata.
    pub fn new(id: impl Into<String>, phase: RulePhase, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phase,
            description: description.into(),
            target_columns: Vec::new(),
            requires: Vec::new(),
            critical: false,
        }
    }

    /// Set target columns.
    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.target_columns = targets.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Declare required auxiliary datasets.
    pub fn requires(mut self, datasets: &[&str]) -> Self {
        self.requires = datasets.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// Tables loaded for the run, by subtype name.
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryData {
    tables: BTreeMap<String, RecordTable>,
}

impl AuxiliaryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: RecordTable) {
        let name: String = name.into();
        self.tables.insert(name.trim().to_ascii_uppercase(), table);
    }

    pub fn get(&self, name: &str) -> Option<&RecordTable> {
        self.tables.get(&name.trim().to_ascii_uppercase())
    }

    /// Present and holding at least one row.
    pub fn is_available(&self, name: &str) -> bool {
        self.get(name).is_some_and(|table| !table.is_empty())
    }

    /// The entries of `required` that are absent or empty.
    pub fn missing(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.is_available(name))
            .cloned()
            .collect()
    }

    /// Table a dependent rule declared in its metadata.
    pub fn require(&self, name: &str) -> Result<&RecordTable, RuleError> {
        self.get(name).ok_or_else(|| RuleError::MissingDataset {
            name: name.to_string(),
        })
    }
}

/// What a rule can see while it runs.
pub struct RuleContext<'a> {
    pub subtype: &'a Subtype,
    pub auxiliary: &'a AuxiliaryData,
    pub run: &'a mut RunContext,
}

impl RuleContext<'_> {
    pub fn period(&self) -> Period {
        self.run.period()
    }
}

/// Result of a successful rule invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleEffect {
    /// Cells rewritten or rows removed.
    pub changes: usize,
    pub findings: Vec<Finding>,
}

impl RuleEffect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a change that is not reported as an incidence.
    pub fn changed(&mut self) {
        self.changes += 1;
    }

    /// Count a change and report it.
    pub fn corrected(&mut self, finding: Finding) {
        self.changes += 1;
        self.findings.push(finding);
    }

    /// Report without counting a change.
    pub fn flagged(&mut self, finding: Finding) {
        self.findings.push(finding);
    }
}

/// Trait for individual cascade rules.
///
/// Rules run strictly in order on a working copy of the table. A rule
/// must not add, remove or reorder columns.
pub trait CascadeRule: Send + Sync {
    /// Get the rule metadata.
    fn metadata(&self) -> &RuleMetadata;

    /// Check if this rule should run on `table` at all.
    fn should_apply(&self, _table: &RecordTable) -> bool {
        true
    }

    /// Apply the rule to the table.
    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError>;
}
