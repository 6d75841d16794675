//! Core data types shared by the atoms workspace.
//!
//! Nothing in this crate performs I/O. It defines the string-typed
//! [`RecordTable`] every stage passes around, the identifiers for subtypes and
//! reporting periods, the audit [`Incidence`] record and the run summary types.

pub mod error;
pub mod ids;
pub mod incidence;
pub mod lookup;
pub mod processing;
pub mod table;

pub use error::{ModelError, Result};
pub use ids::{Period, Subtype};
pub use incidence::{Incidence, IncidenceSummary, IncidenceType, Resolution, Severity};
pub use lookup::{ColumnLookup, column_key, fold_accents};
pub use processing::{
    RuleOutcome, RulePhase, RuleReport, RunSummary, SubtypeRole, SubtypeStatus, SubtypeSummary,
};
pub use table::RecordTable;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_summary_counts_rules() {
        let mut summary = SubtypeSummary::new("BASE_AT12", SubtypeRole::Primary);
        summary.rules = vec![
            RuleReport {
                rule: "WHITESPACE".to_string(),
                phase: RulePhase::Independent,
                outcome: RuleOutcome::Applied { changes: 3 },
                incidences: 3,
            },
            RuleReport {
                rule: "PROPERTY_POLICY".to_string(),
                phase: RulePhase::Dependent,
                outcome: RuleOutcome::Skipped {
                    reason: "missing POLIZA_HIPOTECAS_AT12".to_string(),
                },
                incidences: 0,
            },
        ];
        assert_eq!(summary.rule_count("applied"), 1);
        assert_eq!(summary.rule_count("skipped"), 1);
        assert_eq!(summary.rule_count("failed"), 0);
        assert!(!summary.is_failed());
    }
}
