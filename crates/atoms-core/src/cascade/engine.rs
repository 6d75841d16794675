//! Cascade execution.
//!
//! Phase A (independent) rules always run; phase B (dependent) rules run
//! only when every auxiliary dataset they require is present and non-empty,
//! and are skipped otherwise. Each rule works on a copy of the table that is
//! committed only when the rule succeeds, so a failed rule leaves the table
//! exactly as the previous rule produced it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use atoms_model::{RecordTable, RuleOutcome, RulePhase, RuleReport, Subtype};

use crate::error::{CoreError, Result};
use crate::incidence::IncidenceRecorder;
use crate::run_context::RunContext;

use super::rule_table::{AuxiliaryData, CascadeRule, RuleContext, RuleMetadata};

/// Ordered rules for one subtype.
pub struct SubtypeCascade {
    subtype: Subtype,
    rules: Vec<Arc<dyn CascadeRule>>,
    disabled_rules: HashSet<String>,
}

impl SubtypeCascade {
    pub fn new(subtype: Subtype) -> Self {
        Self {
            subtype,
            rules: Vec::new(),
            disabled_rules: HashSet::new(),
        }
    }

    pub fn subtype(&self) -> &Subtype {
        &self.subtype
    }

    /// Add a rule at the end of its phase.
    pub fn add_rule(&mut self, rule: Arc<dyn CascadeRule>) {
        self.rules.push(rule);
    }

    /// Disable a rule by ID.
    pub fn disable_rule(&mut self, rule_id: &str) {
        self.disabled_rules.insert(rule_id.to_string());
    }

    fn is_disabled(&self, meta: &RuleMetadata) -> bool {
        self.disabled_rules.contains(&meta.id)
    }

    /// Rules in execution order: phase A, then phase B, each in insertion order.
    pub fn ordered_rules(&self) -> impl Iterator<Item = &Arc<dyn CascadeRule>> {
        let phase = |wanted: RulePhase| {
            self.rules
                .iter()
                .filter(move |rule| rule.metadata().phase == wanted)
        };
        phase(RulePhase::Independent).chain(phase(RulePhase::Dependent))
    }

    /// Get all rule metadata in execution order.
    pub fn rule_metadata(&self) -> Vec<&RuleMetadata> {
        self.ordered_rules().map(|rule| rule.metadata()).collect()
    }

    /// Run every rule over `table`, recording the findings of applied rules.
    ///
    /// Returns one report per rule. Only a failing critical rule or a rule
    /// that changes the column set is an error.
    pub fn run(
        &self,
        table: &mut RecordTable,
        auxiliary: &AuxiliaryData,
        run: &mut RunContext,
        recorder: &mut IncidenceRecorder,
    ) -> Result<Vec<RuleReport>> {
        let mut reports = Vec::with_capacity(self.rules.len());
        for rule in self.ordered_rules() {
            let meta = rule.metadata();
            let span = tracing::debug_span!("rule", rule = %meta.id);
            let _enter = span.enter();

            let (outcome, incidences) = if self.is_disabled(meta) {
                tracing::debug!("rule disabled");
                (skipped("disabled"), 0)
            } else if let Some(reason) = unmet_dependencies(meta, auxiliary) {
                tracing::warn!(
                    subtype = %self.subtype,
                    rule = %meta.id,
                    reason = %reason,
                    "skipping dependent rule"
                );
                (skipped(reason), 0)
            } else if !rule.should_apply(table) {
                (skipped("not applicable"), 0)
            } else {
                self.execute(rule.as_ref(), table, auxiliary, run, recorder)?
            };

            reports.push(RuleReport {
                rule: meta.id.clone(),
                phase: meta.phase,
                outcome,
                incidences,
            });
        }
        Ok(reports)
    }

    fn execute(
        &self,
        rule: &dyn CascadeRule,
        table: &mut RecordTable,
        auxiliary: &AuxiliaryData,
        run: &mut RunContext,
        recorder: &mut IncidenceRecorder,
    ) -> Result<(RuleOutcome, usize)> {
        let meta = rule.metadata();
        let mut working = table.clone();
        let mut ctx = RuleContext {
            subtype: &self.subtype,
            auxiliary,
            run,
        };

        match rule.apply(&mut ctx, &mut working) {
            Ok(effect) => {
                working
                    .ensure_columns(table.columns())
                    .map_err(|source| CoreError::ColumnSetChanged {
                        rule: meta.id.clone(),
                        subtype: self.subtype.to_string(),
                        source,
                    })?;
                *table = working;
                let incidences = effect.findings.len();
                for finding in effect.findings {
                    recorder.record(self.subtype.as_str(), &meta.id, finding);
                }
                tracing::debug!(changes = effect.changes, incidences, "rule applied");
                Ok((
                    RuleOutcome::Applied {
                        changes: effect.changes,
                    },
                    incidences,
                ))
            }
            Err(err) => {
                tracing::error!(
                    subtype = %self.subtype,
                    rule = %meta.id,
                    record_index = ?err.record_index(),
                    error = %err,
                    "rule failed"
                );
                if meta.critical {
                    return Err(CoreError::CriticalRule {
                        rule: meta.id.clone(),
                        subtype: self.subtype.to_string(),
                        message: err.to_string(),
                    });
                }
                Ok((
                    RuleOutcome::Failed {
                        error: err.to_string(),
                    },
                    0,
                ))
            }
        }
    }
}

fn skipped(reason: impl Into<String>) -> RuleOutcome {
    RuleOutcome::Skipped {
        reason: reason.into(),
    }
}

fn unmet_dependencies(meta: &RuleMetadata, auxiliary: &AuxiliaryData) -> Option<String> {
    if meta.phase != RulePhase::Dependent {
        return None;
    }
    let missing = auxiliary.missing(&meta.requires);
    if missing.is_empty() {
        None
    } else {
        Some(format!("missing auxiliary data: {}", missing.join(", ")))
    }
}

/// Registry of subtype cascades.
#[derive(Default)]
pub struct CascadeRegistry {
    cascades: HashMap<String, SubtypeCascade>,
}

impl CascadeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, cascade: SubtypeCascade) {
        self.cascades
            .insert(cascade.subtype().as_str().to_string(), cascade);
    }

    pub fn get(&self, subtype: &str) -> Option<&SubtypeCascade> {
        self.cascades.get(&subtype.to_ascii_uppercase())
    }

    pub fn get_mut(&mut self, subtype: &str) -> Option<&mut SubtypeCascade> {
        self.cascades.get_mut(&subtype.to_ascii_uppercase())
    }

    /// Run the cascade registered for `subtype`; no cascade means no rules.
    pub fn run(
        &self,
        subtype: &str,
        table: &mut RecordTable,
        auxiliary: &AuxiliaryData,
        run: &mut RunContext,
        recorder: &mut IncidenceRecorder,
    ) -> Result<Vec<RuleReport>> {
        match self.get(subtype) {
            Some(cascade) => cascade.run(table, auxiliary, run, recorder),
            None => Ok(Vec::new()),
        }
    }

    /// Registered subtype names, sorted.
    pub fn registered_subtypes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cascades.keys().cloned().collect();
        names.sort();
        names
    }
}
