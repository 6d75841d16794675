//! Canonical schema standardizer.
//!
//! Three passes run over the whole schema, each in canonical order and each
//! only over input columns no earlier pass claimed:
//!
//! 1. exact: equal [`header_key`]s (case, accents and punctuation ignored);
//! 2. synonym: the input column is a registered alias of the canonical column;
//! 3. fuzzy: best [`similarity`](crate::score::similarity) at or above the threshold.
//!
//! Within a pass the first input column to qualify claims the canonical column.
//! Unclaimed canonical columns are reported as added and filled empty;
//! unclaimed input columns are reported as dropped.

use atoms_model::RecordTable;
use atoms_standards::{CanonicalSchema, SynonymTable};

use crate::error::{MapError, Result};
use crate::normalize::{header_key, normalize_header};
use crate::report::{ColumnMatch, MappingReport, MatchMethod};
use crate::score::best_match;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.75;

/// Column assignment for one input header list against one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizationPlan {
    columns: Vec<String>,
    /// Input position feeding each canonical column.
    pub selectors: Vec<Option<usize>>,
    pub report: MappingReport,
    /// Input positions that were not claimed, in input order.
    pub unused: Vec<usize>,
}

impl StandardizationPlan {
    /// Canonical column list the plan produces.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Build the schema-shaped table from `table`.
    pub fn apply(&self, table: &RecordTable) -> Result<RecordTable> {
        let rows = table
            .rows()
            .iter()
            .map(|row| {
                self.selectors
                    .iter()
                    .map(|selector| {
                        selector
                            .and_then(|idx| row.get(idx))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Ok(RecordTable::from_rows(self.columns.clone(), rows)?)
    }
}

/// Output of [`SchemaStandardizer::standardize`].
#[derive(Debug, Clone)]
pub struct Standardized {
    pub table: RecordTable,
    pub report: MappingReport,
}

#[derive(Debug, Clone)]
pub struct SchemaStandardizer {
    threshold: f64,
}

impl Default for SchemaStandardizer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl SchemaStandardizer {
    pub fn new(threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MapError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decide which input column feeds each canonical column.
    pub fn plan(
        &self,
        input_columns: &[String],
        schema: &CanonicalSchema,
        synonyms: Option<&SynonymTable>,
    ) -> StandardizationPlan {
        let input_keys: Vec<String> = input_columns.iter().map(|c| header_key(c)).collect();
        let canonical_keys: Vec<String> = schema.columns().iter().map(|c| header_key(c)).collect();
        let mut claimed = vec![false; input_columns.len()];
        let mut assigned: Vec<Option<(usize, MatchMethod, Option<f64>)>> =
            vec![None; canonical_keys.len()];

        // Exact names are reserved before any alias or fuzzy candidate is
        // considered, so a near miss never steals a later column's input.
        for (slot, canonical_key) in canonical_keys.iter().enumerate() {
            let found = unclaimed(&claimed).find(|idx| input_keys[*idx] == *canonical_key);
            if let Some(idx) = found {
                claimed[idx] = true;
                assigned[slot] = Some((idx, MatchMethod::Exact, None));
            }
        }

        if let Some(table) = synonyms {
            for (slot, canonical_key) in canonical_keys.iter().enumerate() {
                if assigned[slot].is_some() {
                    continue;
                }
                let found = unclaimed(&claimed).find(|idx| {
                    table
                        .lookup(&normalize_header(&input_columns[*idx]))
                        .is_some_and(|target| header_key(target) == *canonical_key)
                });
                if let Some(idx) = found {
                    claimed[idx] = true;
                    assigned[slot] = Some((idx, MatchMethod::Synonym, None));
                }
            }
        }

        for (slot, canonical) in schema.columns().iter().enumerate() {
            if assigned[slot].is_some() {
                continue;
            }
            let candidates = unclaimed(&claimed).map(|idx| (idx, input_columns[idx].as_str()));
            if let Some((idx, score)) = best_match(canonical, candidates, self.threshold) {
                claimed[idx] = true;
                tracing::info!(
                    canonical = %canonical,
                    source = %input_columns[idx],
                    score,
                    "fuzzy header match"
                );
                assigned[slot] = Some((idx, MatchMethod::Fuzzy, Some(score)));
            }
        }

        let mut selectors = Vec::with_capacity(schema.len());
        let mut report = MappingReport::new(schema.subtype().as_str());
        for (canonical, assignment) in schema.columns().iter().zip(assigned) {
            match assignment {
                Some((idx, method, score)) => {
                    selectors.push(Some(idx));
                    report.matched.push(ColumnMatch {
                        canonical: canonical.clone(),
                        source: input_columns[idx].clone(),
                        method,
                        score,
                    });
                }
                None => {
                    selectors.push(None);
                    report.added.push(canonical.clone());
                }
            }
        }

        let unused: Vec<usize> = unclaimed(&claimed).collect();
        report.dropped = unused
            .iter()
            .map(|idx| input_columns[*idx].clone())
            .collect();

        if !report.added.is_empty() {
            tracing::warn!(
                subtype = %report.subtype,
                added = ?report.added,
                "canonical columns missing from input; filled empty"
            );
        }
        if !report.dropped.is_empty() {
            tracing::debug!(
                subtype = %report.subtype,
                dropped = ?report.dropped,
                "input columns not in canonical schema"
            );
        }

        StandardizationPlan {
            columns: schema.columns().to_vec(),
            selectors,
            report,
            unused,
        }
    }

    /// Reshape `table` to exactly the canonical columns of `schema`.
    pub fn standardize(
        &self,
        table: &RecordTable,
        schema: &CanonicalSchema,
        synonyms: Option<&SynonymTable>,
    ) -> Result<Standardized> {
        let plan = self.plan(table.columns(), schema, synonyms);
        let standardized = plan.apply(table)?;
        Ok(Standardized {
            table: standardized,
            report: plan.report,
        })
    }
}

fn unclaimed(claimed: &[bool]) -> impl Iterator<Item = usize> + '_ {
    claimed
        .iter()
        .enumerate()
        .filter(|(_, taken)| !**taken)
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atoms_model::Subtype;

    fn schema(columns: &[&str]) -> CanonicalSchema {
        CanonicalSchema::new(
            Subtype::new("BASE_AT12").unwrap(),
            columns.iter().map(|c| c.to_string()).collect(),
        )
        .unwrap()
    }

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn first_exact_match_claims() {
        let plan = SchemaStandardizer::default().plan(
            &names(&["numero garantia", "NUMERO_GARANTIA"]),
            &schema(&["Numero_Garantia"]),
            None,
        );
        assert_eq!(plan.selectors, vec![Some(0)]);
        assert_eq!(plan.unused, vec![1]);
        assert_eq!(plan.report.dropped, ["NUMERO_GARANTIA"]);
    }

    #[test]
    fn synonym_must_target_current_column() {
        let synonyms = SynonymTable::from_pairs(&[("NRO", "Numero_Prestamo")]);
        let plan = SchemaStandardizer::default().plan(
            &names(&["nro"]),
            &schema(&["Fecha", "Numero_Prestamo"]),
            Some(&synonyms),
        );
        assert_eq!(plan.selectors, vec![None, Some(0)]);
        assert_eq!(plan.report.matched[0].method, MatchMethod::Synonym);
        assert_eq!(plan.report.added, ["Fecha"]);
    }

    #[test]
    fn fuzzy_match_records_score() {
        let plan = SchemaStandardizer::default().plan(
            &names(&["Numero_Prestmo"]),
            &schema(&["Numero_Prestamo"]),
            None,
        );
        let entry = plan.report.source_for("Numero_Prestamo").unwrap();
        assert_eq!(entry.method, MatchMethod::Fuzzy);
        assert!(entry.score.unwrap() >= 0.75);
    }

    #[test]
    fn exact_name_is_reserved_for_its_own_column() {
        let plan = SchemaStandardizer::default().plan(
            &names(&["Numero_Cis_Prestamo", "Tipo_Garantia"]),
            &schema(&["Numero_Prestamo", "Tipo_Garantia", "Numero_Cis_Prestamo"]),
            None,
        );
        assert_eq!(plan.selectors, vec![None, Some(1), Some(0)]);
        assert_eq!(plan.report.added, ["Numero_Prestamo"]);
        let entry = plan.report.source_for("Numero_Cis_Prestamo").unwrap();
        assert_eq!(entry.method, MatchMethod::Exact);
    }

    #[test]
    fn synonym_is_reserved_before_fuzzy() {
        let synonyms = SynonymTable::from_pairs(&[("NUM_PRESTAMO", "Numero_Prestamo")]);
        let plan = SchemaStandardizer::default().plan(
            &names(&["num_prestamo"]),
            &schema(&["Num_Prestam", "Numero_Prestamo"]),
            Some(&synonyms),
        );
        assert_eq!(plan.selectors, vec![None, Some(0)]);
        assert_eq!(plan.report.matched[0].method, MatchMethod::Synonym);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        assert!(matches!(
            SchemaStandardizer::new(1.5),
            Err(MapError::InvalidThreshold(_))
        ));
    }
}
