//! SOBREGIRO_AT12 (overdraft guarantee) rules.

use atoms_model::{IncidenceType, RecordTable, RulePhase, Severity};
use atoms_standards::catalog::{BASE_AT12, SOBREGIRO_AT12};

use crate::cascade::{CascadeRule, RuleContext, RuleEffect, RuleMetadata};
use crate::error::RuleError;
use crate::keys::{JoinIndex, TieBreak};

use super::common::{
    CATEGORY_COLUMN, Correction, DOCUMENT_COLUMN, KeyColumns, LOAN_COLUMN, column, is_blank,
};

const OVERDRAFT_CATEGORY: &str = "0103";
const COPIED_FROM_BASE: [&str; 2] = ["Fecha_Vencimiento", "Valor_Inicial"];

/// Category, document and guarantee number every overdraft record carries.
pub struct OverdraftDefaultsRule {
    metadata: RuleMetadata,
}

impl OverdraftDefaultsRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "OVERDRAFT_DEFAULTS",
                RulePhase::Independent,
                "Set Tipo_Garantia 0103, Id_Documento to the loan and SOB guarantee numbers",
            )
            .with_targets(&[CATEGORY_COLUMN, DOCUMENT_COLUMN, "Numero_Garantia"]),
        }
    }
}

impl Default for OverdraftDefaultsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for OverdraftDefaultsRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let category = column(table, SOBREGIRO_AT12, CATEGORY_COLUMN)?;
        let document = column(table, SOBREGIRO_AT12, DOCUMENT_COLUMN)?;
        let loan = column(table, SOBREGIRO_AT12, LOAN_COLUMN)?;
        let number = column(table, SOBREGIRO_AT12, "Numero_Garantia")?;
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::DataQuality,
            severity: Severity::Low,
            description: "Overdraft constant assigned",
        };

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            correction.apply(table, &mut effect, &keys, row, category, OVERDRAFT_CATEGORY);

            let loan_number = table.cell(row, loan).unwrap_or_default().trim().to_string();
            if loan_number.is_empty() {
                continue;
            }
            correction.apply(table, &mut effect, &keys, row, document, &loan_number);
            if is_blank(table.cell(row, number).unwrap_or_default()) {
                let generated = format!("SOB{loan_number}");
                correction.apply(table, &mut effect, &keys, row, number, &generated);
            }
        }
        Ok(effect)
    }
}

/// Maturity and initial value follow the corrected BASE record of the same loan.
pub struct BaseEnrichmentRule {
    metadata: RuleMetadata,
}

impl BaseEnrichmentRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "BASE_ENRICHMENT",
                RulePhase::Dependent,
                "Copy Fecha_Vencimiento and Valor_Inicial from the corrected BASE table",
            )
            .with_targets(&COPIED_FROM_BASE)
            .requires(&[BASE_AT12]),
        }
    }
}

impl Default for BaseEnrichmentRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for BaseEnrichmentRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let base = ctx.auxiliary.require(BASE_AT12)?;
        let index = JoinIndex::build(BASE_AT12, base, LOAN_COLUMN, &TieBreak::First)?;
        let mut pairs = Vec::with_capacity(COPIED_FROM_BASE.len());
        for name in COPIED_FROM_BASE {
            pairs.push((
                column(base, BASE_AT12, name)?,
                column(table, SOBREGIRO_AT12, name)?,
            ));
        }

        let loan = column(table, SOBREGIRO_AT12, LOAN_COLUMN)?;
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::DataQuality,
            severity: Severity::Low,
            description: "Value aligned with the BASE record of the same loan",
        };

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            let Some(base_row) = index.lookup(table.cell(row, loan).unwrap_or_default()) else {
                continue;
            };
            for (base_col, own_col) in &pairs {
                let value = base.cell(base_row, *base_col).unwrap_or_default();
                if is_blank(value) {
                    continue;
                }
                correction.apply(table, &mut effect, &keys, row, *own_col, value);
            }
        }
        Ok(effect)
    }
}
