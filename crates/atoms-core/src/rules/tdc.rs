//! TDC_AT12 (credit-card guarantee) rules.

use atoms_model::{IncidenceType, RecordTable, RulePhase, Severity};
use atoms_standards::catalog::{AT02_CUENTAS, TDC_AT12};

use crate::cascade::{CascadeRule, RuleContext, RuleEffect, RuleMetadata};
use crate::dates::{format_date, parse_date};
use crate::error::RuleError;
use crate::keys::{JoinIndex, TieBreak, composite_key};
use crate::run_context::TDC_SEQUENCE;

use super::common::{Correction, DOCUMENT_COLUMN, KeyColumns, LOAN_COLUMN, column, is_blank};

const GUARANTEE_NUMBER_COLUMN: &str = "Numero_Garantia";
const FACILITY_COLUMN: &str = "Tipo_Facilidad";

/// Blank guarantee numbers are issued from the persistent `tdc` sequence,
/// keyed by document, loan and facility so a card keeps its number across
/// runs.
pub struct GuaranteeNumberRule {
    metadata: RuleMetadata,
}

impl GuaranteeNumberRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "GUARANTEE_NUMBER",
                RulePhase::Independent,
                "Assign Número_Garantía from the tdc sequence registry",
            )
            .with_targets(&[GUARANTEE_NUMBER_COLUMN]),
        }
    }
}

impl Default for GuaranteeNumberRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for GuaranteeNumberRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let number = column(table, TDC_AT12, GUARANTEE_NUMBER_COLUMN)?;
        let document = column(table, TDC_AT12, DOCUMENT_COLUMN)?;
        let loan = column(table, TDC_AT12, LOAN_COLUMN)?;
        let facility = column(table, TDC_AT12, FACILITY_COLUMN)?;
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::MissingRequiredField,
            severity: Severity::Low,
            description: "Número_Garantía assigned from the tdc sequence",
        };

        let registry = ctx.run.registry(TDC_SEQUENCE);
        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            if !is_blank(table.cell(row, number).unwrap_or_default()) {
                continue;
            }
            let natural_key = composite_key(&[
                table.cell(row, document).unwrap_or_default(),
                table.cell(row, loan).unwrap_or_default(),
                table.cell(row, facility).unwrap_or_default(),
            ]);
            let assigned = registry.get_or_assign(&natural_key)?;
            correction.apply(table, &mut effect, &keys, row, number, &assigned.to_string());
        }
        let last_issued = registry.last_issued();
        ctx.run.record_last_issued(TDC_SEQUENCE, last_issued);
        tracing::debug!(last_issued, "tdc sequence position");
        Ok(effect)
    }
}

/// Missing last-update dates take the account opening date from AT02.
pub struct OpeningDateRule {
    metadata: RuleMetadata,
}

impl OpeningDateRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "OPENING_DATE",
                RulePhase::Dependent,
                "Fill Fecha_Última_Actualización from the AT02 account opening date",
            )
            .with_targets(&["Fecha_Ultima_Actualizacion"])
            .requires(&[AT02_CUENTAS]),
        }
    }
}

impl Default for OpeningDateRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for OpeningDateRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let accounts = ctx.auxiliary.require(AT02_CUENTAS)?;
        let tie = TieBreak::LatestDate("Fecha_Inicio".to_string());
        let index = JoinIndex::build(AT02_CUENTAS, accounts, "Identificacion_Cuenta", &tie)?;
        let opened = column(accounts, AT02_CUENTAS, "Fecha_Inicio")?;

        let document = column(table, TDC_AT12, DOCUMENT_COLUMN)?;
        let updated = column(table, TDC_AT12, "Fecha_Ultima_Actualizacion")?;
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::MissingRequiredField,
            severity: Severity::Medium,
            description: "Fecha_Última_Actualización filled with AT02 Fecha_Inicio",
        };

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            if !is_blank(table.cell(row, updated).unwrap_or_default()) {
                continue;
            }
            let Some(date) = index
                .value(table.cell(row, document).unwrap_or_default(), opened)
                .and_then(parse_date)
            else {
                continue;
            };
            correction.apply(table, &mut effect, &keys, row, updated, &format_date(date));
        }
        Ok(effect)
    }
}
