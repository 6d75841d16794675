//! VALORES_AT12 (securities guarantee) rules.

use atoms_model::{IncidenceType, RecordTable, RulePhase, Severity};
use atoms_standards::catalog::{AT03_CREDITOS, VALORES_AT12};

use crate::cascade::{CascadeRule, RuleContext, RuleEffect, RuleMetadata};
use crate::error::RuleError;
use crate::keys::{JoinIndex, TieBreak};
use crate::run_context::VALORES_SEQUENCE;

use super::common::{
    Correction, DOCUMENT_COLUMN, KeyColumns, LOAN_COLUMN, column, dot_decimal, is_blank,
};

const LOAN_WIDTH: usize = 10;
const GUARANTEE_NUMBER_WIDTH: usize = 10;
const AMOUNT_COLUMNS: [&str; 3] = ["Valor_Inicial", "Valor_Garantia", "Valor_Ponderado"];

/// Fixed values of every securities record.
const CONSTANTS: [(&str, &str); 12] = [
    ("Tipo_Instrumento", "NA"),
    ("Tipo_Poliza", "NA"),
    ("Calificacion_Emisor", "NA"),
    ("Calificacion_Emisision", "NA"),
    ("Status_Garantia", "0"),
    ("Status_Prestamo", "-1"),
    ("Segmento", "PRE"),
    ("Clave_Pais", "24"),
    ("Clave_Empresa", "24"),
    ("Clave_Tipo_Garantia", "3"),
    ("Clave_Subtipo_Garantia", "61"),
    ("Clave_Tipo_Pren_Hipo", "0"),
];

/// Columns copied from another column of the same record.
const COPIES: [(&str, &str); 2] = [
    ("Numero_Cis_Prestamo", "Numero_Cis_Garantia"),
    ("Numero_Ruc_Prestamo", "Numero_Ruc_Garantia"),
];

fn constant_correction(description: &str) -> Correction<'_> {
    Correction {
        incidence_type: IncidenceType::DataQuality,
        severity: Severity::Low,
        description,
    }
}

/// Loan numbers are reported with ten digits; the document is the loan.
pub struct SecuritiesLoanPaddingRule {
    metadata: RuleMetadata,
}

impl SecuritiesLoanPaddingRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "SECURITIES_LOAN_PADDING",
                RulePhase::Independent,
                "Left-pad Numero_Prestamo to 10 and copy it into Id_Documento",
            )
            .with_targets(&[LOAN_COLUMN, DOCUMENT_COLUMN]),
        }
    }
}

impl Default for SecuritiesLoanPaddingRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for SecuritiesLoanPaddingRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let loan = column(table, VALORES_AT12, LOAN_COLUMN)?;
        let document = column(table, VALORES_AT12, DOCUMENT_COLUMN)?;
        let keys = KeyColumns::resolve(table);
        let correction = constant_correction("Loan number padded to 10 digits");

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            let trimmed = table.cell(row, loan).unwrap_or_default().trim().to_string();
            if is_blank(&trimmed) {
                continue;
            }
            let padded = format!("{trimmed:0>LOAN_WIDTH$}");
            correction.apply(table, &mut effect, &keys, row, loan, &padded);
            correction.apply(table, &mut effect, &keys, row, document, &padded);
        }
        Ok(effect)
    }
}

/// Amounts in dot-decimal notation; `Importe` mirrors `Valor_Garantia`.
pub struct SecuritiesAmountsRule {
    metadata: RuleMetadata,
}

impl SecuritiesAmountsRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "SECURITIES_AMOUNTS",
                RulePhase::Independent,
                "Convert amounts to dot decimals and set Importe to Valor_Garantia",
            )
            .with_targets(&["Valor_Inicial", "Valor_Garantia", "Valor_Ponderado", "Importe"]),
        }
    }
}

impl Default for SecuritiesAmountsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for SecuritiesAmountsRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let mut amounts = Vec::with_capacity(AMOUNT_COLUMNS.len());
        for name in AMOUNT_COLUMNS {
            amounts.push(column(table, VALORES_AT12, name)?);
        }
        let guarantee_value = column(table, VALORES_AT12, "Valor_Garantia")?;
        let amount = column(table, VALORES_AT12, "Importe")?;
        let keys = KeyColumns::resolve(table);
        let correction = constant_correction("Amount converted to dot-decimal notation");
        let mirror = constant_correction("Importe set to Valor_Garantia");

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            for col in &amounts {
                let Some(converted) = dot_decimal(table.cell(row, *col).unwrap_or_default())
                else {
                    continue;
                };
                correction.apply(table, &mut effect, &keys, row, *col, &converted);
            }
            let value = table
                .cell(row, guarantee_value)
                .unwrap_or_default()
                .to_string();
            mirror.apply(table, &mut effect, &keys, row, amount, &value);
        }
        Ok(effect)
    }
}

/// Regulatory constants and same-record copies.
pub struct SecuritiesConstantsRule {
    metadata: RuleMetadata,
}

impl SecuritiesConstantsRule {
    pub fn new() -> Self {
        let targets: Vec<&str> = CONSTANTS
            .iter()
            .map(|(name, _)| *name)
            .chain(COPIES.iter().map(|(target, _)| *target))
            .collect();
        Self {
            metadata: RuleMetadata::new(
                "SECURITIES_CONSTANTS",
                RulePhase::Independent,
                "Assign the fixed securities values",
            )
            .with_targets(&targets),
        }
    }
}

impl Default for SecuritiesConstantsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for SecuritiesConstantsRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let mut constants = Vec::with_capacity(CONSTANTS.len());
        for (name, value) in CONSTANTS {
            constants.push((column(table, VALORES_AT12, name)?, value));
        }
        let mut copies = Vec::with_capacity(COPIES.len());
        for (target, source) in COPIES {
            copies.push((
                column(table, VALORES_AT12, target)?,
                column(table, VALORES_AT12, source)?,
            ));
        }
        let keys = KeyColumns::resolve(table);
        let correction = constant_correction("Securities constant assigned");

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            for (col, value) in &constants {
                correction.apply(table, &mut effect, &keys, row, *col, value);
            }
            for (target, source) in &copies {
                let value = table.cell(row, *source).unwrap_or_default().to_string();
                correction.apply(table, &mut effect, &keys, row, *target, &value);
            }
        }
        Ok(effect)
    }
}

/// Guarantee numbers from the persistent `valores` sequence keyed by the
/// padded loan, zero-padded to ten digits.
pub struct SecuritiesGuaranteeNumberRule {
    metadata: RuleMetadata,
}

impl SecuritiesGuaranteeNumberRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "SECURITIES_GUARANTEE_NUMBER",
                RulePhase::Independent,
                "Assign Numero_Garantia from the valores sequence registry",
            )
            .with_targets(&["Numero_Garantia"]),
        }
    }
}

impl Default for SecuritiesGuaranteeNumberRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for SecuritiesGuaranteeNumberRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let loan = column(table, VALORES_AT12, LOAN_COLUMN)?;
        let number = column(table, VALORES_AT12, "Numero_Garantia")?;
        let keys = KeyColumns::resolve(table);
        let correction = constant_correction("Numero_Garantia assigned from the valores sequence");

        let registry = ctx.run.registry(VALORES_SEQUENCE);
        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            let natural_key = table.cell(row, loan).unwrap_or_default().trim().to_string();
            if is_blank(&natural_key) {
                continue;
            }
            let assigned = registry.get_or_assign(&natural_key)?;
            let formatted = format!("{assigned:0>GUARANTEE_NUMBER_WIDTH$}");
            correction.apply(table, &mut effect, &keys, row, number, &formatted);
        }
        let last_issued = registry.last_issued();
        ctx.run.record_last_issued(VALORES_SEQUENCE, last_issued);
        Ok(effect)
    }
}

/// Facility type depends on whether the loan exists in the credit extract.
pub struct SecuritiesFacilityRule {
    metadata: RuleMetadata,
}

impl SecuritiesFacilityRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "SECURITIES_FACILITY",
                RulePhase::Dependent,
                "Set Tipo_Facilidad to 01 for loans found in AT03, else 02",
            )
            .with_targets(&["Tipo_Facilidad"])
            .requires(&[AT03_CREDITOS]),
        }
    }
}

impl Default for SecuritiesFacilityRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for SecuritiesFacilityRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let credits = ctx.auxiliary.require(AT03_CREDITOS)?;
        let index = JoinIndex::build(AT03_CREDITOS, credits, "num_cta", &TieBreak::First)?;

        let loan = column(table, VALORES_AT12, LOAN_COLUMN)?;
        let facility = column(table, VALORES_AT12, "Tipo_Facilidad")?;
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::DataQuality,
            severity: Severity::Low,
            description: "Tipo_Facilidad derived from AT03 presence",
        };

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            let value = if index.contains(table.cell(row, loan).unwrap_or_default()) {
                "01"
            } else {
                "02"
            };
            correction.apply(table, &mut effect, &keys, row, facility, value);
        }
        Ok(effect)
    }
}
