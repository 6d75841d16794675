//! BASE_AT12 rules.
//!
//! Phase A corrects documents, dates and defaults per guarantee category.
//! Phase B enriches from the core-banking credit extract and the insurance
//! registries, removes out-of-cycle loans and checks minimum appraisal values.

use std::collections::HashSet;

use atoms_model::{IncidenceType, RecordTable, RulePhase, Severity};
use atoms_standards::catalog::{
    AT03_CREDITOS, BASE_AT12, FUERA_CIERRE_AT12, GARANTIA_AUTOS_AT12, POLIZA_HIPOTECAS_AT12,
    VALOR_MINIMO_AVALUO_AT12,
};
use chrono::Datelike;

use crate::cascade::{CascadeRule, RuleContext, RuleEffect, RuleMetadata};
use crate::dates::{date_year, format_date, parse_date};
use crate::error::RuleError;
use crate::incidence::Finding;
use crate::keys::{JoinIndex, TieBreak, normalize_key};

use super::common::{
    CATEGORY_COLUMN, Correction, DOCUMENT_COLUMN, KeyColumns, LOAN_COLUMN, column, in_scope,
    is_blank, parse_amount, set_if_changed,
};

const PROPERTY_CATEGORIES: [&str; 3] = ["0207", "0208", "0209"];
const MIN_VALID_YEAR: i32 = 1985;
const MAX_VALID_YEAR: i32 = 2100;
const MATURITY_FALLBACK: &str = "21001201";

/// Suffixes (positions 13-15) of a well-formed 0301 document.
const DOCUMENT_0301_SUFFIXES: [&str; 5] = ["100", "110", "120", "123", "810"];
/// Codes (positions 9-10) of documents cut back to ten characters.
const DOCUMENT_0301_SHORT_CODES: [&str; 3] = ["01", "41", "42"];

/// Corrected 0301 document, or `None` when it is valid or unrecognized.
fn fix_0301_document(document: &str) -> Option<String> {
    let doc = document.trim();
    if !doc.is_ascii() {
        return None;
    }
    let len = doc.len();
    if len >= 15 && DOCUMENT_0301_SUFFIXES.contains(&&doc[12..15]) {
        return (len > 15).then(|| doc[..15].to_string());
    }
    if doc.contains("701") {
        return None;
    }
    if len > 10 && len != 15 && DOCUMENT_0301_SHORT_CODES.contains(&&doc[8..10]) {
        return Some(doc[..10].to_string());
    }
    None
}

/// Document formats for guarantee category 0301.
pub struct Error0301Rule {
    metadata: RuleMetadata,
}

impl Error0301Rule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "ERROR_0301",
                RulePhase::Independent,
                "Normalize Id_Documento of category 0301 to its regulatory length",
            )
            .with_targets(&[DOCUMENT_COLUMN]),
        }
    }
}

impl Default for Error0301Rule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for Error0301Rule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let category = column(table, BASE_AT12, CATEGORY_COLUMN)?;
        let document = column(table, BASE_AT12, DOCUMENT_COLUMN)?;
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::InvalidFormat,
            severity: Severity::Medium,
            description: "Id_Documento of category 0301 cut to its valid length",
        };
        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            if !in_scope(table.cell(row, category).unwrap_or_default(), &["0301"]) {
                continue;
            }
            let Some(fixed) = fix_0301_document(table.cell(row, document).unwrap_or_default())
            else {
                continue;
            };
            correction.apply(table, &mut effect, &keys, row, document, &fixed);
        }
        Ok(effect)
    }
}

/// Commas are not allowed in document numbers.
pub struct CommaInDocumentRule {
    metadata: RuleMetadata,
}

impl CommaInDocumentRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "COMMA_IN_DOCUMENT",
                RulePhase::Independent,
                "Remove commas from Id_Documento",
            )
            .with_targets(&[DOCUMENT_COLUMN]),
        }
    }
}

impl Default for CommaInDocumentRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for CommaInDocumentRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let document = column(table, BASE_AT12, DOCUMENT_COLUMN)?;
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::InvalidFormat,
            severity: Severity::Low,
            description: "Comma removed from Id_Documento",
        };
        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            let current = table.cell(row, document).unwrap_or_default();
            if !current.contains(',') {
                continue;
            }
            let fixed = current.replace(',', "");
            correction.apply(table, &mut effect, &keys, row, document, &fixed);
        }
        Ok(effect)
    }
}

/// Maturity dates outside the plausible range.
pub struct MaturityDateRule {
    metadata: RuleMetadata,
}

impl MaturityDateRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "MATURITY_DATE",
                RulePhase::Independent,
                "Replace Fecha_Vencimiento outside 1985-2100 with 21001201",
            )
            .with_targets(&["Fecha_Vencimiento"]),
        }
    }
}

impl Default for MaturityDateRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for MaturityDateRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let maturity = column(table, BASE_AT12, "Fecha_Vencimiento")?;
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::BusinessRuleViolation,
            severity: Severity::Medium,
            description: "Fecha_Vencimiento out of range replaced with 21001201",
        };
        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            let Some(year) = date_year(table.cell(row, maturity).unwrap_or_default()) else {
                continue;
            };
            if year > MAX_VALID_YEAR || year < MIN_VALID_YEAR {
                correction.apply(table, &mut effect, &keys, row, maturity, MATURITY_FALLBACK);
            }
        }
        Ok(effect)
    }
}

/// Fills one column with a fixed value for records of some categories when
/// the column is blank or holds a placeholder.
pub struct ScopedDefaultRule {
    metadata: RuleMetadata,
    categories: &'static [&'static str],
    column: &'static str,
    value: &'static str,
    placeholders: &'static [&'static str],
    incidence_type: IncidenceType,
    severity: Severity,
}

impl ScopedDefaultRule {
    /// 0208 without policy type gets `01`.
    pub fn property_policy_default() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "PROPERTY_POLICY_DEFAULT",
                RulePhase::Independent,
                "Default Tipo_Poliza of category 0208 to 01",
            )
            .with_targets(&["Tipo_Poliza"]),
            categories: &["0208"],
            column: "Tipo_Poliza",
            value: "01",
            placeholders: &[],
            incidence_type: IncidenceType::MissingRequiredField,
            severity: Severity::Low,
        }
    }

    /// Property guarantees without a deed reference.
    pub fn property_without_deed() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "PROPERTY_WITHOUT_DEED",
                RulePhase::Independent,
                "Set Id_Documento of property guarantees without deed to 99999/99999",
            )
            .with_targets(&[DOCUMENT_COLUMN]),
            categories: &PROPERTY_CATEGORIES,
            column: DOCUMENT_COLUMN,
            value: "99999/99999",
            placeholders: &["0/0", "1/0", "1/1", "1", "9999/1", "0/1", "0"],
            incidence_type: IncidenceType::MissingRequiredField,
            severity: Severity::Medium,
        }
    }

    /// Commercial vehicle guarantees without an insurer.
    pub fn auto_commercial_policy() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "AUTO_COMMERCIAL_POLICY",
                RulePhase::Independent,
                "Default Nombre_Organismo of category 0106 to 700",
            )
            .with_targets(&["Nombre_Organismo"]),
            categories: &["0106"],
            column: "Nombre_Organismo",
            value: "700",
            placeholders: &[],
            incidence_type: IncidenceType::MissingRequiredField,
            severity: Severity::Low,
        }
    }

    /// Property guarantees without an appraiser.
    pub fn property_without_appraiser() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "PROPERTY_WITHOUT_APPRAISER",
                RulePhase::Independent,
                "Default Nombre_Organismo of property guarantees to 774",
            )
            .with_targets(&["Nombre_Organismo"]),
            categories: &PROPERTY_CATEGORIES,
            column: "Nombre_Organismo",
            value: "774",
            placeholders: &[],
            incidence_type: IncidenceType::MissingRequiredField,
            severity: Severity::Low,
        }
    }

    fn needs_default(&self, value: &str) -> bool {
        is_blank(value) || self.placeholders.contains(&value.trim())
    }
}

impl CascadeRule for ScopedDefaultRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let category = column(table, BASE_AT12, CATEGORY_COLUMN)?;
        let target = column(table, BASE_AT12, self.column)?;
        let keys = KeyColumns::resolve(table);
        let description = format!("{} set to {}", self.column, self.value);
        let correction = Correction {
            incidence_type: self.incidence_type,
            severity: self.severity,
            description: &description,
        };
        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            if !in_scope(table.cell(row, category).unwrap_or_default(), self.categories) {
                continue;
            }
            if self.needs_default(table.cell(row, target).unwrap_or_default()) {
                correction.apply(table, &mut effect, &keys, row, target, self.value);
            }
        }
        Ok(effect)
    }
}

/// Last appraisal dates that are missing, implausible or later than the
/// reporting cut-off take the loan start date from AT03.
pub struct AppraisalDateRule {
    metadata: RuleMetadata,
}

impl AppraisalDateRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "APPRAISAL_DATE",
                RulePhase::Dependent,
                "Replace invalid Fecha_Ultima_Actualizacion with the AT03 loan start date",
            )
            .with_targets(&["Fecha_Ultima_Actualizacion"])
            .requires(&[AT03_CREDITOS]),
        }
    }
}

impl Default for AppraisalDateRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for AppraisalDateRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let credits = ctx.auxiliary.require(AT03_CREDITOS)?;
        let tie = TieBreak::LatestDate("fec_ini_prestamo".to_string());
        let index = JoinIndex::build(AT03_CREDITOS, credits, "num_cta", &tie)?;
        let start_col = column(credits, AT03_CREDITOS, "fec_ini_prestamo")?;

        let loan = column(table, BASE_AT12, LOAN_COLUMN)?;
        let appraisal = column(table, BASE_AT12, "Fecha_Ultima_Actualizacion")?;
        let cutoff = ctx.period().last_day_of_previous_month();
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::BusinessRuleViolation,
            severity: Severity::Medium,
            description: "Fecha_Ultima_Actualizacion replaced with AT03 fec_ini_prestamo",
        };

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            let valid = parse_date(table.cell(row, appraisal).unwrap_or_default())
                .is_some_and(|date| date <= cutoff && date.year() >= MIN_VALID_YEAR);
            if valid {
                continue;
            }
            let Some(start) = index
                .value(table.cell(row, loan).unwrap_or_default(), start_col)
                .and_then(parse_date)
            else {
                continue;
            };
            correction.apply(table, &mut effect, &keys, row, appraisal, &format_date(start));
        }
        Ok(effect)
    }
}

/// Normalizes a policy type to two digits (`2` → `02`).
fn policy_code(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() == 1 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        format!("0{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Mortgage guarantees (0207) without policy type take the fire-insurance
/// type from the mortgage policy registry, or `01` when none is found.
pub struct PropertyPolicyRule {
    metadata: RuleMetadata,
}

impl PropertyPolicyRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "PROPERTY_POLICY",
                RulePhase::Dependent,
                "Fill Tipo_Poliza of category 0207 from the mortgage policy registry",
            )
            .with_targets(&["Tipo_Poliza"])
            .requires(&[POLIZA_HIPOTECAS_AT12]),
        }
    }
}

impl Default for PropertyPolicyRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for PropertyPolicyRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let policies = ctx.auxiliary.require(POLIZA_HIPOTECAS_AT12)?;
        let index = JoinIndex::build(POLIZA_HIPOTECAS_AT12, policies, "numcred", &TieBreak::First)?;
        let insurance = column(policies, POLIZA_HIPOTECAS_AT12, "seguro_incendio")?;

        let category = column(table, BASE_AT12, CATEGORY_COLUMN)?;
        let loan = column(table, BASE_AT12, LOAN_COLUMN)?;
        let policy = column(table, BASE_AT12, "Tipo_Poliza")?;
        let keys = KeyColumns::resolve(table);
        let fallback = Correction {
            incidence_type: IncidenceType::MissingRequiredField,
            severity: Severity::Low,
            description: "No fire insurance found for loan; Tipo_Poliza defaulted to 01",
        };

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            if !in_scope(table.cell(row, category).unwrap_or_default(), &["0207"])
                || !is_blank(table.cell(row, policy).unwrap_or_default())
            {
                continue;
            }
            let matched = index
                .value(table.cell(row, loan).unwrap_or_default(), insurance)
                .filter(|value| !is_blank(value))
                .map(policy_code);
            match matched {
                Some(value) => {
                    if set_if_changed(table, row, policy, &value).is_some() {
                        effect.changed();
                    }
                }
                None => {
                    fallback.apply(table, &mut effect, &keys, row, policy, "01");
                }
            }
        }
        Ok(effect)
    }
}

/// Vehicle guarantees without a document take the policy number from the
/// vehicle insurance registry.
pub struct AutoPolicyRule {
    metadata: RuleMetadata,
}

impl AutoPolicyRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "AUTO_POLICY",
                RulePhase::Dependent,
                "Fill Id_Documento of categories 0101/0103 from the vehicle policy registry",
            )
            .with_targets(&[DOCUMENT_COLUMN])
            .requires(&[GARANTIA_AUTOS_AT12]),
        }
    }
}

impl Default for AutoPolicyRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for AutoPolicyRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let autos = ctx.auxiliary.require(GARANTIA_AUTOS_AT12)?;
        let index = JoinIndex::build(GARANTIA_AUTOS_AT12, autos, "numcred", &TieBreak::First)?;
        let policy_number = column(autos, GARANTIA_AUTOS_AT12, "num_poliza")?;

        let category = column(table, BASE_AT12, CATEGORY_COLUMN)?;
        let loan = column(table, BASE_AT12, LOAN_COLUMN)?;
        let document = column(table, BASE_AT12, DOCUMENT_COLUMN)?;
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::MissingRequiredField,
            severity: Severity::Medium,
            description: "Id_Documento filled with the vehicle policy number",
        };

        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            if !in_scope(table.cell(row, category).unwrap_or_default(), &["0101", "0103"])
                || !is_blank(table.cell(row, document).unwrap_or_default())
            {
                continue;
            }
            let Some(number) = index
                .value(table.cell(row, loan).unwrap_or_default(), policy_number)
                .filter(|value| !is_blank(value))
                .map(|value| value.trim().to_string())
            else {
                continue;
            };
            correction.apply(table, &mut effect, &keys, row, document, &number);
        }
        Ok(effect)
    }
}

/// Loans disbursed outside the closing cycle are removed from the report.
pub struct OutOfCycleRule {
    metadata: RuleMetadata,
}

impl OutOfCycleRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "OUT_OF_CYCLE",
                RulePhase::Dependent,
                "Remove loans listed in the out-of-cycle extract",
            )
            .requires(&[FUERA_CIERRE_AT12]),
        }
    }
}

impl Default for OutOfCycleRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for OutOfCycleRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let out_of_cycle = ctx.auxiliary.require(FUERA_CIERRE_AT12)?;
        let listed_col = column(out_of_cycle, FUERA_CIERRE_AT12, "at_num_prestamo")?;
        let listed: HashSet<String> = out_of_cycle
            .column_values(listed_col)
            .filter_map(normalize_key)
            .collect();

        let loan = column(table, BASE_AT12, LOAN_COLUMN)?;
        let keys = KeyColumns::resolve(table);
        let mut effect = RuleEffect::new();
        let mut removed = HashSet::new();
        for row in 0..table.len() {
            let Some(key) = normalize_key(table.cell(row, loan).unwrap_or_default()) else {
                continue;
            };
            if !listed.contains(&key) {
                continue;
            }
            removed.insert(row);
            effect.corrected(
                Finding::flag(
                    IncidenceType::BusinessRuleViolation,
                    Severity::Medium,
                    "Loan disbursed outside the closing cycle; record removed",
                )
                .at_row(row)
                .with_keys(keys.capture(table, row)),
            );
        }
        table.retain_rows(|idx, _| !removed.contains(&idx));
        Ok(effect)
    }
}

/// Outstanding balances above the minimum appraisal value.
pub struct MinimumAppraisalValueRule {
    metadata: RuleMetadata,
}

impl MinimumAppraisalValueRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "MINIMUM_APPRAISAL_VALUE",
                RulePhase::Dependent,
                "Report loans whose balance exceeds the minimum appraisal value",
            )
            .requires(&[VALOR_MINIMO_AVALUO_AT12, AT03_CREDITOS]),
        }
    }
}

impl Default for MinimumAppraisalValueRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for MinimumAppraisalValueRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let valuations = ctx.auxiliary.require(VALOR_MINIMO_AVALUO_AT12)?;
        let credits = ctx.auxiliary.require(AT03_CREDITOS)?;
        let valuation_index = JoinIndex::build(
            VALOR_MINIMO_AVALUO_AT12,
            valuations,
            "at_num_de_prestamos",
            &TieBreak::First,
        )?;
        let minimum_col = column(valuations, VALOR_MINIMO_AVALUO_AT12, "nuevo_at_valor_garantia")?;
        let tie = TieBreak::LatestDate("fec_ini_prestamo".to_string());
        let credit_index = JoinIndex::build(AT03_CREDITOS, credits, "num_cta", &tie)?;
        let balance_col = column(credits, AT03_CREDITOS, "saldo")?;

        let loan = column(table, BASE_AT12, LOAN_COLUMN)?;
        let keys = KeyColumns::resolve(table);
        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            let loan_number = table.cell(row, loan).unwrap_or_default();
            let (Some(minimum), Some(balance)) = (
                valuation_index.value(loan_number, minimum_col),
                credit_index.value(loan_number, balance_col),
            ) else {
                continue;
            };
            let (Some(minimum_amount), Some(balance_amount)) =
                (parse_amount(minimum), parse_amount(balance))
            else {
                continue;
            };
            if balance_amount <= minimum_amount {
                continue;
            }
            effect.flagged(
                Finding::flag(
                    IncidenceType::ValidationFailure,
                    Severity::High,
                    "Outstanding balance exceeds the minimum appraisal value",
                )
                .at_row(row)
                .with_keys(keys.capture(table, row))
                .with_metadata("numero_prestamo", loan_number.trim())
                .with_metadata("saldo_adeudado", balance.trim())
                .with_metadata("valor_garantia", minimum.trim()),
            );
        }
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_0301_formats() {
        assert_eq!(fix_0301_document("123456789012100"), None);
        assert_eq!(
            fix_0301_document("123456789012810999").as_deref(),
            Some("123456789012810")
        );
        assert_eq!(fix_0301_document("12701999999999999"), None);
        assert_eq!(fix_0301_document("12345678419999").as_deref(), Some("1234567841"));
        assert_eq!(fix_0301_document("123456780199"), Some("1234567801".to_string()));
        assert_eq!(fix_0301_document("1234567801"), None);
        assert_eq!(fix_0301_document("12345678999999"), None);
    }

    #[test]
    fn policy_codes_have_two_digits() {
        assert_eq!(policy_code("2"), "02");
        assert_eq!(policy_code(" 03 "), "03");
        assert_eq!(policy_code("X"), "X");
    }
}
