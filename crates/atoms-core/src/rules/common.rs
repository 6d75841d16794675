//! Helpers shared by the rule catalog, and the whitespace rule every
//! subtype starts with.

use atoms_model::{IncidenceType, RecordTable, RulePhase, Severity};

use crate::cascade::{CascadeRule, RuleContext, RuleEffect, RuleMetadata};
use crate::error::RuleError;
use crate::incidence::Finding;

pub const LOAN_COLUMN: &str = "Numero_Prestamo";
pub const CATEGORY_COLUMN: &str = "Tipo_Garantia";
pub const DOCUMENT_COLUMN: &str = "Id_Documento";

/// Resolve `name` in `table` by folded name.
pub fn column(table: &RecordTable, table_name: &str, name: &str) -> Result<usize, RuleError> {
    table
        .resolve_column(name)
        .ok_or_else(|| RuleError::missing_column(table_name, name))
}

/// Empty after trimming, or one of the null spellings extracts carry.
pub fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
}

/// Guarantee category as a four-digit code; `207` and `0207` are the same.
pub fn category_code(value: &str) -> String {
    let trimmed = value.trim();
    if !trimmed.is_empty() && trimmed.len() < 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        format!("{trimmed:0>4}")
    } else {
        trimmed.to_string()
    }
}

pub fn in_scope(category: &str, codes: &[&str]) -> bool {
    let code = category_code(category);
    codes.contains(&code.as_str())
}

/// Trim and collapse inner whitespace runs to one space.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rewrite a cell, returning the previous value only if it changed.
pub fn set_if_changed(
    table: &mut RecordTable,
    row: usize,
    col: usize,
    value: &str,
) -> Option<String> {
    if table.cell(row, col)? == value {
        return None;
    }
    table.set_cell(row, col, value)
}

/// Decimal text with a dot separator and no trailing fractional zeros:
/// `10250,75` → `10250.75`, `5000.00` → `5000`, `1.234,5` → `1234.5`.
pub fn dot_decimal(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    let (sign, unsigned) = match compact.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", compact.as_str()),
    };
    // The right-most separator is the decimal one when both appear.
    let decimal_at = match (unsigned.rfind('.'), unsigned.rfind(',')) {
        (Some(dot), Some(comma)) => Some(dot.max(comma)),
        (Some(dot), None) => Some(dot),
        (None, Some(comma)) if unsigned.matches(',').count() == 1 => Some(comma),
        (None, Some(_)) => None,
        (None, None) => None,
    };
    let (int_part, frac_part) = match decimal_at {
        Some(at) => (&unsigned[..at], &unsigned[at + 1..]),
        None => (unsigned, ""),
    };
    let int_digits: String = int_part.chars().filter(|c| *c != '.' && *c != ',').collect();
    if int_digits.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_digits.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let int_digits = int_digits.trim_start_matches('0');
    let int_digits = if int_digits.is_empty() { "0" } else { int_digits };
    let frac = frac_part.trim_end_matches('0');
    let sign = if int_digits == "0" && frac.is_empty() { "" } else { sign };
    if frac.is_empty() {
        Some(format!("{sign}{int_digits}"))
    } else {
        Some(format!("{sign}{int_digits}.{frac}"))
    }
}

/// Numeric value of an amount cell in either decimal convention.
pub fn parse_amount(raw: &str) -> Option<f64> {
    dot_decimal(raw).and_then(|value| value.parse().ok())
}

/// Identifying fields captured with every finding.
#[derive(Debug, Clone, Default)]
pub struct KeyColumns {
    columns: Vec<(String, usize)>,
}

impl KeyColumns {
    /// Loan number and guarantee category, where the table has them.
    pub fn resolve(table: &RecordTable) -> Self {
        let columns = [LOAN_COLUMN, CATEGORY_COLUMN]
            .iter()
            .filter_map(|name| {
                table
                    .resolve_column(name)
                    .map(|idx| (name.to_string(), idx))
            })
            .collect();
        Self { columns }
    }

    pub fn capture(&self, table: &RecordTable, row: usize) -> Vec<(String, String)> {
        self.columns
            .iter()
            .map(|(name, idx)| {
                (
                    name.clone(),
                    table.cell(row, *idx).unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// How one kind of cell correction is reported.
#[derive(Debug, Clone, Copy)]
pub struct Correction<'a> {
    pub incidence_type: IncidenceType,
    pub severity: Severity,
    pub description: &'a str,
}

impl Correction<'_> {
    /// Write `value` and report the change. Returns `false` when the cell
    /// already held `value`.
    pub fn apply(
        &self,
        table: &mut RecordTable,
        effect: &mut RuleEffect,
        keys: &KeyColumns,
        row: usize,
        col: usize,
        value: &str,
    ) -> bool {
        let Some(original) = set_if_changed(table, row, col, value) else {
            return false;
        };
        let column = table.columns()[col].clone();
        effect.corrected(
            Finding::correction(self.incidence_type, self.severity, self.description)
                .at_row(row)
                .column(column)
                .change(original, value)
                .with_keys(keys.capture(table, row)),
        );
        true
    }
}

/// Trim and collapse whitespace in every cell.
pub struct WhitespaceRule {
    metadata: RuleMetadata,
}

impl WhitespaceRule {
    pub fn new() -> Self {
        Self {
            metadata: RuleMetadata::new(
                "WHITESPACE",
                RulePhase::Independent,
                "Trim and collapse inner whitespace in every cell",
            ),
        }
    }
}

impl Default for WhitespaceRule {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeRule for WhitespaceRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        let keys = KeyColumns::resolve(table);
        let correction = Correction {
            incidence_type: IncidenceType::DataQuality,
            severity: Severity::Low,
            description: "Whitespace trimmed",
        };
        let mut effect = RuleEffect::new();
        for row in 0..table.len() {
            for col in 0..table.width() {
                let current = table.cell(row, col).unwrap_or_default();
                let cleaned = collapse_whitespace(current);
                if cleaned != current {
                    correction.apply(table, &mut effect, &keys, row, col, &cleaned);
                }
            }
        }
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_spellings() {
        for raw in ["", "  ", "nan", "NULL", "None"] {
            assert!(is_blank(raw), "{raw:?}");
        }
        assert!(!is_blank("0"));
    }

    #[test]
    fn category_codes_are_padded() {
        assert_eq!(category_code(" 207 "), "0207");
        assert_eq!(category_code("0301"), "0301");
        assert_eq!(category_code("A1"), "A1");
        assert!(in_scope("208", &["0207", "0208"]));
        assert!(!in_scope("", &["0207"]));
    }

    #[test]
    fn converts_to_dot_decimal() {
        assert_eq!(dot_decimal("10250,75").as_deref(), Some("10250.75"));
        assert_eq!(dot_decimal("5000.00").as_deref(), Some("5000"));
        assert_eq!(dot_decimal("1.234,50").as_deref(), Some("1234.5"));
        assert_eq!(dot_decimal("1,234.50").as_deref(), Some("1234.5"));
        assert_eq!(dot_decimal("-0,00").as_deref(), Some("0"));
        assert_eq!(dot_decimal("007").as_deref(), Some("7"));
        assert_eq!(dot_decimal("abc"), None);
        assert_eq!(dot_decimal(""), None);
        assert_eq!(parse_amount("1.500,25"), Some(1500.25));
    }

    #[test]
    fn collapses_inner_whitespace() {
        assert_eq!(collapse_whitespace("  Garantía   hipotecaria \t"), "Garantía hipotecaria");
    }

    #[test]
    fn set_if_changed_reports_previous() {
        let mut table =
            RecordTable::from_rows(vec!["A".into()], vec![vec!["x".into()]]).unwrap();
        assert_eq!(set_if_changed(&mut table, 0, 0, "x"), None);
        assert_eq!(set_if_changed(&mut table, 0, 0, "y"), Some("x".to_string()));
        assert_eq!(set_if_changed(&mut table, 3, 0, "y"), None);
    }
}
