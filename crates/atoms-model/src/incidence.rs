use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a detected issue or applied correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidenceType {
    DataQuality,
    ValidationFailure,
    BusinessRuleViolation,
    TransformationError,
    HeaderMismatch,
    TypeConversionError,
    DuplicateRecord,
    MissingRequiredField,
    InvalidFormat,
    ThresholdViolation,
}

impl IncidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataQuality => "DATA_QUALITY",
            Self::ValidationFailure => "VALIDATION_FAILURE",
            Self::BusinessRuleViolation => "BUSINESS_RULE_VIOLATION",
            Self::TransformationError => "TRANSFORMATION_ERROR",
            Self::HeaderMismatch => "HEADER_MISMATCH",
            Self::TypeConversionError => "TYPE_CONVERSION_ERROR",
            Self::DuplicateRecord => "DUPLICATE_RECORD",
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::ThresholdViolation => "THRESHOLD_VIOLATION",
        }
    }
}

impl fmt::Display for IncidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the offending value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    /// The value was rewritten.
    Corrected,
    /// The record was reported or removed but no cell was rewritten.
    Flagged,
}

/// One audit record. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incidence {
    pub incidence_id: String,
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub period: String,
    pub subtype: String,
    pub rule_name: String,
    pub incidence_type: IncidenceType,
    pub severity: Severity,
    pub resolution: Resolution,
    pub record_index: Option<usize>,
    pub column_name: Option<String>,
    pub original_value: Option<String>,
    pub corrected_value: Option<String>,
    pub description: String,
    /// Identifying fields of the affected record, in capture order.
    #[serde(default)]
    pub keys: Vec<(String, String)>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Incidence {
    pub fn key(&self, name: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Incidence counts for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidenceSummary {
    pub total: usize,
    pub by_subtype: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_rule: BTreeMap<String, usize>,
}

impl IncidenceSummary {
    pub fn from_incidences<'a, I>(incidences: I) -> Self
    where
        I: IntoIterator<Item = &'a Incidence>,
    {
        let mut summary = Self::default();
        for incidence in incidences {
            summary.total += 1;
            *summary
                .by_subtype
                .entry(incidence.subtype.clone())
                .or_default() += 1;
            *summary
                .by_type
                .entry(incidence.incidence_type.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_severity
                .entry(incidence.severity.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_rule
                .entry(incidence.rule_name.clone())
                .or_default() += 1;
        }
        summary
    }
}
