//! Mapping report produced by the standardizer.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Exact,
    Synonym,
    Fuzzy,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Synonym => "synonym",
            Self::Fuzzy => "fuzzy",
        }
    }
}

/// A canonical column and the input column that claimed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMatch {
    pub canonical: String,
    pub source: String,
    pub method: MatchMethod,
    /// Similarity of a fuzzy match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingReport {
    pub subtype: String,
    /// Claimed canonical columns, in canonical order.
    pub matched: Vec<ColumnMatch>,
    /// Canonical columns no input column claimed; filled empty.
    pub added: Vec<String>,
    /// Input columns left unclaimed; excluded from output.
    pub dropped: Vec<String>,
}

impl MappingReport {
    pub fn new(subtype: impl Into<String>) -> Self {
        Self {
            subtype: subtype.into(),
            ..Self::default()
        }
    }

    pub fn count(&self, method: MatchMethod) -> usize {
        self.matched
            .iter()
            .filter(|entry| entry.method == method)
            .count()
    }

    pub fn source_for(&self, canonical: &str) -> Option<&ColumnMatch> {
        self.matched
            .iter()
            .find(|entry| entry.canonical == canonical)
    }

    /// True when every canonical column was claimed and nothing was dropped.
    pub fn is_complete(&self) -> bool {
        self.added.is_empty() && self.dropped.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
