//! Incidence recorder: the audit trail of a run.
//!
//! Rules describe what they changed as [`Finding`]s; the cascade stamps each
//! one with the run, subtype and rule and stores it here as an immutable
//! [`Incidence`].

use std::collections::BTreeMap;

use atoms_model::{Incidence, IncidenceSummary, IncidenceType, RecordTable, Resolution, Severity};
use chrono::Utc;

/// A change or violation reported by a rule, before it is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub incidence_type: IncidenceType,
    pub severity: Severity,
    pub resolution: Resolution,
    pub description: String,
    pub record_index: Option<usize>,
    pub column: Option<String>,
    pub original: Option<String>,
    pub corrected: Option<String>,
    pub keys: Vec<(String, String)>,
    pub metadata: BTreeMap<String, String>,
}

impl Finding {
    /// A value that was rewritten.
    pub fn correction(
        incidence_type: IncidenceType,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self::new(incidence_type, severity, Resolution::Corrected, description)
    }

    /// A record that was reported or removed without rewriting a cell.
    pub fn flag(
        incidence_type: IncidenceType,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self::new(incidence_type, severity, Resolution::Flagged, description)
    }

    fn new(
        incidence_type: IncidenceType,
        severity: Severity,
        resolution: Resolution,
        description: impl Into<String>,
    ) -> Self {
        Self {
            incidence_type,
            severity,
            resolution,
            description: description.into(),
            record_index: None,
            column: None,
            original: None,
            corrected: None,
            keys: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn at_row(mut self, index: usize) -> Self {
        self.record_index = Some(index);
        self
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column = Some(name.into());
        self
    }

    pub fn change(mut self, original: impl Into<String>, corrected: impl Into<String>) -> Self {
        self.original = Some(original.into());
        self.corrected = Some(corrected.into());
        self
    }

    pub fn with_keys(mut self, keys: Vec<(String, String)>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// How exported incidences are split into tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncidenceGrouping {
    #[default]
    Rule,
    Subtype,
    /// `{subtype}_{rule}`.
    SubtypeAndRule,
}

impl IncidenceGrouping {
    pub fn group_of(&self, incidence: &Incidence) -> String {
        match self {
            Self::Rule => incidence.rule_name.clone(),
            Self::Subtype => incidence.subtype.clone(),
            Self::SubtypeAndRule => format!("{}_{}", incidence.subtype, incidence.rule_name),
        }
    }
}

/// One exported incidence table.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceGroup {
    pub name: String,
    pub table: RecordTable,
}

const LEADING_COLUMNS: [&str; 3] = ["incidence_id", "subtype", "record_index"];
const TRAILING_COLUMNS: [&str; 7] = [
    "column_name",
    "original_value",
    "corrected_value",
    "rule_name",
    "severity",
    "incidence_type",
    "description",
];

/// Append-only store of the incidences of one run.
#[derive(Debug)]
pub struct IncidenceRecorder {
    run_id: String,
    period: String,
    incidences: Vec<Incidence>,
    next_by_subtype: BTreeMap<String, usize>,
}

impl IncidenceRecorder {
    pub fn new(run_id: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            period: period.into(),
            incidences: Vec::new(),
            next_by_subtype: BTreeMap::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn period(&self) -> &str {
        &self.period
    }

    /// Store `finding` and return its id, `{run_id}_{period}_{subtype}_{n:06}`
    /// with `n` counting from 1 within the subtype.
    pub fn record(&mut self, subtype: &str, rule_name: &str, finding: Finding) -> String {
        let next = self.next_by_subtype.entry(subtype.to_string()).or_insert(1);
        let incidence_id = format!("{}_{}_{}_{:06}", self.run_id, self.period, subtype, next);
        *next += 1;

        self.incidences.push(Incidence {
            incidence_id: incidence_id.clone(),
            timestamp: Utc::now(),
            run_id: self.run_id.clone(),
            period: self.period.clone(),
            subtype: subtype.to_string(),
            rule_name: rule_name.to_string(),
            incidence_type: finding.incidence_type,
            severity: finding.severity,
            resolution: finding.resolution,
            record_index: finding.record_index,
            column_name: finding.column,
            original_value: finding.original,
            corrected_value: finding.corrected,
            description: finding.description,
            keys: finding.keys,
            metadata: finding.metadata,
        });
        incidence_id
    }

    pub fn all(&self) -> &[Incidence] {
        &self.incidences
    }

    pub fn len(&self) -> usize {
        self.incidences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidences.is_empty()
    }

    pub fn for_subtype<'a>(&'a self, subtype: &'a str) -> impl Iterator<Item = &'a Incidence> + 'a {
        self.incidences
            .iter()
            .filter(move |incidence| incidence.subtype == subtype)
    }

    pub fn for_rule<'a>(&'a self, rule_name: &'a str) -> impl Iterator<Item = &'a Incidence> + 'a {
        self.incidences
            .iter()
            .filter(move |incidence| incidence.rule_name == rule_name)
    }

    /// Forget everything recorded for `subtype`, e.g. after its processing
    /// failed and none of its corrections were exported.
    pub fn discard_subtype(&mut self, subtype: &str) -> usize {
        let before = self.incidences.len();
        self.incidences.retain(|incidence| incidence.subtype != subtype);
        self.next_by_subtype.remove(subtype);
        before - self.incidences.len()
    }

    pub fn summary(&self) -> IncidenceSummary {
        IncidenceSummary::from_incidences(&self.incidences)
    }

    /// One flat table per group, groups in first-seen order.
    ///
    /// Key columns are the union of the incidences' key names, in first-seen
    /// order, between `record_index` and `column_name`.
    pub fn export(&self, grouping: IncidenceGrouping) -> Vec<IncidenceGroup> {
        let mut order: Vec<String> = Vec::new();
        let mut members: BTreeMap<String, Vec<&Incidence>> = BTreeMap::new();
        for incidence in &self.incidences {
            let group = grouping.group_of(incidence);
            if !members.contains_key(&group) {
                order.push(group.clone());
            }
            members.entry(group).or_default().push(incidence);
        }

        order
            .into_iter()
            .filter_map(|name| {
                let incidences = members.remove(&name)?;
                Some(IncidenceGroup {
                    table: incidence_table(&incidences),
                    name,
                })
            })
            .collect()
    }
}

fn incidence_table(incidences: &[&Incidence]) -> RecordTable {
    let mut key_names: Vec<&str> = Vec::new();
    for incidence in incidences {
        for (name, _) in &incidence.keys {
            if !key_names.contains(&name.as_str()) {
                key_names.push(name);
            }
        }
    }

    let columns = LEADING_COLUMNS
        .iter()
        .copied()
        .chain(key_names.iter().copied())
        .chain(TRAILING_COLUMNS.iter().copied())
        .map(str::to_string);
    let mut table = RecordTable::new(columns);
    let width = table.width();

    for incidence in incidences {
        let mut row = Vec::with_capacity(width);
        row.push(incidence.incidence_id.clone());
        row.push(incidence.subtype.clone());
        row.push(
            incidence
                .record_index
                .map(|idx| idx.to_string())
                .unwrap_or_default(),
        );
        for name in &key_names {
            row.push(incidence.key(name).unwrap_or_default().to_string());
        }
        row.push(incidence.column_name.clone().unwrap_or_default());
        row.push(incidence.original_value.clone().unwrap_or_default());
        row.push(incidence.corrected_value.clone().unwrap_or_default());
        row.push(incidence.rule_name.clone());
        row.push(incidence.severity.as_str().to_string());
        row.push(incidence.incidence_type.as_str().to_string());
        row.push(incidence.description.clone());
        // Key names never collide with the fixed columns, so the width always matches.
        if table.push_row(row).is_err() {
            tracing::error!(incidence = %incidence.incidence_id, "incidence row width mismatch");
        }
    }
    table
}
