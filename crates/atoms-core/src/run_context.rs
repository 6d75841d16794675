//! State shared by the subtypes of one run.
//!
//! Cross-subtype numbering goes through this object explicitly: the TDC
//! guarantee-number rule stores the last number it issued, and the VALORES
//! registry may be opened to continue after it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use atoms_model::Period;
use atoms_standards::SequenceSettings;

use crate::sequence::SequenceRegistry;

/// Registry namespace for credit-card guarantee numbers.
pub const TDC_SEQUENCE: &str = "tdc";
/// Registry namespace for securities guarantee numbers.
pub const VALORES_SEQUENCE: &str = "valores";

#[derive(Debug)]
pub struct RunContext {
    run_id: String,
    period: Period,
    sequences_dir: PathBuf,
    settings: SequenceSettings,
    registries: BTreeMap<String, SequenceRegistry>,
    last_issued: BTreeMap<String, i64>,
}

impl RunContext {
    pub fn new(
        run_id: impl Into<String>,
        period: Period,
        sequences_dir: impl Into<PathBuf>,
        settings: SequenceSettings,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            period,
            sequences_dir: sequences_dir.into(),
            settings,
            registries: BTreeMap::new(),
            last_issued: BTreeMap::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn sequences_dir(&self) -> &Path {
        &self.sequences_dir
    }

    /// Storage location of a namespace.
    pub fn registry_path(&self, namespace: &str) -> PathBuf {
        self.sequences_dir.join(format!("{namespace}_registry.json"))
    }

    /// First number a namespace may issue in this run.
    pub fn start_for(&self, namespace: &str) -> i64 {
        match namespace {
            TDC_SEQUENCE => self.settings.tdc_start,
            VALORES_SEQUENCE => {
                let start = self.settings.valores_start;
                match self.last_issued(TDC_SEQUENCE) {
                    Some(tdc_last) if self.settings.valores_follows_tdc => start.max(tdc_last + 1),
                    _ => start,
                }
            }
            _ => 1,
        }
    }

    /// Registry for `namespace`, opened on first use.
    pub fn registry(&mut self, namespace: &str) -> &mut SequenceRegistry {
        let path = self.registry_path(namespace);
        let start = self.start_for(namespace);
        self.registries
            .entry(namespace.to_string())
            .or_insert_with(|| SequenceRegistry::open(path, start))
    }

    /// Remember the last number `namespace` issued in this run.
    pub fn record_last_issued(&mut self, namespace: &str, number: i64) {
        self.last_issued.insert(namespace.to_string(), number);
    }

    pub fn last_issued(&self, namespace: &str) -> Option<i64> {
        self.last_issued.get(namespace).copied()
    }
}
