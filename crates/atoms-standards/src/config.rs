//! Run configuration.
//!
//! Loaded from an optional TOML file, then overridden by `ATOMS_*`
//! environment variables. Every section defaults independently, so a file
//! only needs the keys it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StandardsError};
use crate::schema::default_schema_path;

/// Lowest and highest accepted fuzzy header similarity.
pub const FUZZY_THRESHOLD_RANGE: (f64, f64) = (0.75, 0.78);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub paths: PathSettings,
    pub input: InputSettings,
    pub output: OutputSettings,
    pub matching: MatchingSettings,
    pub sequences: SequenceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub schema_file: PathBuf,
    /// Extra alias tables merged over the built-in ones.
    pub synonyms_file: Option<PathBuf>,
    pub sequences_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source"),
            output_dir: PathBuf::from("transforms"),
            schema_file: default_schema_path(),
            synonyms_file: None,
            sequences_dir: PathBuf::from("state/sequences"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Input delimiter; `None` sniffs it from the header line.
    pub delimiter: Option<char>,
    /// `encoding_rs` label used when a file is not valid UTF-8.
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub delimiter: char,
    pub quote_all: bool,
    pub trailing_delimiter: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            delimiter: '|',
            quote_all: true,
            trailing_delimiter: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    pub fuzzy_threshold: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: FUZZY_THRESHOLD_RANGE.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceSettings {
    pub tdc_start: i64,
    pub valores_start: i64,
    /// Start VALORES numbering after the last TDC number issued in the same run.
    pub valores_follows_tdc: bool,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            tdc_start: 855_500,
            valores_start: 1,
            valores_follows_tdc: false,
        }
    }
}

impl RunConfig {
    /// Read `path` if given, otherwise start from defaults; then apply the
    /// process environment and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
        let config: Self = toml::from_str(&text).map_err(|source| StandardsError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded run configuration");
        Ok(config)
    }

    /// Apply `ATOMS_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("ATOMS_SOURCE_DIR") {
            self.paths.source_dir = PathBuf::from(value);
        }
        if let Some(value) = get("ATOMS_OUTPUT_DIR") {
            self.paths.output_dir = PathBuf::from(value);
        }
        if let Some(value) = get("ATOMS_SCHEMA_FILE") {
            self.paths.schema_file = PathBuf::from(value);
        }
        if let Some(value) = get("ATOMS_SYNONYMS_FILE") {
            self.paths.synonyms_file = Some(PathBuf::from(value));
        }
        if let Some(value) = get("ATOMS_SEQUENCES_DIR") {
            self.paths.sequences_dir = PathBuf::from(value);
        }
        if let Some(value) = get("ATOMS_INPUT_DELIMITER") {
            self.input.delimiter = Some(parse_delimiter("ATOMS_INPUT_DELIMITER", &value)?);
        }
        if let Some(value) = get("ATOMS_ENCODING") {
            self.input.encoding = Some(value);
        }
        if let Some(value) = get("ATOMS_OUTPUT_DELIMITER") {
            self.output.delimiter = parse_delimiter("ATOMS_OUTPUT_DELIMITER", &value)?;
        }
        if let Some(value) = get("ATOMS_QUOTE_ALL") {
            self.output.quote_all = parse_bool("ATOMS_QUOTE_ALL", &value)?;
        }
        if let Some(value) = get("ATOMS_TRAILING_DELIMITER") {
            self.output.trailing_delimiter = parse_bool("ATOMS_TRAILING_DELIMITER", &value)?;
        }
        if let Some(value) = get("ATOMS_FUZZY_THRESHOLD") {
            self.matching.fuzzy_threshold = value
                .trim()
                .parse()
                .map_err(|_| StandardsError::config("ATOMS_FUZZY_THRESHOLD", "not a number"))?;
        }
        if let Some(value) = get("ATOMS_TDC_SEQUENCE_START") {
            self.sequences.tdc_start = parse_int("ATOMS_TDC_SEQUENCE_START", &value)?;
        }
        if let Some(value) = get("ATOMS_VALORES_SEQUENCE_START") {
            self.sequences.valores_start = parse_int("ATOMS_VALORES_SEQUENCE_START", &value)?;
        }
        if let Some(value) = get("ATOMS_VALORES_FOLLOWS_TDC") {
            self.sequences.valores_follows_tdc =
                parse_bool("ATOMS_VALORES_FOLLOWS_TDC", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(delimiter) = self.input.delimiter {
            check_delimiter("input.delimiter", delimiter)?;
        }
        check_delimiter("output.delimiter", self.output.delimiter)?;

        let (low, high) = FUZZY_THRESHOLD_RANGE;
        let threshold = self.matching.fuzzy_threshold;
        if !(low..=high).contains(&threshold) {
            return Err(StandardsError::config(
                "matching.fuzzy_threshold",
                format!("{threshold} outside [{low}, {high}]"),
            ));
        }
        if self.sequences.tdc_start < 1 {
            return Err(StandardsError::config("sequences.tdc_start", "must be >= 1"));
        }
        if self.sequences.valores_start < 1 {
            return Err(StandardsError::config(
                "sequences.valores_start",
                "must be >= 1",
            ));
        }
        Ok(())
    }
}

fn check_delimiter(key: &str, delimiter: char) -> Result<()> {
    if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' || delimiter == '\r' {
        return Err(StandardsError::config(
            key,
            format!("{delimiter:?} is not a usable delimiter"),
        ));
    }
    Ok(())
}

fn parse_delimiter(key: &str, value: &str) -> Result<char> {
    if value.eq_ignore_ascii_case("tab") || value == "\\t" {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(StandardsError::config(key, "expected a single character")),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StandardsError::config(key, "expected true or false")),
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| StandardsError::config(key, "not an integer"))
}
