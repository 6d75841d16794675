//! Input discovery by filename.
//!
//! Inputs are named `{SUBTYPE}_{YYYYMMDD}.{CSV|TXT}`, optionally with a
//! `__run-{id}` suffix before the extension. Matching is case-insensitive and
//! subtype aliases are resolved through the [`SubtypeCatalog`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use atoms_model::{Period, Subtype};
use atoms_standards::SubtypeCatalog;
use chrono::NaiveDate;

use crate::error::{IngestError, Result};

const EXTENSIONS: [&str; 2] = ["CSV", "TXT"];

/// Parsed parts of an input filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputName {
    pub subtype: Subtype,
    pub date: NaiveDate,
    pub run: Option<String>,
}

/// Parse an input filename, or `None` when it does not follow the contract.
pub fn parse_input_name(file_name: &str, catalog: &SubtypeCatalog) -> Option<InputName> {
    let upper = file_name.trim().to_ascii_uppercase();
    let (stem, extension) = upper.rsplit_once('.')?;
    if !EXTENSIONS.contains(&extension) {
        return None;
    }

    for prefix in catalog.filename_prefixes() {
        let Some(rest) = stem
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
        else {
            continue;
        };
        if rest.len() < 8 || !rest.is_char_boundary(8) {
            continue;
        }
        let (digits, suffix) = rest.split_at(8);
        let Ok(date) = NaiveDate::parse_from_str(digits, "%Y%m%d") else {
            continue;
        };
        let run = match suffix {
            "" => None,
            _ => match suffix.strip_prefix("__RUN-") {
                Some(id) if !id.is_empty() => Some(id.to_string()),
                _ => continue,
            },
        };
        let subtype = catalog.resolve(&prefix)?;
        return Some(InputName { subtype, date, run });
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub name: InputName,
}

/// Selected inputs for one period.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub files: BTreeMap<Subtype, DiscoveredFile>,
    /// Files that looked like inputs but were superseded or out of period.
    pub ignored: Vec<PathBuf>,
    /// Files whose name does not follow the contract.
    pub unrecognized: Vec<PathBuf>,
}

impl Discovery {
    pub fn get(&self, subtype: &Subtype) -> Option<&DiscoveredFile> {
        self.files.get(subtype)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Lists regular files in `dir`, sorted by filename.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Find the input file for each subtype in `dir` for `period`.
///
/// When several files exist for one subtype the latest date wins; equal
/// dates keep the first in filename order.
pub fn discover_inputs(dir: &Path, period: Period, catalog: &SubtypeCatalog) -> Result<Discovery> {
    let mut discovery = Discovery::default();
    for path in list_files(dir)? {
        let Some(name) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| parse_input_name(n, catalog))
        else {
            discovery.unrecognized.push(path);
            continue;
        };
        if !period.contains(name.date) {
            tracing::warn!(
                path = %path.display(),
                period = %period,
                "input date outside the requested period; ignored"
            );
            discovery.ignored.push(path);
            continue;
        }

        let candidate = DiscoveredFile { path, name };
        match discovery.files.get_mut(&candidate.name.subtype) {
            Some(current) if candidate.name.date > current.name.date => {
                let replaced = std::mem::replace(current, candidate);
                discovery.ignored.push(replaced.path);
            }
            Some(_) => discovery.ignored.push(candidate.path),
            None => {
                discovery
                    .files
                    .insert(candidate.name.subtype.clone(), candidate);
            }
        }
    }
    tracing::info!(
        dir = %dir.display(),
        found = discovery.files.len(),
        ignored = discovery.ignored.len(),
        "discovered inputs"
    );
    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_plain_and_run_suffixed_names() {
        let catalog = SubtypeCatalog::new();
        let plain = parse_input_name("BASE_AT12_20250131.CSV", &catalog).unwrap();
        assert_eq!(plain.subtype.as_str(), "BASE_AT12");
        assert_eq!(plain.date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(plain.run, None);

        let run = parse_input_name("garantias_autos_at12_20250131__run-202501.txt", &catalog)
            .unwrap();
        assert_eq!(run.subtype.as_str(), "GARANTIA_AUTOS_AT12");
        assert_eq!(run.run.as_deref(), Some("202501"));
    }

    #[test]
    fn rejects_names_off_contract() {
        let catalog = SubtypeCatalog::new();
        for name in [
            "BASE_AT12_2025013.CSV",
            "BASE_AT12_20250132.CSV",
            "BASE_AT12_20250131.XLSX",
            "BASE_AT12_20250131_extra.CSV",
            "UNKNOWN_20250131.CSV",
        ] {
            assert!(parse_input_name(name, &catalog).is_none(), "{name}");
        }
    }

    #[test]
    fn latest_date_wins() {
        let dir = TempDir::new().unwrap();
        for name in [
            "BASE_AT12_20250115.CSV",
            "BASE_AT12_20250131.CSV",
            "BASE_AT12_20241231.CSV",
            "AT03_CREDITOS_20250131.TXT",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), "A\n1\n").unwrap();
        }
        let period = Period::parse("202501").unwrap();
        let found = discover_inputs(dir.path(), period, &SubtypeCatalog::new()).unwrap();

        let base = found.get(&Subtype::new("BASE_AT12").unwrap()).unwrap();
        assert!(base.path.ends_with("BASE_AT12_20250131.CSV"));
        assert_eq!(found.files.len(), 2);
        assert_eq!(found.ignored.len(), 2);
        assert_eq!(found.unrecognized.len(), 1);
    }
}
