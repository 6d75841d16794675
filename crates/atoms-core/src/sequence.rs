//! Persistent sequence registry.
//!
//! Each namespace is one JSON document:
//!
//! ```json
//! { "last_issued": 855502, "assignments": { "<natural key>": 855501 } }
//! ```
//!
//! The document is rewritten (temp file + rename) after every new
//! assignment, before the number is handed out. The registry is not safe
//! for concurrent writers; runs sharing a state directory must be serialized.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SequenceError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SequenceState {
    #[serde(alias = "last_number")]
    last_issued: i64,
    #[serde(default)]
    assignments: BTreeMap<String, i64>,
}

#[derive(Debug)]
pub struct SequenceRegistry {
    path: PathBuf,
    state: SequenceState,
}

impl SequenceRegistry {
    /// Load the registry stored at `path`.
    ///
    /// A missing document starts at `start`. An unreadable or corrupt one is
    /// logged and replaced by the initial state on the next assignment.
    /// `start` also acts as a floor: numbering never resumes below it.
    pub fn open(path: impl Into<PathBuf>, start: i64) -> Self {
        let path = path.into();
        let mut state = match load_state(&path) {
            Ok(Some(state)) => state,
            Ok(None) => SequenceState::default(),
            Err(message) => {
                tracing::error!(
                    path = %path.display(),
                    error = %message,
                    "sequence state unreadable; starting fresh"
                );
                SequenceState::default()
            }
        };
        let highest = state.assignments.values().copied().max().unwrap_or(0);
        state.last_issued = state.last_issued.max(highest).max(start - 1);
        tracing::debug!(
            path = %path.display(),
            last_issued = state.last_issued,
            assignments = state.assignments.len(),
            "opened sequence registry"
        );
        Self { path, state }
    }

    /// Number for `natural_key`, assigning and persisting the next one when
    /// the key is new. Calling it again with the same key returns the same
    /// number, in this run and in later ones.
    pub fn get_or_assign(&mut self, natural_key: &str) -> Result<i64, SequenceError> {
        if let Some(number) = self.state.assignments.get(natural_key) {
            return Ok(*number);
        }
        let number = self.state.last_issued + 1;
        self.state.last_issued = number;
        self.state
            .assignments
            .insert(natural_key.to_string(), number);
        if let Err(err) = self.persist() {
            self.state.assignments.remove(natural_key);
            self.state.last_issued = number - 1;
            return Err(err);
        }
        Ok(number)
    }

    pub fn peek(&self, natural_key: &str) -> Option<i64> {
        self.state.assignments.get(natural_key).copied()
    }

    pub fn last_issued(&self) -> i64 {
        self.state.last_issued
    }

    pub fn len(&self) -> usize {
        self.state.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.assignments.is_empty()
    }

    fn persist(&self) -> Result<(), SequenceError> {
        let bytes = serde_json::to_vec_pretty(&self.state).map_err(|source| {
            SequenceError::Encode {
                path: self.path.clone(),
                source,
            }
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SequenceError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        let written = write_synced(&temp_path, &bytes)
            .map_err(|(operation, source)| SequenceError::Io {
                operation,
                path: temp_path.clone(),
                source,
            })
            .and_then(|()| {
                fs::rename(&temp_path, &self.path).map_err(|source| {
                    SequenceError::AtomicWriteFailed {
                        temp_path: temp_path.clone(),
                        target_path: self.path.clone(),
                        source,
                    }
                })
            });
        if written.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        written
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), (&'static str, std::io::Error)> {
    let mut file = File::create(path).map_err(|e| ("create", e))?;
    file.write_all(bytes).map_err(|e| ("write", e))?;
    file.sync_all().map_err(|e| ("sync", e))
}

fn load_state(path: &Path) -> Result<Option<SequenceState>, String> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn same_key_same_number() {
        let dir = TempDir::new().unwrap();
        let mut registry = SequenceRegistry::open(dir.path().join("tdc.json"), 855_500);
        assert_eq!(registry.last_issued(), 855_499);

        let first = registry.get_or_assign("K").unwrap();
        assert_eq!(registry.get_or_assign("K").unwrap(), first);
        assert_eq!(first, 855_500);
        assert_eq!(registry.peek("K"), Some(855_500));
        assert_eq!(registry.peek("other"), None);
    }

    #[test]
    fn new_keys_are_consecutive() {
        let dir = TempDir::new().unwrap();
        let mut registry = SequenceRegistry::open(dir.path().join("s.json"), 1);
        let a = registry.get_or_assign("A").unwrap();
        let b = registry.get_or_assign("B").unwrap();
        assert_eq!(b, a + 1);
        assert_eq!(registry.last_issued(), b);
    }

    #[test]
    fn reads_legacy_field_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.json");
        std::fs::write(
            &path,
            r#"{"last_number": 852265, "assignments": {"X": 852260}}"#,
        )
        .unwrap();
        let mut registry = SequenceRegistry::open(&path, 1);
        assert_eq!(registry.peek("X"), Some(852_260));
        assert_eq!(registry.get_or_assign("Y").unwrap(), 852_266);
    }

    #[test]
    fn corrupt_state_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let mut registry = SequenceRegistry::open(&path, 10);
        assert!(registry.is_empty());
        assert_eq!(registry.get_or_assign("A").unwrap(), 10);

        let reopened = SequenceRegistry::open(&path, 10);
        assert_eq!(reopened.peek("A"), Some(10));
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tdc.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let mut registry = SequenceRegistry::open(&path, 100);
        let err = registry.get_or_assign("K").unwrap_err();
        assert!(matches!(err, SequenceError::AtomicWriteFailed { .. }));
        assert!(!dir.path().join("tdc.json.tmp").exists());
        assert_eq!(registry.peek("K"), None);
        assert_eq!(registry.last_issued(), 99);
    }

    #[test]
    fn start_is_a_floor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("valores.json");
        let mut registry = SequenceRegistry::open(&path, 1);
        registry.get_or_assign("A").unwrap();

        let mut raised = SequenceRegistry::open(&path, 900);
        assert_eq!(raised.get_or_assign("A").unwrap(), 1);
        assert_eq!(raised.get_or_assign("B").unwrap(), 900);
    }
}
