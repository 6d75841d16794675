//! Canonical schema document.
//!
//! The document is a JSON object keyed by subtype. Each entry is either an
//! object whose key order is the canonical column order (the values describe
//! the column and are not interpreted here) or a plain array of names:
//!
//! ```json
//! {
//!   "BASE_AT12": { "Fecha": {"type": "date"}, "Codigo_Banco": {}, "Numero_Prestamo": {} },
//!   "AT03_CREDITOS": ["fec_proceso", "num_cta", "fec_ini_prestamo", "saldo"]
//! }
//! ```
//!
//! A malformed entry only poisons its own subtype: the rest of the document
//! still loads and [`SchemaRegistry::schema`] reports the problem when the
//! broken subtype is requested.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::Value;

use atoms_model::{Subtype, column_key};

use crate::error::{Result, StandardsError};

const SCHEMA_ENV_VAR: &str = "ATOMS_SCHEMA_FILE";

/// Location of the bundled schema document, overridable via `ATOMS_SCHEMA_FILE`.
pub fn default_schema_path() -> PathBuf {
    if let Ok(path) = std::env::var(SCHEMA_ENV_VAR) {
        return PathBuf::from(path);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../schemas/AT12/schema_headers.json")
}

/// Ordered, authoritative column list for one subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSchema {
    subtype: Subtype,
    columns: Vec<String>,
}

impl CanonicalSchema {
    pub fn new(subtype: Subtype, columns: Vec<String>) -> Result<Self> {
        validate_columns(&subtype, &columns)?;
        Ok(Self { subtype, columns })
    }

    pub fn subtype(&self) -> &Subtype {
        &self.subtype
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn validate_columns(subtype: &Subtype, columns: &[String]) -> Result<()> {
    let malformed = |message: String| StandardsError::MalformedSchema {
        subtype: subtype.to_string(),
        message,
    };
    if columns.is_empty() {
        return Err(malformed("no columns".to_string()));
    }
    let mut seen = HashSet::new();
    for name in columns {
        if name.trim().is_empty() {
            return Err(malformed("empty column name".to_string()));
        }
        if !seen.insert(column_key(name)) {
            return Err(malformed(format!("duplicate column {name:?}")));
        }
    }
    Ok(())
}

/// All canonical schemas of a run, resolved once.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<Subtype, CanonicalSchema>,
    malformed: BTreeMap<Subtype, String>,
    source: Option<PathBuf>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
        let value: Value = serde_json::from_str(&text).map_err(|source| StandardsError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let mut registry = Self::from_value(&value)?;
        registry.source = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            subtypes = registry.schemas.len(),
            malformed = registry.malformed.len(),
            "loaded canonical schemas"
        );
        Ok(registry)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(entries) = value else {
            return Err(StandardsError::InvalidSchemaDocument);
        };
        let mut registry = Self::new();
        for (name, entry) in entries {
            let subtype = match Subtype::new(name.as_str()) {
                Ok(subtype) => subtype,
                Err(err) => {
                    tracing::warn!(key = %name, error = %err, "ignoring schema entry");
                    continue;
                }
            };
            match parse_entry(entry).and_then(|columns| CanonicalSchema::new(subtype.clone(), columns))
            {
                Ok(schema) => {
                    registry.schemas.insert(subtype, schema);
                }
                Err(err) => {
                    let message = match err {
                        StandardsError::MalformedSchema { message, .. } => message,
                        other => other.to_string(),
                    };
                    tracing::error!(subtype = %subtype, %message, "malformed canonical schema");
                    registry.malformed.insert(subtype, message);
                }
            }
        }
        Ok(registry)
    }

    pub fn insert(&mut self, schema: CanonicalSchema) {
        self.malformed.remove(schema.subtype());
        self.schemas.insert(schema.subtype().clone(), schema);
    }

    pub fn schema(&self, subtype: &Subtype) -> Result<&CanonicalSchema> {
        if let Some(schema) = self.schemas.get(subtype) {
            return Ok(schema);
        }
        if let Some(message) = self.malformed.get(subtype) {
            return Err(StandardsError::MalformedSchema {
                subtype: subtype.to_string(),
                message: message.clone(),
            });
        }
        Err(StandardsError::UnknownSubtype {
            subtype: subtype.to_string(),
        })
    }

    pub fn subtypes(&self) -> impl Iterator<Item = &Subtype> {
        self.schemas.keys()
    }

    pub fn malformed(&self) -> impl Iterator<Item = (&Subtype, &str)> {
        self.malformed
            .iter()
            .map(|(subtype, message)| (subtype, message.as_str()))
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn parse_entry(entry: &Value) -> Result<Vec<String>> {
    let malformed = |message: &str| StandardsError::MalformedSchema {
        subtype: String::new(),
        message: message.to_string(),
    };
    match entry {
        Value::Object(columns) => Ok(columns.keys().cloned().collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed("column names must be strings"))
            })
            .collect(),
        _ => Err(malformed("entry must be an object or an array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subtype(name: &str) -> Subtype {
        Subtype::new(name).unwrap()
    }

    #[test]
    fn object_entries_keep_key_order() {
        let doc = json!({
            "BASE_AT12": {"Fecha": {}, "Codigo_Banco": {}, "Numero_Prestamo": {}, "Aardvark": {}}
        });
        let registry = SchemaRegistry::from_value(&doc).unwrap();
        let schema = registry.schema(&subtype("BASE_AT12")).unwrap();
        assert_eq!(
            schema.columns(),
            ["Fecha", "Codigo_Banco", "Numero_Prestamo", "Aardvark"]
        );
    }

    #[test]
    fn malformed_entry_is_isolated() {
        let doc = json!({
            "BASE_AT12": ["Fecha", "Numero_Prestamo"],
            "TDC_AT12": 42,
            "VALORES_AT12": [],
            "SOBREGIRO_AT12": ["Número", "Numero"]
        });
        let registry = SchemaRegistry::from_value(&doc).unwrap();
        assert!(registry.schema(&subtype("BASE_AT12")).is_ok());
        for name in ["TDC_AT12", "VALORES_AT12", "SOBREGIRO_AT12"] {
            let err = registry.schema(&subtype(name)).unwrap_err();
            assert!(matches!(err, StandardsError::MalformedSchema { .. }), "{name}");
        }
        assert_eq!(registry.malformed().count(), 3);
        assert!(matches!(
            registry.schema(&subtype("AT02_CUENTAS")),
            Err(StandardsError::UnknownSubtype { .. })
        ));
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(matches!(
            SchemaRegistry::from_value(&json!(["BASE_AT12"])),
            Err(StandardsError::InvalidSchemaDocument)
        ));
    }
}
