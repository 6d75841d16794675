//! Header alias tables.
//!
//! Aliases are stored under their folded comparison key
//! ([`atoms_model::column_key`]), so `cod_banco`, `COD BANCO` and `Cód_Banco`
//! all hit the same entry.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use atoms_model::{Subtype, column_key};

use crate::catalog::TDC_AT12;
use crate::error::{Result, StandardsError};

/// Alias spellings that apply to every subtype.
const GLOBAL_SYNONYMS: &[(&str, &str)] = &[
    ("NUM_PRESTAMO", "Numero_Prestamo"),
    ("NRO_PRESTAMO", "Numero_Prestamo"),
    ("TIPO_GTIA", "Tipo_Garantia"),
    ("ID_DOC", "Id_Documento"),
];

const TDC_SYNONYMS: &[(&str, &str)] = &[
    ("COD_BANCO", "Código_Banco"),
    ("CODIGO_BANCO", "Código_Banco"),
    ("NUM_PRESTAMO", "Número_Préstamo"),
    ("NUMERO_PRESTAMO", "Número_Préstamo"),
    ("NUM_RUC_GARANTIA", "Número_Ruc_Garantía"),
    ("COD_REGION", "Código_Región"),
    ("NUM_GARANTIA", "Número_Garantía"),
    ("NUM_CIS_GARANTIA", "Número_Cis_Garantía"),
    ("DESCRIPCION_DE_LA_GARANTIA", "Descripción de la Garantía"),
];

/// Alias → canonical column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymTable {
    entries: BTreeMap<String, String>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut table = Self::new();
        for (alias, canonical) in pairs {
            table.insert(alias, canonical);
        }
        table
    }

    pub fn insert(&mut self, alias: &str, canonical: &str) {
        self.entries
            .insert(column_key(alias), canonical.to_string());
    }

    /// Canonical name an input column is an alias of.
    pub fn lookup(&self, column: &str) -> Option<&str> {
        self.entries.get(&column_key(column)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn extend(&mut self, other: &SynonymTable) {
        for (key, canonical) in &other.entries {
            self.entries.insert(key.clone(), canonical.clone());
        }
    }
}

/// Global plus per-subtype alias tables.
#[derive(Debug, Clone, Default)]
pub struct SynonymCatalog {
    global: SynonymTable,
    by_subtype: BTreeMap<Subtype, SynonymTable>,
}

impl SynonymCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in tables for known header variants.
    pub fn builtin() -> Self {
        let mut catalog = Self {
            global: SynonymTable::from_pairs(GLOBAL_SYNONYMS),
            by_subtype: BTreeMap::new(),
        };
        if let Ok(tdc) = Subtype::new(TDC_AT12) {
            catalog
                .by_subtype
                .insert(tdc, SynonymTable::from_pairs(TDC_SYNONYMS));
        }
        catalog
    }

    /// Merge a JSON document `{"<SUBTYPE>" | "*": {"<alias>": "<canonical>"}}`.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
        let value: Value = serde_json::from_str(&text).map_err(|source| StandardsError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_value(&value)
    }

    pub fn merge_value(&mut self, value: &Value) -> Result<()> {
        let invalid = |message: String| StandardsError::InvalidSynonyms { message };
        let Value::Object(groups) = value else {
            return Err(invalid("document must be an object".to_string()));
        };
        for (group, entries) in groups {
            let Value::Object(entries) = entries else {
                return Err(invalid(format!("group {group:?} must be an object")));
            };
            let table = if group == "*" {
                &mut self.global
            } else {
                let subtype = Subtype::new(group.as_str())
                    .map_err(|err| invalid(err.to_string()))?;
                self.by_subtype.entry(subtype).or_default()
            };
            for (alias, canonical) in entries {
                let canonical = canonical
                    .as_str()
                    .ok_or_else(|| invalid(format!("alias {alias:?} must map to a string")))?;
                table.insert(alias, canonical);
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, subtype: &Subtype, alias: &str, canonical: &str) {
        self.by_subtype
            .entry(subtype.clone())
            .or_default()
            .insert(alias, canonical);
    }

    /// Effective table for one subtype; subtype entries override global ones.
    pub fn table_for(&self, subtype: &Subtype) -> SynonymTable {
        let mut table = self.global.clone();
        if let Some(specific) = self.by_subtype.get(subtype) {
            table.extend(specific);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_is_accent_and_case_insensitive() {
        let catalog = SynonymCatalog::builtin();
        let tdc = catalog.table_for(&Subtype::new(TDC_AT12).unwrap());
        assert_eq!(tdc.lookup("cod banco"), Some("Código_Banco"));
        assert_eq!(tdc.lookup("Núm_Garantía"), Some("Número_Garantía"));
        // Subtype entry overrides the global NUM_PRESTAMO alias.
        assert_eq!(tdc.lookup("NUM_PRESTAMO"), Some("Número_Préstamo"));

        let base = catalog.table_for(&Subtype::new("BASE_AT12").unwrap());
        assert_eq!(base.lookup("num_prestamo"), Some("Numero_Prestamo"));
        assert_eq!(base.lookup("cod_banco"), None);
    }

    #[test]
    fn merges_json_groups() {
        let mut catalog = SynonymCatalog::empty();
        catalog
            .merge_value(&json!({
                "*": {"FEC_VTO": "Fecha_Vencimiento"},
                "AT03_CREDITOS": {"CUENTA": "num_cta"}
            }))
            .unwrap();
        let at03 = catalog.table_for(&Subtype::new("AT03_CREDITOS").unwrap());
        assert_eq!(at03.lookup("cuenta"), Some("num_cta"));
        assert_eq!(at03.lookup("fec vto"), Some("Fecha_Vencimiento"));
    }

    #[test]
    fn rejects_non_string_targets() {
        let mut catalog = SynonymCatalog::empty();
        let err = catalog
            .merge_value(&json!({"BASE_AT12": {"X": 1}}))
            .unwrap_err();
        assert!(matches!(err, StandardsError::InvalidSynonyms { .. }));
    }
}
