//! Known subtypes, their role in a run and filename aliases.

use std::collections::BTreeMap;

use atoms_model::{Subtype, SubtypeRole};

pub const BASE_AT12: &str = "BASE_AT12";
pub const TDC_AT12: &str = "TDC_AT12";
pub const SOBREGIRO_AT12: &str = "SOBREGIRO_AT12";
pub const VALORES_AT12: &str = "VALORES_AT12";
pub const AT02_CUENTAS: &str = "AT02_CUENTAS";
pub const AT03_CREDITOS: &str = "AT03_CREDITOS";
pub const POLIZA_HIPOTECAS_AT12: &str = "POLIZA_HIPOTECAS_AT12";
pub const GARANTIA_AUTOS_AT12: &str = "GARANTIA_AUTOS_AT12";
pub const FUERA_CIERRE_AT12: &str = "FUERA_CIERRE_AT12";
pub const VALOR_MINIMO_AVALUO_AT12: &str = "VALOR_MINIMO_AVALUO_AT12";

/// Primary subtypes in processing order. BASE must run before SOBREGIRO,
/// and TDC before VALORES.
const PRIMARY: [&str; 4] = [BASE_AT12, TDC_AT12, SOBREGIRO_AT12, VALORES_AT12];

const AUXILIARY: [&str; 6] = [
    AT02_CUENTAS,
    AT03_CREDITOS,
    POLIZA_HIPOTECAS_AT12,
    GARANTIA_AUTOS_AT12,
    FUERA_CIERRE_AT12,
    VALOR_MINIMO_AVALUO_AT12,
];

const DEFAULT_ALIASES: [(&str, &str); 1] = [("GARANTIAS_AUTOS_AT12", GARANTIA_AUTOS_AT12)];

#[derive(Debug, Clone)]
pub struct SubtypeCatalog {
    primary: Vec<Subtype>,
    auxiliary: Vec<Subtype>,
    aliases: BTreeMap<String, Subtype>,
}

impl Default for SubtypeCatalog {
    fn default() -> Self {
        let to_subtypes = |names: &[&str]| -> Vec<Subtype> {
            names
                .iter()
                .filter_map(|name| Subtype::new(*name).ok())
                .collect()
        };
        let aliases = DEFAULT_ALIASES
            .iter()
            .filter_map(|(alias, target)| {
                Subtype::new(*target)
                    .ok()
                    .map(|subtype| (alias.to_string(), subtype))
            })
            .collect();
        Self {
            primary: to_subtypes(&PRIMARY),
            auxiliary: to_subtypes(&AUXILIARY),
            aliases,
        }
    }
}

impl SubtypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, alias: &str, target: Subtype) -> Self {
        self.aliases.insert(alias.trim().to_ascii_uppercase(), target);
        self
    }

    /// Canonical subtype for a raw name, following aliases. Unknown names
    /// return `None`.
    pub fn resolve(&self, raw: &str) -> Option<Subtype> {
        let upper = raw.trim().to_ascii_uppercase();
        if let Some(target) = self.aliases.get(&upper) {
            return Some(target.clone());
        }
        self.primary
            .iter()
            .chain(&self.auxiliary)
            .find(|subtype| subtype.as_str() == upper)
            .cloned()
    }

    /// Every spelling a filename may start with, longest first so that
    /// `GARANTIAS_AUTOS_AT12` is tried before a shorter prefix could match.
    pub fn filename_prefixes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .primary
            .iter()
            .chain(&self.auxiliary)
            .map(|subtype| subtype.as_str().to_string())
            .chain(self.aliases.keys().cloned())
            .collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names.dedup();
        names
    }

    pub fn role(&self, subtype: &Subtype) -> Option<SubtypeRole> {
        if self.primary.contains(subtype) {
            Some(SubtypeRole::Primary)
        } else if self.auxiliary.contains(subtype) {
            Some(SubtypeRole::Auxiliary)
        } else {
            None
        }
    }

    /// Primary subtypes in the order they must be processed.
    pub fn primary(&self) -> &[Subtype] {
        &self.primary
    }

    pub fn auxiliary(&self) -> &[Subtype] {
        &self.auxiliary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_aliases_and_case() {
        let catalog = SubtypeCatalog::new();
        assert_eq!(
            catalog.resolve("garantias_autos_at12").unwrap().as_str(),
            GARANTIA_AUTOS_AT12
        );
        assert_eq!(catalog.resolve("base_at12").unwrap().as_str(), BASE_AT12);
        assert!(catalog.resolve("AT99").is_none());
    }

    #[test]
    fn roles_and_order() {
        let catalog = SubtypeCatalog::new();
        let order: Vec<&str> = catalog.primary().iter().map(Subtype::as_str).collect();
        assert_eq!(order, [BASE_AT12, TDC_AT12, SOBREGIRO_AT12, VALORES_AT12]);
        let at03 = Subtype::new(AT03_CREDITOS).unwrap();
        assert_eq!(catalog.role(&at03), Some(SubtypeRole::Auxiliary));
    }

    #[test]
    fn prefixes_are_longest_first() {
        let prefixes = SubtypeCatalog::new().filename_prefixes();
        assert_eq!(prefixes[0], VALOR_MINIMO_AVALUO_AT12);
        assert!(prefixes.contains(&"GARANTIAS_AUTOS_AT12".to_string()));
    }
}
