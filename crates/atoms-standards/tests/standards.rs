use std::io::Write;

use atoms_model::Subtype;
use atoms_standards::catalog::{BASE_AT12, TDC_AT12};
use atoms_standards::{RunConfig, SchemaRegistry, StandardsError, SubtypeCatalog, default_schema_path};
use tempfile::NamedTempFile;

fn write_temp(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn bundled_schema_covers_every_known_subtype() {
    let registry = SchemaRegistry::load(&default_schema_path()).unwrap();
    let catalog = SubtypeCatalog::new();
    for subtype in catalog.primary().iter().chain(catalog.auxiliary()) {
        let schema = registry.schema(subtype).unwrap();
        assert!(!schema.is_empty(), "{subtype}");
    }
    assert_eq!(registry.malformed().count(), 0);

    let base = registry.schema(&Subtype::new(BASE_AT12).unwrap()).unwrap();
    assert_eq!(base.columns()[0], "Fecha");
    assert!(base.columns().iter().any(|c| c == "Numero_Garantia"));

    let tdc = registry.schema(&Subtype::new(TDC_AT12).unwrap()).unwrap();
    assert!(tdc.columns().iter().any(|c| c == "Número_Garantía"));
}

#[test]
fn config_file_sections_default_independently() {
    let file = write_temp(
        r#"
[output]
delimiter = ";"

[sequences]
valores_follows_tdc = true
"#,
        ".toml",
    );
    let config = RunConfig::from_file(file.path()).unwrap();
    assert_eq!(config.output.delimiter, ';');
    assert!(config.output.quote_all);
    assert!(config.sequences.valores_follows_tdc);
    assert_eq!(config.sequences.tdc_start, 855_500);
    assert_eq!(config.matching.fuzzy_threshold, 0.75);
    assert!(config.validate().is_ok());
}

#[test]
fn unparseable_config_is_an_error() {
    let file = write_temp("[output\ndelimiter = ", ".toml");
    assert!(matches!(
        RunConfig::from_file(file.path()),
        Err(StandardsError::Toml { .. })
    ));
}

#[test]
fn missing_schema_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = SchemaRegistry::load(&path).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}
