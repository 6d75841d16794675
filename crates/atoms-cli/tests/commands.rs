//! Commands driven against a temporary workspace.

use std::fs;
use std::path::{Path, PathBuf};

use atoms_cli::cli::{RunArgs, StandardizeArgs};
use atoms_cli::commands::{exit_code, run_period, standardize_file};
use atoms_model::Period;
use tempfile::TempDir;

const SCHEMA: &str = r#"{
    "BASE_AT12": [
        "Numero_Prestamo",
        "Tipo_Garantia",
        "Id_Documento",
        "Tipo_Poliza",
        "Nombre_Organismo",
        "Fecha_Vencimiento",
        "Fecha_Ultima_Actualizacion"
    ]
}"#;

const BASE_INPUT: &str = "\
Numero_Prestamo;Tipo_Garantia;Id_Documento;Tipo_Poliza;Nombre_Organismo;Fecha_Vencimiento;Fecha_Ultima_Actualizacion
0000001001;0207;12345/2020;;ORG;20300101;20241130
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("source")).unwrap();
        fs::write(dir.path().join("schema.json"), SCHEMA).unwrap();
        let config = format!(
            "[paths]\nsource_dir = '{}'\noutput_dir = '{}'\nschema_file = '{}'\nsequences_dir = '{}'\n",
            dir.path().join("source").display(),
            dir.path().join("out").display(),
            dir.path().join("schema.json").display(),
            dir.path().join("state").display(),
        );
        fs::write(dir.path().join("atoms.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn source(&self, name: &str, text: &str) {
        fs::write(self.path().join("source").join(name), text).unwrap();
    }

    fn run_args(&self) -> RunArgs {
        RunArgs {
            period: Period::parse("202501").unwrap(),
            run_id: Some("CLI1".to_string()),
            config: Some(self.path().join("atoms.toml")),
            source: None,
            output: None,
            only: Vec::new(),
        }
    }
}

#[test]
fn clean_run_exits_zero() {
    let ws = Workspace::new();
    ws.source("BASE_AT12_20250131.csv", BASE_INPUT);

    let summary = run_period(&ws.run_args()).unwrap();
    assert_eq!(exit_code(&summary), 0);
    assert!(
        ws.path()
            .join("out/202501/processed/AT12_BASE_AT12_202501.csv")
            .is_file()
    );
}

#[test]
fn failed_subtype_exits_one() {
    let ws = Workspace::new();
    ws.source("BASE_AT12_20250131.csv", BASE_INPUT);
    ws.source("SOBREGIRO_AT12_20250131.csv", "Numero_Prestamo\n777\n");

    let summary = run_period(&ws.run_args()).unwrap();
    assert_eq!(exit_code(&summary), 1);
}

#[test]
fn flags_override_configured_directories() {
    let ws = Workspace::new();
    let elsewhere: PathBuf = ws.path().join("elsewhere");
    fs::create_dir_all(&elsewhere).unwrap();
    fs::write(elsewhere.join("BASE_AT12_20250131.csv"), BASE_INPUT).unwrap();

    let args = RunArgs {
        source: Some(elsewhere),
        output: Some(ws.path().join("flagged")),
        ..ws.run_args()
    };
    run_period(&args).unwrap();
    assert!(ws.path().join("flagged/202501").is_dir());
    assert!(!ws.path().join("out").exists());
}

#[test]
fn empty_source_is_an_error() {
    let ws = Workspace::new();
    let err = run_period(&ws.run_args()).unwrap_err();
    assert!(format!("{err:#}").contains("202501"), "{err:#}");
}

#[test]
fn standardize_reports_added_columns() {
    let ws = Workspace::new();
    let file = ws.path().join("base.csv");
    fs::write(&file, "numero_prestamo,Tipo Garantia,extra\n1,0207,x\n").unwrap();

    let report = standardize_file(&StandardizeArgs {
        subtype: "base_at12".to_string(),
        file,
        config: Some(ws.path().join("atoms.toml")),
        json: true,
    })
    .unwrap();
    assert_eq!(report.subtype, "BASE_AT12");
    assert!(report.source_for("Numero_Prestamo").is_some());
    assert!(report.added.contains(&"Id_Documento".to_string()));
    assert_eq!(report.dropped, ["extra"]);
}
