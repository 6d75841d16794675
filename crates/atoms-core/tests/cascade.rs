//! Cascade engine behaviour against the default rule catalog.

use std::sync::Arc;

use atoms_core::rules::{base, tdc, valores};
use atoms_core::{
    AuxiliaryData, CascadeRule, CoreError, IncidenceRecorder, RuleContext, RuleEffect, RuleError,
    RuleMetadata, RunContext, SubtypeCascade, TDC_SEQUENCE, VALORES_SEQUENCE,
    build_default_cascade_registry,
};
use atoms_model::{
    IncidenceType, Period, RecordTable, Resolution, RuleOutcome, RulePhase, RuleReport, Severity,
    Subtype,
};
use atoms_standards::SequenceSettings;
use atoms_standards::catalog::{
    AT02_CUENTAS, AT03_CREDITOS, BASE_AT12, FUERA_CIERRE_AT12, SOBREGIRO_AT12, TDC_AT12,
    VALOR_MINIMO_AVALUO_AT12, VALORES_AT12,
};
use tempfile::TempDir;

fn table(columns: &[&str], rows: &[&[&str]]) -> RecordTable {
    RecordTable::from_rows(
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect(),
    )
    .unwrap()
}

fn run_context(dir: &TempDir, settings: SequenceSettings) -> RunContext {
    RunContext::new("RUN", Period::parse("202501").unwrap(), dir.path(), settings)
}

fn base_table() -> RecordTable {
    table(
        &[
            "Numero_Prestamo",
            "Tipo_Garantia",
            "Id_Documento",
            "Tipo_Poliza",
            "Nombre_Organismo",
            "Fecha_Vencimiento",
            "Fecha_Ultima_Actualizacion",
        ],
        &[
            &["1001", "0207", "12345/2020", "", "ORG", "20300101", "20241130"],
            &["1002", "0101", "", "", "ORG", "20300101", "20241130"],
        ],
    )
}

#[test]
fn dependent_rules_without_data_leave_table_unchanged() {
    let dir = TempDir::new().unwrap();
    let registry = build_default_cascade_registry().unwrap();
    let mut run = run_context(&dir, SequenceSettings::default());
    let mut recorder = IncidenceRecorder::new("RUN", "202501");
    let mut auxiliary = AuxiliaryData::new();
    // Present but empty counts as missing.
    auxiliary.insert(
        "POLIZA_HIPOTECAS_AT12",
        table(&["numcred", "seguro_incendio"], &[]),
    );

    let original = base_table();
    let mut corrected = original.clone();
    let reports = registry
        .run("BASE_AT12", &mut corrected, &auxiliary, &mut run, &mut recorder)
        .unwrap();

    assert_eq!(corrected, original);
    assert!(recorder.is_empty());
    for report in reports.iter().filter(|r| r.phase == RulePhase::Dependent) {
        match &report.outcome {
            RuleOutcome::Skipped { reason } => {
                assert!(reason.starts_with("missing auxiliary data"), "{reason}");
            }
            other => panic!("{} should be skipped, got {other:?}", report.rule),
        }
    }
    let policy = reports.iter().find(|r| r.rule == "PROPERTY_POLICY").unwrap();
    assert_eq!(
        policy.outcome,
        RuleOutcome::Skipped {
            reason: "missing auxiliary data: POLIZA_HIPOTECAS_AT12".to_string()
        }
    );
}

#[test]
fn unmatched_auto_policy_passes_through() {
    let dir = TempDir::new().unwrap();
    let registry = build_default_cascade_registry().unwrap();
    let mut run = run_context(&dir, SequenceSettings::default());
    let mut recorder = IncidenceRecorder::new("RUN", "202501");
    let mut auxiliary = AuxiliaryData::new();
    auxiliary.insert(
        "GARANTIA_AUTOS_AT12",
        table(&["numcred", "num_poliza"], &[&["9999", "POL-1"]]),
    );

    let mut corrected = base_table();
    registry
        .run("BASE_AT12", &mut corrected, &auxiliary, &mut run, &mut recorder)
        .unwrap();
    assert_eq!(corrected.value(1, "Id_Documento"), Some(""));
    assert_eq!(recorder.for_rule("AUTO_POLICY").count(), 0);
}

struct FailingRule {
    metadata: RuleMetadata,
}

impl CascadeRule for FailingRule {
    fn metadata(&self) -> &RuleMetadata {
        &self.metadata
    }

    fn apply(
        &self,
        _ctx: &mut RuleContext<'_>,
        table: &mut RecordTable,
    ) -> Result<RuleEffect, RuleError> {
        table.set_cell(0, 0, "partially rewritten");
        Err(RuleError::Record {
            index: 0,
            message: "unparseable value".to_string(),
        })
    }
}

fn failing(critical: bool) -> Arc<dyn CascadeRule> {
    let metadata = RuleMetadata::new("FAILING", RulePhase::Independent, "always fails");
    Arc::new(FailingRule {
        metadata: if critical { metadata.critical() } else { metadata },
    })
}

#[test]
fn failed_rule_is_reported_and_rolled_back() {
    let dir = TempDir::new().unwrap();
    let mut cascade = SubtypeCascade::new(Subtype::new("BASE_AT12").unwrap());
    cascade.add_rule(failing(false));
    cascade.add_rule(Arc::new(atoms_core::rules::common::WhitespaceRule::new()));

    let mut run = run_context(&dir, SequenceSettings::default());
    let mut recorder = IncidenceRecorder::new("RUN", "202501");
    let mut data = table(&["Numero_Prestamo"], &[&[" 1001 "]]);
    let reports = cascade
        .run(&mut data, &AuxiliaryData::new(), &mut run, &mut recorder)
        .unwrap();

    assert!(reports[0].outcome.is_failed());
    assert_eq!(reports[1].outcome, RuleOutcome::Applied { changes: 1 });
    assert_eq!(data.cell(0, 0), Some("1001"));
}

#[test]
fn critical_rule_fails_the_subtype() {
    let dir = TempDir::new().unwrap();
    let mut cascade = SubtypeCascade::new(Subtype::new("BASE_AT12").unwrap());
    cascade.add_rule(failing(true));

    let mut run = run_context(&dir, SequenceSettings::default());
    let mut recorder = IncidenceRecorder::new("RUN", "202501");
    let mut data = table(&["Numero_Prestamo"], &[&["1001"]]);
    let err = cascade
        .run(&mut data, &AuxiliaryData::new(), &mut run, &mut recorder)
        .unwrap_err();
    assert!(matches!(err, CoreError::CriticalRule { ref rule, .. } if rule == "FAILING"));
}

#[test]
fn disabled_rule_is_skipped() {
    let dir = TempDir::new().unwrap();
    let mut registry = build_default_cascade_registry().unwrap();
    registry
        .get_mut("BASE_AT12")
        .unwrap()
        .disable_rule("WHITESPACE");

    let mut run = run_context(&dir, SequenceSettings::default());
    let mut recorder = IncidenceRecorder::new("RUN", "202501");
    let mut data = base_table();
    data.set_cell(0, 4, "  ORG  ");
    let reports = registry
        .run("BASE_AT12", &mut data, &AuxiliaryData::new(), &mut run, &mut recorder)
        .unwrap();
    assert_eq!(
        reports[0].outcome,
        RuleOutcome::Skipped {
            reason: "disabled".to_string()
        }
    );
    assert_eq!(data.cell(0, 4), Some("  ORG  "));
}

const VALORES_COLUMNS: [&str; 22] = [
    "Numero_Prestamo",
    "Id_Documento",
    "Numero_Garantia",
    "Tipo_Facilidad",
    "Valor_Inicial",
    "Valor_Garantia",
    "Valor_Ponderado",
    "Importe",
    "Tipo_Instrumento",
    "Tipo_Poliza",
    "Calificacion_Emisor",
    "Calificacion_Emisision",
    "Status_Garantia",
    "Status_Prestamo",
    "Segmento",
    "Clave_Pais",
    "Clave_Empresa",
    "Clave_Tipo_Garantia",
    "Clave_Subtipo_Garantia",
    "Clave_Tipo_Pren_Hipo",
    "Numero_Cis_Garantia",
    "Numero_Cis_Prestamo",
];

fn valores_table(loans: &[&str]) -> RecordTable {
    let mut columns: Vec<&str> = VALORES_COLUMNS.to_vec();
    columns.extend(["Numero_Ruc_Garantia", "Numero_Ruc_Prestamo"]);
    let width = columns.len();
    let rows: Vec<Vec<String>> = loans
        .iter()
        .map(|loan| {
            let mut row = vec![String::new(); width];
            row[0] = loan.to_string();
            row[4] = "10250,75".to_string();
            row[5] = "5000.00".to_string();
            row[20] = "CIS-9".to_string();
            row
        })
        .collect();
    RecordTable::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
}

#[test]
fn securities_rules_fill_constants_and_numbers() {
    let dir = TempDir::new().unwrap();
    let registry = build_default_cascade_registry().unwrap();
    let mut run = run_context(&dir, SequenceSettings::default());
    let mut recorder = IncidenceRecorder::new("RUN", "202501");
    let mut auxiliary = AuxiliaryData::new();
    auxiliary.insert(
        "AT03_CREDITOS",
        table(&["num_cta", "saldo"], &[&["123", "10"]]),
    );

    let mut data = valores_table(&["123", "45678"]);
    let reports = registry
        .run("VALORES_AT12", &mut data, &auxiliary, &mut run, &mut recorder)
        .unwrap();
    assert!(reports.iter().all(|r| !r.outcome.is_failed()), "{reports:?}");

    assert_eq!(data.value(0, "Numero_Prestamo"), Some("0000000123"));
    assert_eq!(data.value(0, "Id_Documento"), Some("0000000123"));
    assert_eq!(data.value(0, "Valor_Inicial"), Some("10250.75"));
    assert_eq!(data.value(0, "Valor_Garantia"), Some("5000"));
    assert_eq!(data.value(0, "Importe"), Some("5000"));
    assert_eq!(data.value(0, "Segmento"), Some("PRE"));
    assert_eq!(data.value(0, "Status_Prestamo"), Some("-1"));
    assert_eq!(data.value(0, "Numero_Cis_Prestamo"), Some("CIS-9"));
    assert_eq!(data.value(0, "Numero_Garantia"), Some("0000000001"));
    assert_eq!(data.value(1, "Numero_Garantia"), Some("0000000002"));
    assert_eq!(data.value(0, "Tipo_Facilidad"), Some("01"));
    assert_eq!(data.value(1, "Tipo_Facilidad"), Some("02"));
    assert_eq!(run.last_issued(VALORES_SEQUENCE), Some(2));
}

#[test]
fn securities_numbering_follows_tdc_when_configured() {
    let dir = TempDir::new().unwrap();
    let settings = SequenceSettings {
        valores_follows_tdc: true,
        ..SequenceSettings::default()
    };
    let mut run = run_context(&dir, settings);
    run.record_last_issued(TDC_SEQUENCE, 855_510);

    let registry = build_default_cascade_registry().unwrap();
    let mut recorder = IncidenceRecorder::new("RUN", "202501");
    let mut data = valores_table(&["123"]);
    registry
        .run("VALORES_AT12", &mut data, &AuxiliaryData::new(), &mut run, &mut recorder)
        .unwrap();
    assert_eq!(data.value(0, "Numero_Garantia"), Some("0000855511"));
}

/// Run `rules` alone as the cascade of `subtype`.
fn run_rules(
    subtype: &str,
    rules: Vec<Arc<dyn CascadeRule>>,
    data: &mut RecordTable,
    auxiliary: &AuxiliaryData,
) -> (Vec<RuleReport>, IncidenceRecorder) {
    let dir = TempDir::new().unwrap();
    let mut cascade = SubtypeCascade::new(Subtype::new(subtype).unwrap());
    for rule in rules {
        cascade.add_rule(rule);
    }
    let mut run = run_context(&dir, SequenceSettings::default());
    let mut recorder = IncidenceRecorder::new("RUN", "202501");
    let reports = cascade.run(data, auxiliary, &mut run, &mut recorder).unwrap();
    (reports, recorder)
}

fn record_indexes(recorder: &IncidenceRecorder, rule: &str) -> Vec<usize> {
    recorder
        .for_rule(rule)
        .filter_map(|incidence| incidence.record_index)
        .collect()
}

struct ScopedCase {
    rule: Arc<dyn CascadeRule>,
    column: &'static str,
    /// `(Tipo_Garantia, value)` per record.
    input: &'static [(&'static str, &'static str)],
    expected: &'static [&'static str],
    corrected: &'static [usize],
}

#[test]
fn independent_base_rules_correct_only_their_records() {
    let cases = [
        ScopedCase {
            rule: Arc::new(base::ScopedDefaultRule::property_without_deed()),
            column: "Id_Documento",
            input: &[
                ("0207", "0/0"),
                ("208", "1/1"),
                ("0209", ""),
                ("0209", "12345/2020"),
                ("0101", "0/0"),
                ("0208", " 9999/1 "),
            ],
            expected: &[
                "99999/99999",
                "99999/99999",
                "99999/99999",
                "12345/2020",
                "0/0",
                "99999/99999",
            ],
            corrected: &[0, 1, 2, 5],
        },
        ScopedCase {
            rule: Arc::new(base::MaturityDateRule::new()),
            column: "Fecha_Vencimiento",
            input: &[
                ("0207", "99990231"),
                ("0101", "19800101"),
                ("0207", "20300101"),
                ("0207", ""),
                ("0207", "21001201"),
            ],
            expected: &["21001201", "21001201", "20300101", "", "21001201"],
            corrected: &[0, 1],
        },
        ScopedCase {
            rule: Arc::new(base::Error0301Rule::new()),
            column: "Id_Documento",
            input: &[
                ("0301", "123456789012810999"),
                ("0301", "12345678419999"),
                ("0207", "123456789012810999"),
                ("0301", "123456789012100"),
            ],
            expected: &[
                "123456789012810",
                "1234567841",
                "123456789012810999",
                "123456789012100",
            ],
            corrected: &[0, 1],
        },
    ];

    for case in cases {
        let id = case.rule.metadata().id.clone();
        let rows: Vec<Vec<String>> = case
            .input
            .iter()
            .enumerate()
            .map(|(idx, (category, value))| {
                vec![format!("{}", 1001 + idx), category.to_string(), value.to_string()]
            })
            .collect();
        let columns = vec![
            "Numero_Prestamo".to_string(),
            "Tipo_Garantia".to_string(),
            case.column.to_string(),
        ];
        let mut data = RecordTable::from_rows(columns, rows).unwrap();

        let (reports, recorder) =
            run_rules(BASE_AT12, vec![case.rule], &mut data, &AuxiliaryData::new());

        let values: Vec<&str> = data.column_values(2).collect();
        assert_eq!(values, case.expected, "{id}");
        assert_eq!(record_indexes(&recorder, &id), case.corrected, "{id}");
        assert_eq!(
            reports[0].outcome,
            RuleOutcome::Applied {
                changes: case.corrected.len()
            },
            "{id}"
        );
        for incidence in recorder.for_rule(&id) {
            assert_eq!(incidence.resolution, Resolution::Corrected, "{id}");
            assert_eq!(incidence.column_name.as_deref(), Some(case.column), "{id}");
            let row = incidence.record_index.unwrap();
            assert_eq!(incidence.original_value.as_deref(), Some(case.input[row].1), "{id}");
            assert_eq!(incidence.corrected_value.as_deref(), Some(case.expected[row]), "{id}");
        }
    }
}

#[test]
fn out_of_scope_categories_never_get_deed_incidences() {
    let mut data = table(
        &["Numero_Prestamo", "Tipo_Garantia", "Id_Documento"],
        &[
            &["1001", "0101", "0/0"],
            &["1002", "0301", ""],
            &["1003", "0207", "1"],
        ],
    );
    let (_, recorder) = run_rules(
        BASE_AT12,
        vec![Arc::new(base::ScopedDefaultRule::property_without_deed())],
        &mut data,
        &AuxiliaryData::new(),
    );
    let incidences: Vec<_> = recorder.for_rule("PROPERTY_WITHOUT_DEED").collect();
    assert_eq!(incidences.len(), 1);
    assert_eq!(incidences[0].key("Numero_Prestamo"), Some("1003"));
    assert!(
        recorder
            .all()
            .iter()
            .all(|incidence| incidence.key("Tipo_Garantia") == Some("0207"))
    );
    assert_eq!(data.value(0, "Id_Documento"), Some("0/0"));
    assert_eq!(data.value(1, "Id_Documento"), Some(""));
}

#[test]
fn out_of_cycle_loans_are_removed_and_flagged() {
    let mut auxiliary = AuxiliaryData::new();
    auxiliary.insert(
        FUERA_CIERRE_AT12,
        table(&["at_num_prestamo"], &[&["0001002"], &["1004"], &[""]]),
    );
    let mut data = table(
        &["Numero_Prestamo", "Tipo_Garantia"],
        &[&["1001", "0207"], &["1002", "0101"], &["1003", "0207"], &["", "0207"]],
    );

    let (reports, recorder) = run_rules(
        BASE_AT12,
        vec![Arc::new(base::OutOfCycleRule::new())],
        &mut data,
        &auxiliary,
    );

    let loans: Vec<&str> = data.column_values(0).collect();
    assert_eq!(loans, ["1001", "1003", ""]);
    assert_eq!(reports[0].outcome, RuleOutcome::Applied { changes: 1 });
    let incidences: Vec<_> = recorder.for_rule("OUT_OF_CYCLE").collect();
    assert_eq!(incidences.len(), 1);
    let removed = incidences[0];
    assert_eq!(removed.record_index, Some(1));
    assert_eq!(removed.resolution, Resolution::Flagged);
    assert_eq!(removed.key("Numero_Prestamo"), Some("1002"));
    assert_eq!(removed.column_name, None);
    assert_eq!(removed.corrected_value, None);
}

#[test]
fn balance_above_minimum_appraisal_is_reported_without_changes() {
    let mut auxiliary = AuxiliaryData::new();
    auxiliary.insert(
        VALOR_MINIMO_AVALUO_AT12,
        table(
            &["at_num_de_prestamos", "nuevo_at_valor_garantia"],
            &[&["1001", "50000.00"], &["1002", "90000"]],
        ),
    );
    auxiliary.insert(
        AT03_CREDITOS,
        table(
            &["num_cta", "saldo", "fec_ini_prestamo"],
            &[
                &["0000001001", "75000,50", "20200101"],
                &["1002", "80000", "20200101"],
                &["1003", "999999", "20200101"],
            ],
        ),
    );
    let original = table(
        &["Numero_Prestamo", "Tipo_Garantia"],
        &[&["1001", "0207"], &["1002", "0207"], &["1003", "0207"]],
    );
    let mut data = original.clone();

    let (reports, recorder) = run_rules(
        BASE_AT12,
        vec![Arc::new(base::MinimumAppraisalValueRule::new())],
        &mut data,
        &auxiliary,
    );

    assert_eq!(data, original);
    assert_eq!(reports[0].outcome, RuleOutcome::Applied { changes: 0 });
    assert_eq!(reports[0].incidences, 1);
    let incidences: Vec<_> = recorder.for_rule("MINIMUM_APPRAISAL_VALUE").collect();
    assert_eq!(incidences.len(), 1);
    let flagged = incidences[0];
    assert_eq!(flagged.record_index, Some(0));
    assert_eq!(flagged.severity, Severity::High);
    assert_eq!(flagged.resolution, Resolution::Flagged);
    assert_eq!(flagged.incidence_type, IncidenceType::ValidationFailure);
    assert_eq!(
        flagged.metadata.get("numero_prestamo").map(String::as_str),
        Some("1001")
    );
    assert_eq!(
        flagged.metadata.get("saldo_adeudado").map(String::as_str),
        Some("75000,50")
    );
    assert_eq!(
        flagged.metadata.get("valor_garantia").map(String::as_str),
        Some("50000.00")
    );
}

#[test]
fn appraisal_dates_fall_back_to_latest_loan_start() {
    let mut auxiliary = AuxiliaryData::new();
    auxiliary.insert(
        AT03_CREDITOS,
        table(
            &["num_cta", "fec_ini_prestamo"],
            &[
                &["1001", "20150101"],
                &["0001001", "20180615"],
                &["1001", "bad date"],
                &["1002", "2019-03-01"],
                &["1003", "20170101"],
                &["1004", "20160101"],
            ],
        ),
    );
    // Period 202501 cuts off at 20241231.
    let mut data = table(
        &["Numero_Prestamo", "Tipo_Garantia", "Fecha_Ultima_Actualizacion"],
        &[
            &["1001", "0207", "20250115"],
            &["1002", "0207", "19840101"],
            &["1003", "0207", ""],
            &["1004", "0207", "20241231"],
            &["1005", "0207", ""],
        ],
    );

    let (reports, recorder) = run_rules(
        BASE_AT12,
        vec![Arc::new(base::AppraisalDateRule::new())],
        &mut data,
        &auxiliary,
    );

    let dates: Vec<&str> = data.column_values(2).collect();
    assert_eq!(dates, ["20180615", "20190301", "20170101", "20241231", ""]);
    assert_eq!(reports[0].outcome, RuleOutcome::Applied { changes: 3 });
    assert_eq!(record_indexes(&recorder, "APPRAISAL_DATE"), [0, 1, 2]);
    let first = recorder.for_rule("APPRAISAL_DATE").next().unwrap();
    assert_eq!(first.original_value.as_deref(), Some("20250115"));
    assert_eq!(first.corrected_value.as_deref(), Some("20180615"));
}

#[test]
fn overdraft_records_take_constants_and_base_values() {
    let mut auxiliary = AuxiliaryData::new();
    auxiliary.insert(
        BASE_AT12,
        table(
            &["Numero_Prestamo", "Fecha_Vencimiento", "Valor_Inicial"],
            &[
                &["0000002001", "20300101", "5000"],
                &["2002", "20310101", ""],
            ],
        ),
    );
    let mut data = table(
        &[
            "Numero_Prestamo",
            "Tipo_Garantia",
            "Id_Documento",
            "Numero_Garantia",
            "Fecha_Vencimiento",
            "Valor_Inicial",
        ],
        &[
            &["2001", "", "", "", "20250101", "100"],
            &["  ", "0101", "X", "G-1", "20250101", "100"],
            &["2002", "", "", "EXISTING", "20250101", "100"],
        ],
    );

    let dir = TempDir::new().unwrap();
    let registry = build_default_cascade_registry().unwrap();
    let mut run = run_context(&dir, SequenceSettings::default());
    let mut recorder = IncidenceRecorder::new("RUN", "202501");
    let reports = registry
        .run(SOBREGIRO_AT12, &mut data, &auxiliary, &mut run, &mut recorder)
        .unwrap();
    assert!(reports.iter().all(|r| !r.outcome.is_failed()), "{reports:?}");

    assert_eq!(
        data.row(0).unwrap(),
        ["2001", "0103", "2001", "SOB2001", "20300101", "5000"]
    );
    assert_eq!(data.row(1).unwrap(), ["", "0103", "X", "G-1", "20250101", "100"]);
    assert_eq!(
        data.row(2).unwrap(),
        ["2002", "0103", "2002", "EXISTING", "20310101", "100"]
    );

    assert_eq!(record_indexes(&recorder, "OVERDRAFT_DEFAULTS"), [0, 0, 0, 1, 2, 2]);
    assert_eq!(record_indexes(&recorder, "BASE_ENRICHMENT"), [0, 0, 2]);
}

#[test]
fn blank_update_dates_take_the_account_opening_date() {
    let mut auxiliary = AuxiliaryData::new();
    auxiliary.insert(
        AT02_CUENTAS,
        table(
            &["Identificacion_Cuenta", "Fecha_Inicio"],
            &[
                &["00123", "2019-05-20"],
                &["123", "20200101"],
                &["456", "not a date"],
            ],
        ),
    );
    let mut data = table(
        &["Numero_Prestamo", "Id_Documento", "Fecha_Ultima_Actualizacion"],
        &[
            &["1", "123", ""],
            &["2", "456", ""],
            &["3", "123", "20240101"],
            &["4", "789", "nan"],
        ],
    );

    let (reports, recorder) = run_rules(
        TDC_AT12,
        vec![Arc::new(tdc::OpeningDateRule::new())],
        &mut data,
        &auxiliary,
    );

    let dates: Vec<&str> = data.column_values(2).collect();
    assert_eq!(dates, ["20200101", "", "20240101", "nan"]);
    assert_eq!(reports[0].outcome, RuleOutcome::Applied { changes: 1 });
    let filled: Vec<_> = recorder.for_rule("OPENING_DATE").collect();
    assert_eq!(filled.len(), 1);
    assert_eq!(filled[0].record_index, Some(0));
    assert_eq!(filled[0].original_value.as_deref(), Some(""));
    assert_eq!(filled[0].corrected_value.as_deref(), Some("20200101"));
}

#[test]
fn facility_follows_presence_in_credit_extract() {
    let mut auxiliary = AuxiliaryData::new();
    auxiliary.insert(AT03_CREDITOS, table(&["num_cta"], &[&["0000123"]]));
    let mut data = table(
        &["Numero_Prestamo", "Tipo_Facilidad"],
        &[&["123", "01"], &["45678", ""], &["", "01"]],
    );

    let (reports, recorder) = run_rules(
        VALORES_AT12,
        vec![Arc::new(valores::SecuritiesFacilityRule::new())],
        &mut data,
        &auxiliary,
    );

    let facilities: Vec<&str> = data.column_values(1).collect();
    assert_eq!(facilities, ["01", "02", "02"]);
    assert_eq!(reports[0].outcome, RuleOutcome::Applied { changes: 2 });
    assert_eq!(record_indexes(&recorder, "SECURITIES_FACILITY"), [1, 2]);
}
