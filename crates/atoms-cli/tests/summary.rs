//! Rendering of run summaries and mapping reports.

use atoms_cli::summary::{mapping_table, rule_table, subtype_table};
use atoms_map::{ColumnMatch, MappingReport, MatchMethod};
use atoms_model::{
    IncidenceSummary, RuleOutcome, RulePhase, RuleReport, RunSummary, SubtypeRole, SubtypeSummary,
};
use chrono::Utc;

fn summary() -> RunSummary {
    let mut base = SubtypeSummary::new("BASE_AT12", SubtypeRole::Primary);
    base.input_rows = 4;
    base.output_rows = 4;
    base.incidences = 2;
    base.rules = vec![
        RuleReport {
            rule: "PROPERTY_POLICY".to_string(),
            phase: RulePhase::Dependent,
            outcome: RuleOutcome::Applied { changes: 3 },
            incidences: 2,
        },
        RuleReport {
            rule: "AUTO_POLICY".to_string(),
            phase: RulePhase::Dependent,
            outcome: RuleOutcome::Skipped {
                reason: "missing auxiliary data: GARANTIA_AUTOS_AT12".to_string(),
            },
            incidences: 0,
        },
    ];
    let mut policy = SubtypeSummary::new("POLIZA_HIPOTECAS_AT12", SubtypeRole::Auxiliary);
    policy.input_rows = 1;
    policy.output_rows = 1;
    let failed = SubtypeSummary::failed(
        "SOBREGIRO_AT12",
        SubtypeRole::Primary,
        "no canonical schema for SOBREGIRO_AT12",
    );
    RunSummary {
        run_id: "RUN1".to_string(),
        period: "202501".to_string(),
        started_at: Utc::now(),
        finished_at: Utc::now(),
        subtypes: vec![policy, base, failed],
        incidences: IncidenceSummary {
            total: 2,
            ..IncidenceSummary::default()
        },
        consolidated_path: None,
    }
}

fn render(mut table: comfy_table::Table) -> String {
    table.force_no_tty();
    table.to_string()
}

fn row_containing<'a>(text: &'a str, needle: &str) -> &'a str {
    text.lines()
        .find(|line| line.contains(needle))
        .unwrap_or_else(|| panic!("no line with {needle} in\n{text}"))
}

#[test]
fn subtype_table_lists_every_subtype_and_a_total() {
    let text = render(subtype_table(&summary()));
    assert!(text.contains("POLIZA_HIPOTECAS_AT12"));
    assert!(text.contains("FAILED"));
    let total = row_containing(&text, "TOTAL");
    assert!(total.contains(" 5 "), "{total}");
    assert!(total.contains(" 2 "), "{total}");
}

#[test]
fn rule_table_shows_outcomes_and_reasons() {
    let text = render(rule_table(&summary()).unwrap());
    let applied = row_containing(&text, "PROPERTY_POLICY");
    assert!(applied.contains("applied"));
    assert!(applied.contains("3 changes"));
    let skipped = row_containing(&text, "AUTO_POLICY");
    assert!(skipped.contains("skipped"));
    assert!(text.contains("GARANTIA_AUTOS_AT12"));
}

#[test]
fn rule_table_is_omitted_without_rules() {
    let mut summary = summary();
    for entry in &mut summary.subtypes {
        entry.rules.clear();
    }
    assert!(rule_table(&summary).is_none());
}

#[test]
fn mapping_table_marks_filled_columns() {
    let report = MappingReport {
        subtype: "TDC_AT12".to_string(),
        matched: vec![
            ColumnMatch {
                canonical: "Numero_Prestamo".to_string(),
                source: "numero_prestamo".to_string(),
                method: MatchMethod::Exact,
                score: None,
            },
            ColumnMatch {
                canonical: "Id_Documento".to_string(),
                source: "Id_Documen".to_string(),
                method: MatchMethod::Fuzzy,
                score: Some(0.9),
            },
        ],
        added: vec!["Tipo_Facilidad".to_string()],
        dropped: vec!["extra".to_string()],
    };
    let text = render(mapping_table(&report));
    assert!(row_containing(&text, "Id_Documento").contains("0.900"));
    assert!(row_containing(&text, "Id_Documento").contains("fuzzy"));
    assert!(row_containing(&text, "Tipo_Facilidad").contains("(filled empty)"));
    assert!(!text.contains("extra"));
}
