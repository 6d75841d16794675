//! Terminal tables for run summaries, mapping reports and schemas.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use atoms_map::{MappingReport, MatchMethod};
use atoms_model::{RuleOutcome, RunSummary, SubtypeRole, SubtypeStatus, SubtypeSummary};
use atoms_standards::CanonicalSchema;

pub fn print_run_summary(summary: &RunSummary) {
    println!("Run: {}  Period: {}", summary.run_id, summary.period);
    if let Some(path) = &summary.consolidated_path {
        println!("Consolidated: {}", path.display());
    }
    println!("{}", subtype_table(summary));
    if let Some(table) = rule_table(summary) {
        println!();
        println!("Rules:");
        println!("{table}");
    }
    let failed: Vec<&SubtypeSummary> = summary.failed_subtypes().collect();
    if !failed.is_empty() {
        eprintln!("Failed subtypes:");
        for entry in failed {
            if let SubtypeStatus::Failed { reason } = &entry.status {
                eprintln!("- {}: {reason}", entry.subtype);
            }
        }
    }
}

/// One row per subtype plus a TOTAL row.
pub fn subtype_table(summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Subtype"),
        header_cell("Role"),
        header_cell("Status"),
        header_cell("Input"),
        header_cell("Output"),
        header_cell("Added"),
        header_cell("Dropped"),
        header_cell("Applied"),
        header_cell("Failed"),
        header_cell("Incidences"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 3..10 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 2, CellAlignment::Center);

    let mut input = 0usize;
    let mut output = 0usize;
    let mut applied = 0usize;
    let mut failed = 0usize;
    for entry in &summary.subtypes {
        input += entry.input_rows;
        output += entry.output_rows;
        let entry_applied = entry.rule_count("applied");
        let entry_failed = entry.rule_count("failed");
        applied += entry_applied;
        failed += entry_failed;
        table.add_row(vec![
            subtype_cell(&entry.subtype, entry.role),
            Cell::new(role_label(entry.role)),
            status_cell(&entry.status),
            Cell::new(entry.input_rows),
            Cell::new(entry.output_rows),
            count_cell(entry.added_columns.len(), Color::Yellow),
            count_cell(entry.dropped_columns.len(), Color::Yellow),
            Cell::new(entry_applied),
            count_cell(entry_failed, Color::Red),
            count_cell(entry.incidences, Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(input).add_attribute(Attribute::Bold),
        Cell::new(output).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(applied).add_attribute(Attribute::Bold),
        count_cell(failed, Color::Red).add_attribute(Attribute::Bold),
        count_cell(summary.incidences.total, Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    table
}

/// Per-rule outcomes of every cascaded subtype, or `None` when nothing ran.
pub fn rule_table(summary: &RunSummary) -> Option<Table> {
    let reports: Vec<_> = summary
        .subtypes
        .iter()
        .flat_map(|entry| entry.rules.iter().map(move |report| (&entry.subtype, report)))
        .collect();
    if reports.is_empty() {
        return None;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Subtype"),
        header_cell("Rule"),
        header_cell("Phase"),
        header_cell("Outcome"),
        header_cell("Detail"),
        header_cell("Incidences"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 5, CellAlignment::Right);
    for (subtype, report) in reports {
        let (outcome, detail) = outcome_cells(&report.outcome);
        table.add_row(vec![
            Cell::new(subtype),
            Cell::new(&report.rule),
            Cell::new(report.phase),
            outcome,
            detail,
            count_cell(report.incidences, Color::Yellow),
        ]);
    }
    Some(table)
}

pub fn print_mapping_report(report: &MappingReport) {
    println!("Subtype: {}", report.subtype);
    println!("{}", mapping_table(report));
    if !report.dropped.is_empty() {
        println!("Dropped input columns: {}", report.dropped.join(", "));
    }
}

/// Canonical columns with the input column that filled each one.
pub fn mapping_table(report: &MappingReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Canonical"),
        header_cell("Source"),
        header_cell("Method"),
        header_cell("Score"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Right);
    for entry in &report.matched {
        table.add_row(vec![
            Cell::new(&entry.canonical),
            Cell::new(&entry.source),
            method_cell(entry.method),
            match entry.score {
                Some(score) => Cell::new(format!("{score:.3}")),
                None => dim_cell("-"),
            },
        ]);
    }
    for canonical in &report.added {
        table.add_row(vec![
            Cell::new(canonical),
            Cell::new("(filled empty)").fg(Color::Yellow),
            dim_cell("-"),
            dim_cell("-"),
        ]);
    }
    table
}

/// Subtypes with their column counts.
pub fn schema_overview_table<'a, I>(schemas: I) -> Table
where
    I: IntoIterator<Item = (&'a CanonicalSchema, Option<SubtypeRole>)>,
{
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Subtype"),
        header_cell("Role"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for (schema, role) in schemas {
        table.add_row(vec![
            Cell::new(schema.subtype()),
            match role {
                Some(role) => Cell::new(role_label(role)),
                None => dim_cell("-"),
            },
            Cell::new(schema.len()),
        ]);
    }
    table
}

/// Canonical columns of one subtype in output order.
pub fn schema_columns_table(schema: &CanonicalSchema) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Column")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, column) in schema.columns().iter().enumerate() {
        table.add_row(vec![Cell::new(index + 1), Cell::new(column)]);
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn role_label(role: SubtypeRole) -> &'static str {
    match role {
        SubtypeRole::Primary => "primary",
        SubtypeRole::Auxiliary => "auxiliary",
    }
}

fn subtype_cell(name: &str, role: SubtypeRole) -> Cell {
    match role {
        SubtypeRole::Primary => Cell::new(name)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        SubtypeRole::Auxiliary => Cell::new(name).fg(Color::DarkGrey),
    }
}

fn status_cell(status: &SubtypeStatus) -> Cell {
    match status {
        SubtypeStatus::Completed => Cell::new("ok").fg(Color::Green),
        SubtypeStatus::Failed { .. } => Cell::new("FAILED")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn outcome_cells(outcome: &RuleOutcome) -> (Cell, Cell) {
    match outcome {
        RuleOutcome::Applied { changes } => (
            Cell::new("applied").fg(Color::Green),
            Cell::new(format!("{changes} changes")),
        ),
        RuleOutcome::Skipped { reason } => (
            Cell::new("skipped").fg(Color::DarkGrey),
            dim_cell(reason),
        ),
        RuleOutcome::Failed { error } => (
            Cell::new("failed")
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
            Cell::new(error).fg(Color::Red),
        ),
    }
}

fn method_cell(method: MatchMethod) -> Cell {
    let cell = Cell::new(method.as_str());
    match method {
        MatchMethod::Exact => cell.fg(Color::Green),
        MatchMethod::Synonym => cell.fg(Color::Blue),
        MatchMethod::Fuzzy => cell.fg(Color::Yellow),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
