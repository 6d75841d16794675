use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use tracing::{info, info_span, warn};

use atoms_core::{Orchestrator, RunRequest};
use atoms_map::MappingReport;
use atoms_model::{RunSummary, Subtype};
use atoms_standards::{RunConfig, SchemaRegistry, SubtypeCatalog};

use crate::cli::{RunArgs, SchemaArgs, StandardizeArgs};
use crate::summary::{
    print_mapping_report, print_run_summary, schema_columns_table, schema_overview_table,
};

/// Exit status of the `run` command.
pub fn exit_code(summary: &RunSummary) -> i32 {
    if summary.has_failures() { 1 } else { 0 }
}

pub fn run_period(args: &RunArgs) -> Result<RunSummary> {
    let config = run_config(args)?;
    let catalog = SubtypeCatalog::new();
    let only = resolve_only(&catalog, &args.only)?;
    let run_id = args.run_id.clone().unwrap_or_else(default_run_id);

    let span = info_span!("run", run_id = %run_id, period = %args.period);
    let _guard = span.enter();
    let orchestrator = Orchestrator::new(config).context("load reference data")?;
    let request = RunRequest::new(args.period, run_id).with_only(only);
    let summary = orchestrator
        .run(&request)
        .with_context(|| format!("run period {}", args.period))?;
    info!(
        failed = summary.failed_subtypes().count(),
        incidences = summary.incidences.total,
        "run complete"
    );
    print_run_summary(&summary);
    Ok(summary)
}

pub fn show_schema(args: &SchemaArgs) -> Result<()> {
    let config = RunConfig::load(args.config.as_deref()).context("load configuration")?;
    let schemas = SchemaRegistry::load(&config.paths.schema_file).with_context(|| {
        format!(
            "load schema document {}",
            config.paths.schema_file.display()
        )
    })?;
    for (subtype, problem) in schemas.malformed() {
        warn!(subtype = %subtype, problem, "malformed schema entry");
    }
    let catalog = SubtypeCatalog::new();
    match &args.subtype {
        Some(name) => {
            let subtype = resolve_subtype(&catalog, name)?;
            let schema = schemas
                .schema(&subtype)
                .with_context(|| format!("schema for {subtype}"))?;
            println!("{subtype}");
            println!("{}", schema_columns_table(schema));
        }
        None => {
            let rows = schemas
                .subtypes()
                .filter_map(|subtype| schemas.schema(subtype).ok())
                .map(|schema| (schema, catalog.role(schema.subtype())));
            println!("{}", schema_overview_table(rows));
        }
    }
    Ok(())
}

pub fn standardize_file(args: &StandardizeArgs) -> Result<MappingReport> {
    let config = RunConfig::load(args.config.as_deref()).context("load configuration")?;
    let catalog = SubtypeCatalog::new();
    let subtype = resolve_subtype(&catalog, &args.subtype)?;
    let orchestrator = Orchestrator::new(config).context("load reference data")?;
    let standardized = orchestrator
        .standardize_file(&subtype, &args.file)
        .with_context(|| format!("standardize {}", args.file.display()))?;
    let report = standardized.report;
    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize mapping report")?;
        println!("{text}");
    } else {
        print_mapping_report(&report);
    }
    Ok(report)
}

fn run_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = RunConfig::load(args.config.as_deref()).context("load configuration")?;
    if let Some(source) = &args.source {
        config.paths.source_dir = source.clone();
    }
    if let Some(output) = &args.output {
        config.paths.output_dir = output.clone();
    }
    Ok(config)
}

fn default_run_id() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Resolve `--only` names; every one must be a primary subtype.
pub fn resolve_only(catalog: &SubtypeCatalog, names: &[String]) -> Result<Vec<Subtype>> {
    let mut subtypes = Vec::with_capacity(names.len());
    for name in names {
        let subtype = resolve_subtype(catalog, name)?;
        if !catalog.primary().contains(&subtype) {
            bail!("{subtype} is an auxiliary extract; --only takes primary subtypes");
        }
        if !subtypes.contains(&subtype) {
            subtypes.push(subtype);
        }
    }
    Ok(subtypes)
}

fn resolve_subtype(catalog: &SubtypeCatalog, name: &str) -> Result<Subtype> {
    catalog
        .resolve(name)
        .ok_or_else(|| anyhow!("unknown subtype: {name}"))
}
