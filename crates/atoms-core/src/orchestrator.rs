//! Runs one reporting period end to end.
//!
//! Auxiliary extracts are standardized first so Phase B rules can join
//! against them. Primary subtypes then run in catalog order: the corrected
//! BASE table becomes available to SOBREGIRO, and the TDC numbering can seed
//! VALORES through the [`RunContext`]. A subtype that fails is reported in
//! the summary and its incidences are discarded; the others continue.

use std::path::Path;

use atoms_ingest::{
    ConsolidatedSection, DiscoveredFile, ReadOptions, WriteOptions, discover_inputs, read_table,
    write_consolidated, write_table,
};
use atoms_map::{SchemaStandardizer, Standardized};
use atoms_model::{Period, RecordTable, RunSummary, Subtype, SubtypeRole, SubtypeSummary};
use atoms_standards::catalog::BASE_AT12;
use atoms_standards::{RunConfig, SchemaRegistry, SubtypeCatalog, SynonymCatalog};
use chrono::Utc;

use crate::cascade::{AuxiliaryData, CascadeRegistry};
use crate::error::{CoreError, Result};
use crate::incidence::{IncidenceGrouping, IncidenceRecorder};
use crate::output::{OutputLayout, write_json};
use crate::rules::build_default_cascade_registry;
use crate::run_context::RunContext;

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub period: Period,
    pub run_id: String,
    /// Primary subtypes to cascade; empty means all. Auxiliary extracts are
    /// always loaded.
    pub only: Vec<Subtype>,
}

impl RunRequest {
    pub fn new(period: Period, run_id: impl Into<String>) -> Self {
        Self {
            period,
            run_id: run_id.into(),
            only: Vec::new(),
        }
    }

    pub fn with_only(mut self, only: Vec<Subtype>) -> Self {
        self.only = only;
        self
    }

    fn selects(&self, subtype: &Subtype) -> bool {
        self.only.is_empty() || self.only.contains(subtype)
    }
}

/// Run-scoped reference data and the rule cascades.
pub struct Orchestrator {
    config: RunConfig,
    schemas: SchemaRegistry,
    synonyms: SynonymCatalog,
    catalog: SubtypeCatalog,
    cascades: CascadeRegistry,
    standardizer: SchemaStandardizer,
    read_options: ReadOptions,
    write_options: WriteOptions,
    grouping: IncidenceGrouping,
}

impl Orchestrator {
    /// Load the schema document and synonym tables named by `config`.
    pub fn new(config: RunConfig) -> Result<Self> {
        let schemas = SchemaRegistry::load(&config.paths.schema_file)?;
        let mut synonyms = SynonymCatalog::builtin();
        if let Some(path) = &config.paths.synonyms_file {
            synonyms.merge_file(path)?;
        }
        Self::with_parts(config, schemas, synonyms)
    }

    /// Build from already loaded reference data.
    pub fn with_parts(
        config: RunConfig,
        schemas: SchemaRegistry,
        synonyms: SynonymCatalog,
    ) -> Result<Self> {
        let standardizer = SchemaStandardizer::new(config.matching.fuzzy_threshold)?;
        let read_options =
            ReadOptions::from_settings(config.input.delimiter, config.input.encoding.as_deref())?;
        let write_options = WriteOptions::from_settings(&config.output)?;
        Ok(Self {
            schemas,
            synonyms,
            catalog: SubtypeCatalog::new(),
            cascades: build_default_cascade_registry()?,
            standardizer,
            read_options,
            write_options,
            grouping: IncidenceGrouping::default(),
            config,
        })
    }

    pub fn with_grouping(mut self, grouping: IncidenceGrouping) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn catalog(&self) -> &SubtypeCatalog {
        &self.catalog
    }

    pub fn cascades(&self) -> &CascadeRegistry {
        &self.cascades
    }

    /// Mutable access, e.g. to disable a rule for one run.
    pub fn cascades_mut(&mut self) -> &mut CascadeRegistry {
        &mut self.cascades
    }

    /// Read one file and reshape it to the canonical columns of `subtype`.
    pub fn standardize_file(&self, subtype: &Subtype, path: &Path) -> Result<Standardized> {
        let loaded = read_table(path, &self.read_options)?;
        self.standardize(subtype, &loaded.table)
    }

    fn standardize(&self, subtype: &Subtype, table: &RecordTable) -> Result<Standardized> {
        let schema = self.schemas.schema(subtype)?;
        let synonyms = self.synonyms.table_for(subtype);
        Ok(self
            .standardizer
            .standardize(table, schema, Some(&synonyms))?)
    }

    /// Process every input of `request.period` and write the outputs.
    ///
    /// Only setup problems (no inputs, unreadable source directory) and
    /// failures writing run-level files are errors; a failing subtype is
    /// recorded in the returned summary.
    pub fn run(&self, request: &RunRequest) -> Result<RunSummary> {
        let started_at = Utc::now();
        let period = request.period.to_string();
        let source_dir = &self.config.paths.source_dir;

        let discovery = discover_inputs(source_dir, request.period, &self.catalog)?;
        for path in &discovery.unrecognized {
            tracing::debug!(path = %path.display(), "file name does not match an input pattern");
        }
        if discovery.is_empty() {
            return Err(CoreError::NoInputs {
                period,
                dir: source_dir.clone(),
            });
        }

        tracing::info!(run_id = %request.run_id, period = %period, "starting run");
        let layout = OutputLayout::new(&self.config.paths.output_dir, &period, &request.run_id);
        let mut run = RunContext::new(
            &request.run_id,
            request.period,
            &self.config.paths.sequences_dir,
            self.config.sequences.clone(),
        );
        let mut recorder = IncidenceRecorder::new(&request.run_id, &period);
        let mut auxiliary = AuxiliaryData::new();
        let mut subtypes = Vec::new();

        for subtype in self.catalog.auxiliary() {
            let Some(file) = discovery.get(subtype) else {
                continue;
            };
            let span = tracing::info_span!("subtype", subtype = %subtype);
            let _enter = span.enter();
            match self.process_auxiliary(subtype, file, &layout) {
                Ok((table, summary)) => {
                    auxiliary.insert(subtype.as_str(), table);
                    subtypes.push(summary);
                }
                Err(err) => {
                    tracing::error!(error = %err, "auxiliary extract failed");
                    subtypes.push(SubtypeSummary::failed(
                        subtype.as_str(),
                        SubtypeRole::Auxiliary,
                        err.to_string(),
                    ));
                }
            }
        }

        let mut corrected: Vec<(Subtype, RecordTable)> = Vec::new();
        for subtype in self.catalog.primary() {
            if !request.selects(subtype) {
                continue;
            }
            let Some(file) = discovery.get(subtype) else {
                tracing::debug!(subtype = %subtype, "no input for subtype");
                continue;
            };
            let span = tracing::info_span!("subtype", subtype = %subtype);
            let _enter = span.enter();
            match self.process_primary(subtype, file, &layout, &auxiliary, &mut run, &mut recorder)
            {
                Ok((table, summary)) => {
                    if subtype.as_str() == BASE_AT12 {
                        auxiliary.insert(BASE_AT12, table.clone());
                    }
                    corrected.push((subtype.clone(), table));
                    subtypes.push(summary);
                }
                Err(err) => {
                    let discarded = recorder.discard_subtype(subtype.as_str());
                    tracing::error!(error = %err, discarded, "subtype failed");
                    subtypes.push(SubtypeSummary::failed(
                        subtype.as_str(),
                        SubtypeRole::Primary,
                        err.to_string(),
                    ));
                }
            }
        }

        self.write_incidences(&layout, &recorder)?;

        let consolidated_path = if corrected.is_empty() {
            None
        } else {
            let path = layout.consolidated();
            let sections: Vec<ConsolidatedSection<'_>> = corrected
                .iter()
                .map(|(subtype, table)| ConsolidatedSection {
                    subtype: subtype.as_str(),
                    table,
                })
                .collect();
            write_consolidated(&path, &period, &sections, &self.write_options)?;
            Some(path)
        };

        let summary = RunSummary {
            run_id: request.run_id.clone(),
            period,
            started_at,
            finished_at: Utc::now(),
            subtypes,
            incidences: recorder.summary(),
            consolidated_path,
        };
        write_json(&layout.run_summary(), &summary)?;
        tracing::info!(
            subtypes = summary.subtypes.len(),
            failed = summary.failed_subtypes().count(),
            incidences = summary.incidences.total,
            "run finished"
        );
        Ok(summary)
    }

    fn process_auxiliary(
        &self,
        subtype: &Subtype,
        file: &DiscoveredFile,
        layout: &OutputLayout,
    ) -> Result<(RecordTable, SubtypeSummary)> {
        let loaded = read_table(&file.path, &self.read_options)?;
        let standardized = self.standardize(subtype, &loaded.table)?;
        write_json(&layout.mapping_report(subtype.as_str()), &standardized.report)?;

        let output_path = layout.processed_table(subtype.as_str());
        write_table(&output_path, &standardized.table, &self.write_options)?;

        let mut summary = SubtypeSummary::new(subtype.as_str(), SubtypeRole::Auxiliary);
        summary.input_rows = loaded.table.len();
        summary.output_rows = standardized.table.len();
        summary.added_columns = standardized.report.added;
        summary.dropped_columns = standardized.report.dropped;
        summary.output_path = Some(output_path);
        tracing::info!(rows = summary.output_rows, "auxiliary extract loaded");
        Ok((standardized.table, summary))
    }

    fn process_primary(
        &self,
        subtype: &Subtype,
        file: &DiscoveredFile,
        layout: &OutputLayout,
        auxiliary: &AuxiliaryData,
        run: &mut RunContext,
        recorder: &mut IncidenceRecorder,
    ) -> Result<(RecordTable, SubtypeSummary)> {
        let loaded = read_table(&file.path, &self.read_options)?;
        let standardized = self.standardize(subtype, &loaded.table)?;
        write_json(&layout.mapping_report(subtype.as_str()), &standardized.report)?;

        let mut table = standardized.table;
        let rules = self
            .cascades
            .run(subtype.as_str(), &mut table, auxiliary, run, recorder)?;
        table.ensure_columns(self.schemas.schema(subtype)?.columns())?;

        let output_path = layout.processed_table(subtype.as_str());
        write_table(&output_path, &table, &self.write_options)?;

        let mut summary = SubtypeSummary::new(subtype.as_str(), SubtypeRole::Primary);
        summary.input_rows = loaded.table.len();
        summary.output_rows = table.len();
        summary.added_columns = standardized.report.added;
        summary.dropped_columns = standardized.report.dropped;
        summary.incidences = rules.iter().map(|report| report.incidences).sum();
        summary.rules = rules;
        summary.output_path = Some(output_path);
        tracing::info!(
            input_rows = summary.input_rows,
            output_rows = summary.output_rows,
            incidences = summary.incidences,
            "subtype completed"
        );
        Ok((table, summary))
    }

    fn write_incidences(&self, layout: &OutputLayout, recorder: &IncidenceRecorder) -> Result<()> {
        for group in recorder.export(self.grouping) {
            let path = layout.incidence_table(&group.name);
            write_table(&path, &group.table, &self.write_options)?;
        }
        write_json(&layout.incidence_summary(), &recorder.summary())
    }
}
