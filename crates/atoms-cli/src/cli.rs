//! CLI argument definitions for the AT12 correction engine.

use std::path::PathBuf;

use atoms_model::Period;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "atoms",
    version,
    about = "AT12 correction engine - standardize, correct and consolidate guarantee extracts",
    long_about = "Standardize the monthly AT12 guarantee extracts to their canonical columns,\n\
                  apply the correction rules, and write the corrected tables, incidence\n\
                  reports and the consolidated regulatory file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides RUST_LOG and -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Also write logs to a file.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process every extract of a reporting period.
    Run(RunArgs),

    /// Print the canonical columns per subtype.
    Schema(SchemaArgs),

    /// Print the mapping report for one file without running the corrections.
    Standardize(StandardizeArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Reporting period as YYYYMM.
    #[arg(long, value_name = "YYYYMM", value_parser = parse_period)]
    pub period: Period,

    /// Run identifier (default: current local time as YYYYMMDDHHMMSS).
    #[arg(long = "run-id", value_name = "ID")]
    pub run_id: Option<String>,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the input extracts (overrides the configuration).
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Output root (overrides the configuration).
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Restrict the run to these primary subtypes.
    #[arg(long, value_name = "SUBTYPE", num_args = 1..)]
    pub only: Vec<String>,
}

#[derive(Parser)]
pub struct SchemaArgs {
    /// Show only this subtype.
    #[arg(long, value_name = "SUBTYPE")]
    pub subtype: Option<String>,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct StandardizeArgs {
    /// Subtype whose canonical columns the file is mapped to.
    #[arg(long, value_name = "SUBTYPE")]
    pub subtype: String,

    /// Input file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_period(value: &str) -> Result<Period, String> {
    Period::parse(value).map_err(|error| error.to_string())
}
