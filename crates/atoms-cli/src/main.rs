//! AT12 correction engine CLI.
//!
//! Exit codes: 0 when every subtype completed, 1 when at least one subtype
//! failed, 2 when the run could not be set up.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

use atoms_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use atoms_cli::commands::{exit_code, run_period, show_schema, standardize_file};
use atoms_cli::logging::{LogConfig, LogFormat, init_logging};

const EXIT_SETUP: i32 = 2;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(EXIT_SETUP);
    }
    let code = match &cli.command {
        Command::Run(args) => match run_period(args) {
            Ok(summary) => exit_code(&summary),
            Err(error) => report(&error),
        },
        Command::Schema(args) => match show_schema(args) {
            Ok(()) => 0,
            Err(error) => report(&error),
        },
        Command::Standardize(args) => match standardize_file(args) {
            Ok(_) => 0,
            Err(error) => report(&error),
        },
    };
    std::process::exit(code);
}

fn report(error: &anyhow::Error) -> i32 {
    tracing::error!(error = %error, "command failed");
    eprintln!("error: {error:#}");
    EXIT_SETUP
}

/// `--log-level` wins over `RUST_LOG`, which wins over `-v`/`-q`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: cli.log_level.is_none(),
        ..LogConfig::default()
    };
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
