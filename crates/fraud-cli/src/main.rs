//! fraudprep CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use fraud_cli::commands::{
    load_config, lookup_addresses, reference_columns, run_pipeline, scan_outliers,
};
use fraud_cli::logging::{LogConfig, LogFormat, init_logging};
use fraud_cli::types::RunOptions;
use tracing::level_filters::LevelFilter;

mod cli;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, RunArgs};
use crate::summary::{print_lookup, print_outlier_scan, print_run_summary};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match cli.command {
        Command::Run(args) => finish(run_pipeline(&run_options(args)), print_run_summary),
        Command::Lookup(args) => finish(
            load_config(args.config.as_deref()).and_then(|config| {
                lookup_addresses(&args.reference, &reference_columns(&config), &args.addresses)
            }),
            |rows| print_lookup(rows),
        ),
        Command::Outliers(args) => finish(
            scan_outliers(&args.input, &args.column, args.method.method(), args.threshold),
            print_outlier_scan,
        ),
    };
    std::process::exit(exit_code);
}

/// Print a command's result, or its error chain, and pick the exit code.
fn finish<T>(result: anyhow::Result<T>, print: impl FnOnce(&T)) -> i32 {
    match result {
        Ok(value) => {
            print(&value);
            0
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    }
}

fn run_options(args: RunArgs) -> RunOptions {
    RunOptions {
        input: args.input,
        reference: args.reference,
        config: args.config,
        output: args.output,
        report: args.report,
        continue_on_error: args.continue_on_error,
        dry_run: args.dry_run,
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
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
