//! CLI argument definitions for fraudprep.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use fraud_model::OutlierMethod;

#[derive(Parser)]
#[command(
    name = "fraudprep",
    version,
    about = "Prepare e-commerce fraud transaction data for modeling",
    long_about = "Prepare e-commerce fraud transaction data for modeling.\n\n\
                  Geolocates IP addresses against a range table, treats outliers,\n\
                  derives velocity and time features, and normalizes/encodes columns."
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

    /// Explicit log level (overrides -v/-q flags).
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

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the preparation pipeline over a transaction table.
    Run(RunArgs),

    /// Geolocate addresses against a reference range table.
    Lookup(LookupArgs),

    /// Report outliers in one column without changing anything.
    Outliers(OutlierArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Transaction table (CSV with a header row).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// IP-range reference table (CSV).
    #[arg(long = "reference", value_name = "CSV")]
    pub reference: Option<PathBuf>,

    /// Pipeline configuration (TOML). Defaults to the standard fraud workflow.
    #[arg(long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Output table (default: <INPUT stem>_prepared.csv next to the input).
    #[arg(long = "output", value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Write a JSON run report.
    #[arg(long = "report", value_name = "JSON")]
    pub report: Option<PathBuf>,

    /// Skip a failing stage instead of stopping the run.
    #[arg(long = "continue-on-error")]
    pub continue_on_error: bool,

    /// Run every stage but do not write the output table.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct LookupArgs {
    /// IP-range reference table (CSV).
    #[arg(long = "reference", value_name = "CSV")]
    pub reference: PathBuf,

    /// Pipeline configuration whose geolocation section names the reference columns.
    #[arg(long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Dotted-quad or integer addresses.
    #[arg(value_name = "ADDRESS", required = true)]
    pub addresses: Vec<String>,
}

#[derive(Args)]
pub struct OutlierArgs {
    /// Transaction table (CSV with a header row).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Numeric column to scan.
    #[arg(long = "column", value_name = "NAME")]
    pub column: String,

    #[arg(long = "method", value_enum, default_value = "iqr")]
    pub method: ScanMethodArg,

    /// Fence multiplier (default 1.5 for iqr, 3 for zscore).
    #[arg(long = "threshold", value_name = "T")]
    pub threshold: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ScanMethodArg {
    Iqr,
    Zscore,
}

impl ScanMethodArg {
    pub fn method(self) -> OutlierMethod {
        match self {
            Self::Iqr => OutlierMethod::IqrCap,
            Self::Zscore => OutlierMethod::ZscoreCap,
        }
    }
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
