use std::path::PathBuf;

use fraud_model::RunReport;

/// Inputs of `fraudprep run`, after argument parsing.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub input: PathBuf,
    pub reference: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub continue_on_error: bool,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct RunResult {
    pub report: RunReport,
    /// Where the JSON run report went, if anywhere.
    pub report_path: Option<PathBuf>,
    pub dry_run: bool,
}

/// One address resolved by `fraudprep lookup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRow {
    pub address: String,
    pub key: Option<u32>,
    pub payload: Option<String>,
    pub error: Option<String>,
}
