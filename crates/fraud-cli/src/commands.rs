use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::AnyValue;
use tracing::{info, info_span, warn};

use fraud_ingest::{read_csv_table, read_reference_intervals, write_csv_table};
use fraud_model::{
    KeyFormat, OutlierMethod, OutlierRule, PipelineConfig, ReferenceColumns, RunReport,
};
use fraud_transform::{AddressKey, IntervalIndex, OutlierPolicy, OutlierScan, Pipeline, extract_key};

use crate::types::{LookupRow, RunOptions, RunResult};

/// Load the pipeline configuration, or the standard fraud workflow without a file.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(PipelineConfig::fraud_defaults()),
    }
}

/// `<stem>_prepared.csv` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}_prepared.csv"))
}

pub fn run_pipeline(options: &RunOptions) -> Result<RunResult> {
    let span = info_span!("run", input = %options.input.display());
    let _guard = span.enter();

    let mut config = load_config(options.config.as_deref())?;
    if options.continue_on_error {
        config.continue_on_error = true;
    }

    let df = read_csv_table(&options.input)
        .with_context(|| format!("read input {}", options.input.display()))?;
    let input_rows = df.height();

    let intervals = match (&config.geolocation, &options.reference) {
        (Some(geo), Some(path)) => Some(
            read_reference_intervals(path, &geo.reference)
                .with_context(|| format!("read reference {}", path.display()))?,
        ),
        (Some(_), None) => {
            warn!("geolocation is configured but no --reference table was given");
            None
        }
        (None, _) => None,
    };

    let mut pipeline = Pipeline::new(config);
    let output = pipeline.run(df, intervals).context("run pipeline")?;
    let mut data = output.data;

    let output_path = if options.dry_run {
        None
    } else {
        let path = options
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&options.input));
        write_csv_table(&mut data, &path)
            .with_context(|| format!("write output {}", path.display()))?;
        info!(path = %path.display(), rows = data.height(), "wrote prepared table");
        Some(path)
    };

    let report = RunReport {
        input: options.input.clone(),
        output: output_path,
        input_rows,
        output_rows: data.height(),
        output_columns: data.width(),
        stages: output.stages,
        join: output.join,
        diagnostics: output.diagnostics,
    };

    if let Some(path) = &options.report {
        let json = serde_json::to_string_pretty(&report).context("serialize run report")?;
        fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
    }

    Ok(RunResult {
        report,
        report_path: options.report.clone(),
        dry_run: options.dry_run,
    })
}

/// Reference table column names from a config's geolocation section.
pub fn reference_columns(config: &PipelineConfig) -> ReferenceColumns {
    config
        .geolocation
        .as_ref()
        .map(|geo| geo.reference.clone())
        .unwrap_or_default()
}

/// Resolve addresses against a reference table.
///
/// Addresses may be dotted quads or integer keys.
pub fn lookup_addresses(
    reference: &Path,
    columns: &ReferenceColumns,
    addresses: &[String],
) -> Result<Vec<LookupRow>> {
    let intervals = read_reference_intervals(reference, columns)
        .with_context(|| format!("read reference {}", reference.display()))?;
    let index = IntervalIndex::build(intervals).context("index reference ranges")?;

    let rows = addresses
        .iter()
        .map(|address| {
            let (key, error) = match extract_key(AnyValue::String(address.as_str()), KeyFormat::Auto) {
                AddressKey::Key(key) => (Some(key), None),
                AddressKey::Absent => (None, Some("empty address".to_string())),
                AddressKey::Invalid(err) => (None, Some(err.to_string())),
            };
            LookupRow {
                address: address.clone(),
                key,
                payload: key
                    .and_then(|key| index.lookup(key))
                    .map(str::to_string),
                error,
            }
        })
        .collect();
    Ok(rows)
}

/// Count outliers in one column without writing anything.
pub fn scan_outliers(
    input: &Path,
    column: &str,
    method: OutlierMethod,
    threshold: Option<f64>,
) -> Result<OutlierScan> {
    let df = read_csv_table(input).with_context(|| format!("read input {}", input.display()))?;
    let mut rule = OutlierRule::new(column, method);
    rule.threshold = threshold;
    OutlierPolicy::new(rule)
        .detect(&df)
        .with_context(|| format!("scan column {column}"))
}
