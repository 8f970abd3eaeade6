//! Stage orchestration.
//!
//! Stages run in a fixed order: geolocation, outliers, features, normalize,
//! encode. Only configured stages run. Each stage works on its own copy of the
//! table, so a stage that fails never leaves a half-treated table behind.

use std::time::Instant;

use polars::prelude::DataFrame;
use tracing::{info, info_span, warn};

use fraud_model::{
    Diagnostic, DiagnosticKind, Interval, JoinReport, PipelineConfig, Stage, StageOutcome,
    StageStatus,
};

use crate::diagnostics::Diagnostics;
use crate::encode::{ColumnEncoder, Normalizer};
use crate::error::{Result, TransformError};
use crate::features::FeatureDeriver;
use crate::geo::{IntervalIndex, RangeJoinEngine};
use crate::outliers::OutlierPolicy;

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub data: DataFrame,
    pub diagnostics: Vec<Diagnostic>,
    pub join: Option<JoinReport>,
    pub stages: Vec<StageOutcome>,
}

impl PipelineOutput {
    pub fn skipped_stages(&self) -> impl Iterator<Item = &StageOutcome> {
        self.stages
            .iter()
            .filter(|outcome| outcome.status == StageStatus::Skipped)
    }
}

/// Runs the configured stages over a table.
///
/// The pipeline owns its [`Normalizer`], so repeated runs on one pipeline
/// scale later batches with the bounds fitted on the first.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    normalizer: Normalizer,
}

struct StageRunner {
    continue_on_error: bool,
    diagnostics: Diagnostics,
    outcomes: Vec<StageOutcome>,
}

impl StageRunner {
    fn run<F>(&mut self, stage: Stage, df: DataFrame, body: F) -> Result<DataFrame>
    where
        F: FnOnce(DataFrame, &mut Diagnostics) -> Result<DataFrame>,
    {
        let span = info_span!("stage", stage = %stage);
        let _guard = span.enter();
        let start = Instant::now();
        let rows_in = df.height();
        let mut local = Diagnostics::new();

        match body(df.clone(), &mut local) {
            Ok(out) => {
                let duration_ms = start.elapsed().as_millis();
                info!(
                    rows_in,
                    rows_out = out.height(),
                    columns_out = out.width(),
                    duration_ms,
                    "stage complete"
                );
                self.diagnostics.append(local);
                self.outcomes.push(StageOutcome {
                    stage,
                    status: StageStatus::Completed,
                    rows_in,
                    rows_out: out.height(),
                    columns_out: out.width(),
                    duration_ms,
                    error: None,
                });
                Ok(out)
            }
            Err(err) if self.continue_on_error => {
                let duration_ms = start.elapsed().as_millis();
                warn!(error = %err, duration_ms, "stage failed, skipping");
                self.diagnostics.table(
                    stage,
                    DiagnosticKind::StageSkipped,
                    0,
                    format!("stage skipped: {err}"),
                );
                self.outcomes.push(StageOutcome {
                    stage,
                    status: StageStatus::Skipped,
                    rows_in,
                    rows_out: rows_in,
                    columns_out: df.width(),
                    duration_ms,
                    error: Some(err.to_string()),
                });
                Ok(df)
            }
            Err(err) => Err(err),
        }
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            normalizer: Normalizer::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Forget fitted normalization bounds.
    pub fn reset(&mut self) {
        self.normalizer.reset();
    }

    /// Run every configured stage.
    ///
    /// `intervals` is the reference range table; it is required when the
    /// geolocation stage is configured. The interval index built from it lives
    /// only for the duration of that stage. A configuration that fails
    /// validation is rejected before any stage runs.
    pub fn run(
        &mut self,
        df: DataFrame,
        intervals: Option<Vec<Interval>>,
    ) -> Result<PipelineOutput> {
        self.config.validate()?;
        let span = info_span!("pipeline", rows = df.height(), columns = df.width());
        let _guard = span.enter();
        let start = Instant::now();

        let mut runner = StageRunner {
            continue_on_error: self.config.continue_on_error,
            diagnostics: Diagnostics::new(),
            outcomes: Vec::new(),
        };
        let mut join = None;
        let mut df = df;

        if let Some(geo) = &self.config.geolocation {
            let join_slot = &mut join;
            df = runner.run(Stage::Geolocation, df, |df, diagnostics| {
                let intervals = intervals.ok_or(TransformError::MissingReference)?;
                let index = IntervalIndex::build(intervals)?;
                let overlaps = index.overlap_count();
                if overlaps > 0 {
                    warn!(overlaps, "reference ranges overlap");
                }
                let (out, report) = RangeJoinEngine::new(&index).join(&df, geo, diagnostics)?;
                *join_slot = Some(report);
                Ok(out)
            })?;
        }

        if !self.config.outliers.is_empty() {
            let rules = &self.config.outliers;
            df = runner.run(Stage::Outliers, df, |df, diagnostics| {
                OutlierPolicy::apply_all(rules, df, diagnostics)
            })?;
        }

        if let Some(features) = &self.config.features {
            let deriver = FeatureDeriver::new(features.clone());
            df = runner.run(Stage::Features, df, |df, diagnostics| {
                deriver.derive(df, diagnostics)
            })?;
        }

        if let Some(normalize) = &self.config.normalize {
            let normalizer = &mut self.normalizer;
            let columns = &normalize.columns;
            df = runner.run(Stage::Normalize, df, |df, diagnostics| {
                // Bounds fitted by a failing pass must not leak into later runs.
                let mut trial = normalizer.clone();
                let out = trial.normalize(df, columns, diagnostics)?;
                *normalizer = trial;
                Ok(out)
            })?;
        }

        if let Some(encode) = &self.config.encode {
            let encoder = ColumnEncoder::new(encode.clone());
            df = runner.run(Stage::Encode, df, |df, diagnostics| {
                encoder.encode(df, diagnostics).map(|(out, _)| out)
            })?;
        }

        info!(
            rows_out = df.height(),
            columns_out = df.width(),
            stages = runner.outcomes.len(),
            diagnostics = runner.diagnostics.len(),
            duration_ms = start.elapsed().as_millis(),
            "pipeline complete"
        );
        Ok(PipelineOutput {
            data: df,
            diagnostics: runner.diagnostics.into_events(),
            join,
            stages: runner.outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    #[test]
    fn test_empty_config_passes_table_through() {
        let df = DataFrame::new(vec![Series::new("a".into(), &[1i64, 2]).into_column()]).unwrap();
        let output = Pipeline::new(PipelineConfig::default()).run(df, None).unwrap();
        assert_eq!(output.data.height(), 2);
        assert!(output.stages.is_empty());
        assert!(output.join.is_none());
    }

    #[test]
    fn test_missing_reference_halts_without_continue() {
        let df = DataFrame::new(vec![
            Series::new("ip_address".into(), &["1.2.3.4"]).into_column(),
        ])
        .unwrap();
        let config = PipelineConfig {
            geolocation: Some(Default::default()),
            ..PipelineConfig::default()
        };
        let err = Pipeline::new(config).run(df, None).unwrap_err();
        assert!(matches!(err, TransformError::MissingReference));
    }
}
