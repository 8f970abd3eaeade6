//! Min-max normalization and one-hot encoding.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::{DataFrame, DataType};
use tracing::debug;

use fraud_common::{column_string_values, has_column};
use fraud_model::{DiagnosticKind, EncodeConfig, Stage};

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::features::parse_calendar_timestamp;
use crate::frame::{
    numeric_values, put_f64_column, put_indicator_column, require_column, string_values,
};

/// Fitted range of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalerBounds {
    pub min: f64,
    pub max: f64,
}

impl ScalerBounds {
    /// Range of the finite values, `None` if there are none.
    pub fn fit(values: &[Option<f64>]) -> Option<Self> {
        values
            .iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<Self>, &v| {
                Some(match acc {
                    Some(bounds) => Self {
                        min: bounds.min.min(v),
                        max: bounds.max.max(v),
                    },
                    None => Self { min: v, max: v },
                })
            })
    }

    /// Scale into `[0, 1]`; a zero-width range maps everything to 0.
    ///
    /// Ranges wider than `f64::MAX` are scaled on halved operands so the
    /// bounds still map to exactly 0 and 1.
    pub fn scale(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            0.0
        } else if range.is_finite() {
            (value - self.min) / range
        } else {
            let min = self.min / 2.0;
            (value / 2.0 - min) / (self.max / 2.0 - min)
        }
    }
}

/// Min-max scaler that keeps its fitted bounds between batches.
///
/// The first batch that normalizes a column fixes its bounds; later batches
/// are scaled with the same bounds until [`Normalizer::reset`] is called.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    fitted: BTreeMap<String, ScalerBounds>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(&self, column: &str) -> Option<ScalerBounds> {
        self.fitted.get(column).copied()
    }

    pub fn is_fitted(&self) -> bool {
        !self.fitted.is_empty()
    }

    /// Forget all fitted bounds.
    pub fn reset(&mut self) {
        self.fitted.clear();
    }

    pub fn normalize(
        &mut self,
        mut df: DataFrame,
        columns: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<DataFrame> {
        let stage = Stage::Normalize;
        for column in columns {
            require_column(&df, stage, column)?;
        }
        for column in columns {
            let values = numeric_values(&df, stage, column)?;
            let (bounds, reused) = match self.fitted.get(column) {
                Some(bounds) => (*bounds, true),
                None => match ScalerBounds::fit(&values) {
                    Some(bounds) => {
                        self.fitted.insert(column.clone(), bounds);
                        (bounds, false)
                    }
                    None => {
                        diagnostics.column(
                            stage,
                            DiagnosticKind::DegenerateStatistics,
                            column,
                            0,
                            "no finite values to fit, column left unchanged",
                        );
                        continue;
                    }
                },
            };
            let scaled: Vec<Option<f64>> = values
                .iter()
                .map(|value| value.map(|v| bounds.scale(v)))
                .collect();
            let count = scaled.iter().flatten().count();
            put_f64_column(&mut df, column, scaled)?;
            diagnostics.column(
                stage,
                DiagnosticKind::ValuesTransformed,
                column,
                count,
                format!(
                    "min-max scaled with {} bounds [{}, {}]",
                    if reused { "fitted" } else { "new" },
                    bounds.min,
                    bounds.max
                ),
            );
        }
        Ok(df)
    }
}

/// What one encoding pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Source column and the indicator columns that replaced it.
    pub encoded: Vec<(String, Vec<String>)>,
    /// Columns left as they were, with their distinct count.
    pub skipped: Vec<(String, usize)>,
}

impl EncodeSummary {
    pub fn indicator_count(&self) -> usize {
        self.encoded.iter().map(|(_, indicators)| indicators.len()).sum()
    }
}

/// One-hot encoder gated on column cardinality.
#[derive(Debug, Clone, Default)]
pub struct ColumnEncoder {
    config: EncodeConfig,
}

impl ColumnEncoder {
    pub fn new(config: EncodeConfig) -> Self {
        Self { config }
    }

    /// Columns this encoder would consider for `df`.
    ///
    /// Without an explicit list these are the string columns, less those
    /// holding only calendar timestamps.
    pub fn candidates(&self, df: &DataFrame) -> Vec<String> {
        match &self.config.columns {
            Some(columns) => columns.clone(),
            None => df
                .get_columns()
                .iter()
                .filter(|column| column.dtype() == &DataType::String)
                .map(|column| column.name().to_string())
                .filter(|name| !is_temporal(df, name))
                .collect(),
        }
    }

    /// Replace each candidate column with its indicator columns.
    ///
    /// Cells are compared after trimming, so `" Ads"` and `"Ads"` are one
    /// category. A column is left as it is when it has too many categories,
    /// none at all, or an indicator name that is already taken.
    pub fn encode(
        &self,
        mut df: DataFrame,
        diagnostics: &mut Diagnostics,
    ) -> Result<(DataFrame, EncodeSummary)> {
        let stage = Stage::Encode;
        let candidates = self.candidates(&df);
        for column in &candidates {
            require_column(&df, stage, column)?;
        }

        let mut summary = EncodeSummary::default();
        for column in &candidates {
            let values = string_values(&df, stage, column)?;
            let categories: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
            if categories.len() > self.config.cardinality_threshold || categories.is_empty() {
                let reason = if categories.is_empty() {
                    "no non-null values".to_string()
                } else {
                    format!(
                        "{} distinct values exceed the threshold of {}",
                        categories.len(),
                        self.config.cardinality_threshold
                    )
                };
                diagnostics.column(
                    stage,
                    DiagnosticKind::ColumnSkipped,
                    column,
                    categories.len(),
                    reason,
                );
                summary.skipped.push((column.clone(), categories.len()));
                continue;
            }

            let skip = usize::from(self.config.drop_first);
            let indicators: Vec<(String, Vec<i32>)> = categories
                .iter()
                .skip(skip)
                .map(|category| {
                    let flags = values
                        .iter()
                        .map(|value| i32::from(value.as_deref() == Some(*category)))
                        .collect();
                    (format!("{column}_{category}"), flags)
                })
                .collect();

            if let Some((taken, _)) = indicators.iter().find(|(name, _)| has_column(&df, name)) {
                diagnostics.column(
                    stage,
                    DiagnosticKind::ColumnSkipped,
                    column,
                    categories.len(),
                    format!("indicator column '{taken}' already exists"),
                );
                summary.skipped.push((column.clone(), categories.len()));
                continue;
            }

            df = df.drop(column)?;
            let mut names = Vec::with_capacity(indicators.len());
            for (name, flags) in indicators {
                put_indicator_column(&mut df, &name, flags)?;
                names.push(name);
            }
            debug!(column = column.as_str(), indicators = names.len(), "one-hot encoded");
            diagnostics.column(
                stage,
                DiagnosticKind::ColumnsAdded,
                column,
                names.len(),
                format!("replaced by {}", names.join(", ")),
            );
            summary.encoded.push((column.clone(), names));
        }
        Ok((df, summary))
    }
}

fn is_temporal(df: &DataFrame, name: &str) -> bool {
    let Some(values) = column_string_values(df, name) else {
        return false;
    };
    let mut present = values.iter().flatten().peekable();
    present.peek().is_some()
        && present.all(|value| parse_calendar_timestamp(value).is_some())
}
