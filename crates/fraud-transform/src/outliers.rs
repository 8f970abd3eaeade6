//! Outlier treatment for numeric columns.
//!
//! Each [`OutlierPolicy`] wraps one [`OutlierRule`] and is applied to the
//! column's values as they are when the rule runs, so a batch of rules sees
//! the effect of the rules before it. Null and `NaN` cells are never
//! outliers; a column with other cells that do not read as numbers is
//! rejected before anything is rewritten.

use polars::prelude::DataFrame;
use tracing::debug;

use fraud_model::{DiagnosticKind, OutlierMethod, OutlierRule, QuantileMethod, Stage};

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::frame::{numeric_values, put_f64_column, retain_rows};

/// Fewest non-null values for which quartiles are computed.
const MIN_IQR_VALUES: usize = 4;

/// Quantile `q` of an ascending, non-empty slice.
///
/// [`QuantileMethod::Inward`] picks the order statistic whose rank is rounded
/// toward the median; [`QuantileMethod::Linear`] interpolates between the two
/// neighbouring order statistics.
pub fn quantile(sorted: &[f64], q: f64, method: QuantileMethod) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = q.clamp(0.0, 1.0) * last as f64;
    match method {
        QuantileMethod::Inward => {
            let idx = if q < 0.5 { rank.ceil() } else { rank.floor() };
            sorted.get(idx as usize).copied()
        }
        QuantileMethod::Linear => {
            let below = rank.floor() as usize;
            let above = rank.ceil() as usize;
            let fraction = rank - below as f64;
            let low = *sorted.get(below)?;
            let high = *sorted.get(above)?;
            Some(low + (high - low) * fraction)
        }
    }
}

fn mean_and_stdev(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}

/// Where the outlier boundary of a column lies.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Fence {
    Iqr { lower: f64, upper: f64 },
    Zscore { mean: f64, stdev: f64, threshold: f64 },
    /// Statistics are undefined; nothing is an outlier.
    Degenerate,
    /// The log transform has no fence.
    Unbounded,
}

impl Fence {
    fn bounds(self) -> Option<(f64, f64)> {
        match self {
            Self::Iqr { lower, upper } => Some((lower, upper)),
            Self::Zscore {
                mean,
                stdev,
                threshold,
            } => Some((mean - threshold * stdev, mean + threshold * stdev)),
            Self::Degenerate | Self::Unbounded => None,
        }
    }

    fn is_outlier(self, value: f64) -> bool {
        match self {
            Self::Iqr { lower, upper } => value < lower || value > upper,
            Self::Zscore {
                mean,
                stdev,
                threshold,
            } => ((value - mean) / stdev).abs() > threshold,
            Self::Degenerate | Self::Unbounded => false,
        }
    }

    fn cap(self, value: f64) -> f64 {
        match self.bounds() {
            Some((lower, upper)) if self.is_outlier(value) => value.clamp(lower, upper),
            _ => value,
        }
    }
}

/// Outliers found in one column, without changing the table.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierScan {
    pub column: String,
    pub method: OutlierMethod,
    /// Values outside `[lower, upper]` are outliers.
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub non_null: usize,
    /// Row positions of the outliers, ascending.
    pub rows: Vec<usize>,
    /// Set when the statistics could not be computed.
    pub degenerate: Option<String>,
}

impl OutlierScan {
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Share of non-null values that are outliers.
    pub fn fraction(&self) -> f64 {
        if self.non_null == 0 {
            0.0
        } else {
            self.rows.len() as f64 / self.non_null as f64
        }
    }
}

/// One outlier rule bound to its statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierPolicy {
    rule: OutlierRule,
}

impl OutlierPolicy {
    pub fn new(rule: OutlierRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &OutlierRule {
        &self.rule
    }

    /// Compute the fence from a column's current values.
    fn fence(&self, values: &[Option<f64>]) -> (Fence, Option<String>) {
        let mut finite: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
        let threshold = self.rule.effective_threshold().max(0.0);
        match self.rule.method {
            OutlierMethod::Log => (Fence::Unbounded, None),
            OutlierMethod::IqrCap | OutlierMethod::IqrRemove => {
                if finite.len() < MIN_IQR_VALUES {
                    return (
                        Fence::Degenerate,
                        Some(format!(
                            "{} non-null values, quartiles need at least {MIN_IQR_VALUES}",
                            finite.len()
                        )),
                    );
                }
                finite.sort_by(f64::total_cmp);
                let q1 = quantile(&finite, 0.25, self.rule.quantile);
                let q3 = quantile(&finite, 0.75, self.rule.quantile);
                match (q1, q3) {
                    (Some(q1), Some(q3)) => {
                        let iqr = q3 - q1;
                        (
                            Fence::Iqr {
                                lower: q1 - threshold * iqr,
                                upper: q3 + threshold * iqr,
                            },
                            None,
                        )
                    }
                    _ => (Fence::Degenerate, Some("quartiles undefined".to_string())),
                }
            }
            OutlierMethod::ZscoreCap | OutlierMethod::ZscoreRemove => {
                match mean_and_stdev(&finite) {
                    Some((mean, stdev)) if stdev > 0.0 && stdev.is_finite() => (
                        Fence::Zscore {
                            mean,
                            stdev,
                            threshold,
                        },
                        None,
                    ),
                    Some(_) => (Fence::Degenerate, Some("standard deviation is zero".to_string())),
                    None => (
                        Fence::Degenerate,
                        Some(format!(
                            "{} non-null values, z-scores need at least 2",
                            finite.len()
                        )),
                    ),
                }
            }
        }
    }

    /// Locate outliers without modifying the table.
    pub fn detect(&self, df: &DataFrame) -> Result<OutlierScan> {
        let values = numeric_values(df, Stage::Outliers, &self.rule.column)?;
        let (fence, degenerate) = self.fence(&values);
        let bounds = fence.bounds();
        let rows = values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| value.filter(|v| fence.is_outlier(*v)).map(|_| idx))
            .collect();
        Ok(OutlierScan {
            column: self.rule.column.clone(),
            method: self.rule.method,
            lower: bounds.map(|(lower, _)| lower),
            upper: bounds.map(|(_, upper)| upper),
            non_null: values.iter().flatten().count(),
            rows,
            degenerate,
        })
    }

    /// Apply the rule, returning the treated table.
    pub fn apply(&self, df: DataFrame, diagnostics: &mut Diagnostics) -> Result<DataFrame> {
        let stage = Stage::Outliers;
        let column = self.rule.column.as_str();
        let method = self.rule.method;
        let values = numeric_values(&df, stage, column)?;
        let (fence, degenerate) = self.fence(&values);

        if let Some(reason) = degenerate {
            diagnostics.column(
                stage,
                DiagnosticKind::DegenerateStatistics,
                column,
                0,
                format!("{} left unchanged: {reason}", method.as_str()),
            );
            return Ok(df);
        }

        let mut df = df;
        match method {
            OutlierMethod::IqrCap | OutlierMethod::ZscoreCap => {
                let mut capped = 0usize;
                let treated: Vec<Option<f64>> = values
                    .iter()
                    .map(|value| {
                        value.map(|v| {
                            if fence.is_outlier(v) {
                                capped += 1;
                            }
                            fence.cap(v)
                        })
                    })
                    .collect();
                put_f64_column(&mut df, column, treated)?;
                if capped > 0 {
                    diagnostics.column(
                        stage,
                        DiagnosticKind::ValuesCapped,
                        column,
                        capped,
                        format!("{} capped values to {}", method.as_str(), describe(fence)),
                    );
                }
            }
            OutlierMethod::IqrRemove | OutlierMethod::ZscoreRemove => {
                let keep: Vec<bool> = values
                    .iter()
                    .map(|value| !value.is_some_and(|v| fence.is_outlier(v)))
                    .collect();
                let removed = retain_rows(&mut df, &keep)?;
                if removed > 0 {
                    diagnostics.column(
                        stage,
                        DiagnosticKind::RowsDropped,
                        column,
                        removed,
                        format!("{} removed rows outside {}", method.as_str(), describe(fence)),
                    );
                }
            }
            OutlierMethod::Log => {
                let mut transformed = 0usize;
                let treated: Vec<Option<f64>> = values
                    .iter()
                    .map(|value| {
                        value.map(|v| {
                            if v > 0.0 {
                                transformed += 1;
                                v.ln_1p()
                            } else {
                                v
                            }
                        })
                    })
                    .collect();
                put_f64_column(&mut df, column, treated)?;
                if transformed > 0 {
                    diagnostics.column(
                        stage,
                        DiagnosticKind::ValuesTransformed,
                        column,
                        transformed,
                        "log1p applied to positive values",
                    );
                }
            }
        }
        debug!(
            column,
            method = method.as_str(),
            rows_out = df.height(),
            "outlier rule applied"
        );
        Ok(df)
    }

    /// Apply rules in order.
    pub fn apply_all(
        rules: &[OutlierRule],
        mut df: DataFrame,
        diagnostics: &mut Diagnostics,
    ) -> Result<DataFrame> {
        for rule in rules {
            df = Self::new(rule.clone()).apply(df, diagnostics)?;
        }
        Ok(df)
    }
}

fn describe(fence: Fence) -> String {
    match fence.bounds() {
        Some((lower, upper)) => format!("[{lower:.4}, {upper:.4}]"),
        None => "no bounds".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    use crate::frame::f64_values;

    fn frame(values: &[Option<f64>]) -> DataFrame {
        DataFrame::new(vec![Series::new("x".into(), values).into_column()]).unwrap()
    }

    fn column(df: &DataFrame) -> Vec<Option<f64>> {
        f64_values(df, Stage::Outliers, "x").unwrap()
    }

    #[test]
    fn test_quantile_methods() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        // rank 1.75 and 5.25
        assert_eq!(quantile(&sorted, 0.25, QuantileMethod::Inward), Some(3.0));
        assert_eq!(quantile(&sorted, 0.75, QuantileMethod::Inward), Some(6.0));
        assert_eq!(quantile(&sorted, 0.25, QuantileMethod::Linear), Some(2.75));
        assert_eq!(quantile(&sorted, 0.75, QuantileMethod::Linear), Some(6.25));
        assert_eq!(quantile(&[], 0.5, QuantileMethod::Linear), None);
    }

    #[test]
    fn test_iqr_cap_clamps_and_keeps_nulls() {
        let df = frame(&[
            Some(1.0),
            Some(2.0),
            Some(3.0),
            Some(4.0),
            None,
            Some(100.0),
        ]);
        let mut diagnostics = Diagnostics::new();
        let policy = OutlierPolicy::new(OutlierRule::new("x", OutlierMethod::IqrCap));
        let out = policy.apply(df, &mut diagnostics).unwrap();
        // n=5: Q1 rank 1 -> 2, Q3 rank 3 -> 4, IQR 2, upper 7
        assert_eq!(
            column(&out),
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), None, Some(7.0)]
        );
        assert_eq!(diagnostics.of_kind(DiagnosticKind::ValuesCapped).count(), 1);
    }

    #[test]
    fn test_iqr_with_few_values_is_noop() {
        let df = frame(&[Some(1.0), Some(1000.0), None]);
        let mut diagnostics = Diagnostics::new();
        let policy = OutlierPolicy::new(OutlierRule::new("x", OutlierMethod::IqrRemove));
        let out = policy.apply(df, &mut diagnostics).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(
            diagnostics
                .of_kind(DiagnosticKind::DegenerateStatistics)
                .count(),
            1
        );
    }

    #[test]
    fn test_zscore_remove_and_constant_column() {
        let mut values: Vec<Option<f64>> = vec![Some(10.0); 20];
        values.push(Some(1000.0));
        let mut diagnostics = Diagnostics::new();
        let policy = OutlierPolicy::new(OutlierRule::new("x", OutlierMethod::ZscoreRemove));
        let out = policy.apply(frame(&values), &mut diagnostics).unwrap();
        assert_eq!(out.height(), 20);

        let constant = frame(&[Some(5.0), Some(5.0), Some(5.0)]);
        let out = policy.apply(constant, &mut diagnostics).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(
            diagnostics
                .of_kind(DiagnosticKind::DegenerateStatistics)
                .count(),
            1
        );
    }

    #[test]
    fn test_log_passes_non_positive_through() {
        let df = frame(&[Some(-2.0), Some(0.0), Some(std::f64::consts::E - 1.0), None]);
        let mut diagnostics = Diagnostics::new();
        let policy = OutlierPolicy::new(OutlierRule::new("x", OutlierMethod::Log));
        let out = policy.apply(df, &mut diagnostics).unwrap();
        let values = column(&out);
        assert_eq!(values[0], Some(-2.0));
        assert_eq!(values[1], Some(0.0));
        assert!((values[2].unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(values[3], None);
    }

    #[test]
    fn test_detect_does_not_modify() {
        let df = frame(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(50.0)]);
        let policy = OutlierPolicy::new(OutlierRule::new("x", OutlierMethod::IqrCap));
        let scan = policy.detect(&df).unwrap();
        assert_eq!(scan.rows, vec![4]);
        assert_eq!(scan.non_null, 5);
        assert_eq!(column(&df)[4], Some(50.0));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let df = frame(&[Some(1.0)]);
        let policy = OutlierPolicy::new(OutlierRule::new("amount", OutlierMethod::Log));
        let err = policy.apply(df, &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, crate::TransformError::Schema { .. }));
    }

    #[test]
    fn test_log_rejects_text_column() {
        let df = DataFrame::new(vec![
            Series::new("source".into(), &["SEO", "Ads", "Direct"]).into_column(),
        ])
        .unwrap();
        let policy = OutlierPolicy::new(OutlierRule::new("source", OutlierMethod::Log));
        let err = policy.apply(df, &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(
            err,
            crate::TransformError::NonNumeric { count: 3, .. }
        ));
    }

    #[test]
    fn test_nan_cells_are_not_counted_as_capped() {
        let df = frame(&[
            Some(1.0),
            Some(2.0),
            Some(3.0),
            Some(4.0),
            Some(f64::NAN),
            Some(100.0),
        ]);
        let mut diagnostics = Diagnostics::new();
        let policy = OutlierPolicy::new(OutlierRule::new("x", OutlierMethod::IqrCap));
        policy.apply(df, &mut diagnostics).unwrap();
        let capped: Vec<_> = diagnostics.of_kind(DiagnosticKind::ValuesCapped).collect();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].count, 1);
    }
}
