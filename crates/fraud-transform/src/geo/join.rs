//! Range join of a transaction table against an [`IntervalIndex`].

use polars::prelude::DataFrame;
use tracing::info;

use fraud_model::{DiagnosticKind, GeolocationConfig, JoinReport, Stage, UnmatchedMode};

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::frame::{put_i64_column, put_string_column, require_column, retain_rows};
use crate::geo::address::{AddressKey, extract_key};
use crate::geo::index::IntervalIndex;

const MAX_INVALID_SAMPLES: usize = 5;

/// Resolves address keys to interval payloads.
///
/// Every key is looked up independently against the index, so the fact table
/// never needs sorting and output rows keep their input order.
#[derive(Debug, Clone, Copy)]
pub struct RangeJoinEngine<'a> {
    index: &'a IntervalIndex,
}

impl<'a> RangeJoinEngine<'a> {
    pub fn new(index: &'a IntervalIndex) -> Self {
        Self { index }
    }

    /// Payload per key, `None` for absent or unmatched keys.
    pub fn match_keys(&self, keys: &[Option<u32>]) -> Vec<Option<&'a str>> {
        keys.iter()
            .map(|key| key.and_then(|key| self.index.lookup(key)))
            .collect()
    }

    /// Attach the payload column to `df`.
    ///
    /// Rows without a payload are removed or kept with a null payload,
    /// depending on [`UnmatchedMode`].
    pub fn join(
        &self,
        df: &DataFrame,
        config: &GeolocationConfig,
        diagnostics: &mut Diagnostics,
    ) -> Result<(DataFrame, JoinReport)> {
        let stage = Stage::Geolocation;
        require_column(df, stage, &config.key_column)?;
        let column = df.column(&config.key_column)?;

        let mut report = JoinReport {
            input_rows: df.height(),
            ..JoinReport::default()
        };
        let mut payloads: Vec<Option<String>> = Vec::with_capacity(df.height());
        let mut keys: Vec<Option<i64>> = Vec::with_capacity(df.height());

        for idx in 0..df.height() {
            let key = match extract_key(column.get(idx)?, config.key_format) {
                AddressKey::Key(key) => Some(key),
                AddressKey::Absent => {
                    report.absent_key += 1;
                    None
                }
                AddressKey::Invalid(err) => {
                    report.invalid_key += 1;
                    if report.invalid_samples.len() < MAX_INVALID_SAMPLES {
                        report.invalid_samples.push(err.input().to_string());
                    }
                    None
                }
            };
            let payload = key.and_then(|key| self.index.lookup(key));
            match (key, payload) {
                (Some(_), Some(_)) => report.matched += 1,
                (Some(_), None) => report.unmatched += 1,
                (None, _) => {}
            }
            payloads.push(payload.map(str::to_string));
            keys.push(key.map(i64::from));
        }

        let keep: Vec<bool> = payloads.iter().map(Option::is_some).collect();
        let mut out = df.clone();
        put_string_column(&mut out, &config.payload_column, payloads)?;
        if let Some(name) = &config.key_output_column {
            put_i64_column(&mut out, name, keys)?;
        }
        if config.unmatched == UnmatchedMode::Drop {
            retain_rows(&mut out, &keep)?;
        }
        report.output_rows = out.height();

        record_diagnostics(config, &report, diagnostics);
        info!(
            stage = %stage,
            rows_in = report.input_rows,
            matched = report.matched,
            unmatched = report.unmatched,
            absent = report.absent_key,
            invalid = report.invalid_key,
            rows_out = report.output_rows,
            "geolocation join complete"
        );
        Ok((out, report))
    }
}

fn record_diagnostics(config: &GeolocationConfig, report: &JoinReport, diagnostics: &mut Diagnostics) {
    let stage = Stage::Geolocation;
    let (kind, verb) = match config.unmatched {
        UnmatchedMode::Drop => (DiagnosticKind::RowsDropped, "dropped"),
        UnmatchedMode::Preserve => (DiagnosticKind::RowsTagged, "kept with null payload"),
    };
    let key = config.key_column.as_str();
    if report.invalid_key > 0 {
        diagnostics.column(
            stage,
            kind,
            key,
            report.invalid_key,
            format!(
                "malformed addresses {verb}, e.g. {}",
                report.invalid_samples.join(", ")
            ),
        );
    }
    if report.absent_key > 0 {
        diagnostics.column(stage, kind, key, report.absent_key, format!("missing addresses {verb}"));
    }
    if report.unmatched > 0 {
        diagnostics.column(
            stage,
            kind,
            key,
            report.unmatched,
            format!("addresses outside every reference range {verb}"),
        );
    }
    diagnostics.column(
        stage,
        DiagnosticKind::ColumnsAdded,
        &config.payload_column,
        1,
        format!("{} of {} rows geolocated", report.matched, report.input_rows),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraud_model::Interval;
    use polars::prelude::{IntoColumn, NamedFrom, Series};

    fn index() -> IntervalIndex {
        IntervalIndex::build(vec![
            Interval::new(0, 999, "A"),
            Interval::new(1000, 1999, "B"),
        ])
        .unwrap()
    }

    #[test]
    fn test_match_keys() {
        let index = index();
        let engine = RangeJoinEngine::new(&index);
        assert_eq!(
            engine.match_keys(&[Some(999), None, Some(1000), Some(2000)]),
            vec![Some("A"), None, Some("B"), None]
        );
    }

    #[test]
    fn test_join_counts_each_reason() {
        let index = index();
        let df = DataFrame::new(vec![
            Series::new(
                "ip_address".into(),
                &[Some("0.0.3.231"), None, Some("abc"), Some("0.0.7.208"), Some("1500")],
            )
            .into_column(),
        ])
        .unwrap();
        let config = GeolocationConfig {
            unmatched: UnmatchedMode::Preserve,
            ..GeolocationConfig::default()
        };
        let mut diagnostics = Diagnostics::new();
        let (out, report) = RangeJoinEngine::new(&index)
            .join(&df, &config, &mut diagnostics)
            .unwrap();
        // 0.0.3.231 = 999, 0.0.7.208 = 2000
        assert_eq!(report.matched, 2);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.absent_key, 1);
        assert_eq!(report.invalid_key, 1);
        assert_eq!(report.invalid_samples, vec!["abc".to_string()]);
        assert_eq!(out.height(), 5);
        assert!(!diagnostics.is_empty());
    }
}
