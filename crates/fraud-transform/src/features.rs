//! Behavioral and temporal feature derivation.
//!
//! Grouped features are computed from each group's full extent and written
//! to every record of the group. Derived columns have fixed names and replace
//! existing columns of the same name.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::DataFrame;
use tracing::{debug, warn};

use fraud_common::parse_f64;
use fraud_model::{DiagnosticKind, FeatureConfig, Stage};

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::frame::{f64_values, put_f64_column, put_i64_column, require_column, string_values};

pub const TRANSACTION_COUNT: &str = "transaction_count";
pub const DAYS_SINCE_FIRST: &str = "days_since_first_transaction";
pub const TRANSACTION_VELOCITY: &str = "transaction_velocity";
pub const TIME_SINCE_SIGNUP: &str = "time_since_signup";
pub const HOUR_OF_DAY: &str = "hour_of_day";
pub const DAY_OF_WEEK: &str = "day_of_week";

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses a timestamp cell.
///
/// Accepts `YYYY-MM-DD HH:MM:SS[.f]` (space or `T` separator), RFC 3339, a
/// bare date at midnight, or a number of Unix epoch seconds. Offsets are
/// normalized to UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(parsed) = parse_calendar_timestamp(trimmed) {
        return Some(parsed);
    }
    let seconds = parse_f64(trimmed)?;
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos).map(|dt| dt.naive_utc())
}

/// Like [`parse_timestamp`] but only for calendar text, not epoch numbers.
pub fn parse_calendar_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, Copy, Default)]
struct GroupExtent {
    count: i64,
    first: Option<NaiveDateTime>,
    last: Option<NaiveDateTime>,
}

impl GroupExtent {
    fn observe(&mut self, time: Option<NaiveDateTime>) {
        self.count += 1;
        if let Some(time) = time {
            self.first = Some(self.first.map_or(time, |first| first.min(time)));
            self.last = Some(self.last.map_or(time, |last| last.max(time)));
        }
    }

    /// Whole days between first and last transaction, plus one.
    fn active_days(&self) -> Option<i64> {
        let (first, last) = (self.first?, self.last?);
        Some((last - first).num_days() + 1)
    }
}

/// Derives the configured feature columns.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    config: FeatureConfig,
}

impl FeatureDeriver {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    fn required_columns(&self) -> Vec<&str> {
        let config = &self.config;
        [
            config.group_column.as_deref(),
            config.time_column.as_deref(),
            config.signup_column.as_deref(),
            config.seconds_column.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Add derived columns to `df`.
    pub fn derive(&self, mut df: DataFrame, diagnostics: &mut Diagnostics) -> Result<DataFrame> {
        let stage = Stage::Features;
        self.config.validate()?;
        for column in self.required_columns() {
            require_column(&df, stage, column)?;
        }
        let times = match &self.config.time_column {
            Some(column) => Some(self.timestamps(&df, column)?),
            None => None,
        };

        let mut added: Vec<&str> = Vec::new();

        if let (Some(group_column), Some(times)) = (&self.config.group_column, &times) {
            self.grouped_features(&mut df, group_column, times)?;
            added.extend([TRANSACTION_COUNT, DAYS_SINCE_FIRST, TRANSACTION_VELOCITY]);
        } else if let Some(group_column) = &self.config.group_column {
            let groups = string_values(&df, stage, group_column)?;
            let counts = group_counts(&groups);
            put_i64_column(&mut df, TRANSACTION_COUNT, counts)?;
            added.push(TRANSACTION_COUNT);
        }

        if let (Some(signup_column), Some(times)) = (&self.config.signup_column, &times) {
            let signups = self.timestamps(&df, signup_column)?;
            let hours: Vec<Option<f64>> = times
                .iter()
                .zip(&signups)
                .map(|(purchase, signup)| match (purchase, signup) {
                    (Some(purchase), Some(signup)) => {
                        Some((*purchase - *signup).num_milliseconds() as f64 / 3_600_000.0)
                    }
                    _ => None,
                })
                .collect();
            put_f64_column(&mut df, TIME_SINCE_SIGNUP, hours)?;
            added.push(TIME_SINCE_SIGNUP);
        }

        if let Some(seconds_column) = &self.config.seconds_column {
            let hours: Vec<Option<i64>> = f64_values(&df, stage, seconds_column)?
                .into_iter()
                .map(|seconds| seconds.filter(|s| s.is_finite()).map(hour_from_seconds))
                .collect();
            put_i64_column(&mut df, HOUR_OF_DAY, hours)?;
            added.push(HOUR_OF_DAY);
        }

        if self.config.calendar_parts
            && let Some(times) = &times
        {
            let hours = times.iter().map(|t| t.map(|t| i64::from(t.hour()))).collect();
            let weekdays = times
                .iter()
                .map(|t| t.map(|t| i64::from(t.weekday().num_days_from_monday())))
                .collect();
            put_i64_column(&mut df, HOUR_OF_DAY, hours)?;
            put_i64_column(&mut df, DAY_OF_WEEK, weekdays)?;
            added.extend([HOUR_OF_DAY, DAY_OF_WEEK]);
        }

        if !added.is_empty() {
            diagnostics.table(
                stage,
                DiagnosticKind::ColumnsAdded,
                added.len(),
                format!("derived {}", added.join(", ")),
            );
        }
        Ok(df)
    }

    fn timestamps(&self, df: &DataFrame, column: &str) -> Result<Vec<Option<NaiveDateTime>>> {
        let raw = string_values(df, Stage::Features, column)?;
        let mut unparsable = 0usize;
        let parsed = raw
            .iter()
            .map(|value| {
                let value = value.as_deref()?;
                let parsed = parse_timestamp(value);
                if parsed.is_none() {
                    unparsable += 1;
                }
                parsed
            })
            .collect();
        if unparsable > 0 {
            warn!(column, unparsable, "timestamps could not be parsed");
        }
        Ok(parsed)
    }

    fn grouped_features(
        &self,
        df: &mut DataFrame,
        group_column: &str,
        times: &[Option<NaiveDateTime>],
    ) -> Result<()> {
        let groups = string_values(df, Stage::Features, group_column)?;
        let mut extents: HashMap<&str, GroupExtent> = HashMap::new();
        for (group, time) in groups.iter().zip(times) {
            if let Some(group) = group {
                extents.entry(group.as_str()).or_default().observe(*time);
            }
        }
        debug!(groups = extents.len(), "grouped records");

        let mut counts = Vec::with_capacity(groups.len());
        let mut days = Vec::with_capacity(groups.len());
        let mut velocity = Vec::with_capacity(groups.len());
        for group in &groups {
            let extent = group.as_deref().and_then(|group| extents.get(group));
            let active = extent.and_then(GroupExtent::active_days);
            counts.push(extent.map(|extent| extent.count));
            days.push(active);
            velocity.push(
                extent
                    .zip(active)
                    .map(|(extent, active)| extent.count as f64 / active as f64),
            );
        }
        put_i64_column(df, TRANSACTION_COUNT, counts)?;
        put_i64_column(df, DAYS_SINCE_FIRST, days)?;
        put_f64_column(df, TRANSACTION_VELOCITY, velocity)?;
        Ok(())
    }
}

fn group_counts(groups: &[Option<String>]) -> Vec<Option<i64>> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for group in groups.iter().flatten() {
        *counts.entry(group.as_str()).or_default() += 1;
    }
    groups
        .iter()
        .map(|group| group.as_deref().and_then(|group| counts.get(group).copied()))
        .collect()
}

/// Hour of day for a raw seconds offset; negative offsets wrap.
fn hour_from_seconds(seconds: f64) -> i64 {
    (seconds.floor() as i64).rem_euclid(SECONDS_PER_DAY) / SECONDS_PER_HOUR
}
