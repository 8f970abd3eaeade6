//! Polars `AnyValue` and column utility functions.
//!
//! The transformation stages work row by row with explicit ordering, so most
//! of them start by pulling a whole column out of the frame as plain Rust
//! values. These helpers do that extraction in one place.

use polars::prelude::{AnyValue, DataFrame};

/// Cell text as it would be written to CSV; empty for null.
///
/// ```
/// use polars::prelude::AnyValue;
/// use fraud_common::any_to_string;
///
/// assert_eq!(any_to_string(AnyValue::Null), "");
/// assert_eq!(any_to_string(AnyValue::Float64(16777300.0)), "16777300");
/// assert_eq!(any_to_string(AnyValue::String("SEO")), "SEO");
/// ```
pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Float32(v) => format_numeric(f64::from(v)),
        AnyValue::Float64(v) => format_numeric(v),
        other => other.to_string(),
    }
}

/// Trimmed cell text, `None` for null or blank cells.
pub fn any_to_string_non_empty(value: AnyValue<'_>) -> Option<String> {
    let text = any_to_string(value);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Shortest decimal form of `v`, with negative zero written as `0`.
///
/// ```
/// use fraud_common::format_numeric;
///
/// assert_eq!(format_numeric(3232235521.0), "3232235521");
/// assert_eq!(format_numeric(1.5), "1.5");
/// assert_eq!(format_numeric(-0.0), "0");
/// ```
pub fn format_numeric(v: f64) -> String {
    if v == 0.0 { "0".to_string() } else { v.to_string() }
}

/// Numeric reading of a cell. Strings are parsed, booleans read as 0/1, and
/// null, `NaN`, or non-numeric cells are `None`.
pub fn any_to_f64(value: AnyValue<'_>) -> Option<f64> {
    let number = match value {
        AnyValue::Null => None,
        AnyValue::Boolean(b) => Some(f64::from(u8::from(b))),
        AnyValue::String(s) => parse_f64(s),
        AnyValue::StringOwned(s) => parse_f64(&s),
        AnyValue::Float64(v) => Some(v),
        AnyValue::Float32(v) => Some(f64::from(v)),
        AnyValue::Int64(v) => Some(v as f64),
        AnyValue::UInt64(v) => Some(v as f64),
        AnyValue::Int32(v) => Some(f64::from(v)),
        AnyValue::UInt32(v) => Some(f64::from(v)),
        AnyValue::Int16(v) => Some(f64::from(v)),
        AnyValue::UInt16(v) => Some(f64::from(v)),
        AnyValue::Int8(v) => Some(f64::from(v)),
        AnyValue::UInt8(v) => Some(f64::from(v)),
        _ => None,
    };
    number.filter(|v| !v.is_nan())
}

/// Parse trimmed text as `f64`; blank, `NaN`, and non-numeric text are `None`.
pub fn parse_f64(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
}

/// Returns true when the frame has a column with exactly this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Column names in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Extract a column as optional floats, one entry per row.
///
/// Returns `None` when the column does not exist. Cells that cannot be read
/// as numbers come back as `None`.
pub fn column_f64_values(df: &DataFrame, name: &str) -> Option<Vec<Option<f64>>> {
    let column = df.column(name).ok()?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_f64(column.get(idx).unwrap_or(AnyValue::Null)));
    }
    Some(values)
}

/// Extract a column as optional trimmed strings, one entry per row.
///
/// Returns `None` when the column does not exist. Null and blank cells come
/// back as `None`.
pub fn column_string_values(df: &DataFrame, name: &str) -> Option<Vec<Option<String>>> {
    let column = df.column(name).ok()?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_string_non_empty(
            column.get(idx).unwrap_or(AnyValue::Null),
        ));
    }
    Some(values)
}
