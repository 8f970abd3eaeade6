//! Column extraction and write-back helpers shared by the stages.
//!
//! Stages read a column into plain Rust values, compute the result row by row
//! in input order, and write a whole column back. Writing replaces an existing
//! column of the same name in place, otherwise appends it.

use polars::prelude::{
    AnyValue, BooleanChunked, DataFrame, IntoColumn, NamedFrom, NewChunkedArray, Series,
};

use fraud_common::{any_to_f64, any_to_string, column_f64_values, column_string_values, has_column};
use fraud_model::Stage;

use crate::error::{Result, TransformError};

/// Fail with a schema error when `name` is not a column of `df`.
pub fn require_column(df: &DataFrame, stage: Stage, name: &str) -> Result<()> {
    if has_column(df, name) {
        Ok(())
    } else {
        Err(TransformError::schema(stage, name))
    }
}

/// Numeric view of a required column.
pub fn f64_values(df: &DataFrame, stage: Stage, name: &str) -> Result<Vec<Option<f64>>> {
    column_f64_values(df, name).ok_or_else(|| TransformError::schema(stage, name))
}

/// Numeric view of a required column that is rewritten in place.
///
/// Null, blank, and `NaN` cells are `None`. Any other cell that does not read
/// as a number fails with [`TransformError::NonNumeric`], since writing the
/// column back as `Float64` would erase it.
pub fn numeric_values(df: &DataFrame, stage: Stage, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| TransformError::schema(stage, name))?;
    let mut values = Vec::with_capacity(df.height());
    let mut unreadable = 0usize;
    let mut sample = None;
    for idx in 0..df.height() {
        let cell = column.get(idx)?;
        let value = any_to_f64(cell.clone());
        if value.is_none() && !is_missing(&cell) {
            unreadable += 1;
            sample.get_or_insert_with(|| any_to_string(cell));
        }
        values.push(value);
    }
    match sample {
        Some(sample) => Err(TransformError::NonNumeric {
            stage,
            column: name.to_string(),
            count: unreadable,
            sample,
        }),
        None => Ok(values),
    }
}

fn is_missing(cell: &AnyValue<'_>) -> bool {
    match cell {
        AnyValue::Null => true,
        AnyValue::Float64(v) => v.is_nan(),
        AnyValue::Float32(v) => v.is_nan(),
        AnyValue::String(s) => is_missing_text(s),
        AnyValue::StringOwned(s) => is_missing_text(s),
        _ => false,
    }
}

fn is_missing_text(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Text view of a required column; blank cells are `None`.
pub fn string_values(df: &DataFrame, stage: Stage, name: &str) -> Result<Vec<Option<String>>> {
    column_string_values(df, name).ok_or_else(|| TransformError::schema(stage, name))
}

pub fn put_f64_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values).into_column())?;
    Ok(())
}

pub fn put_i64_column(df: &mut DataFrame, name: &str, values: Vec<Option<i64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values).into_column())?;
    Ok(())
}

pub fn put_string_column(
    df: &mut DataFrame,
    name: &str,
    values: Vec<Option<String>>,
) -> Result<()> {
    df.with_column(Series::new(name.into(), values).into_column())?;
    Ok(())
}

/// Indicator column of 0/1 values.
pub fn put_indicator_column(df: &mut DataFrame, name: &str, values: Vec<i32>) -> Result<()> {
    df.with_column(Series::new(name.into(), values).into_column())?;
    Ok(())
}

/// Keep rows whose flag is true, preserving order. Returns the number removed.
pub fn retain_rows(df: &mut DataFrame, keep: &[bool]) -> Result<usize> {
    let removed = keep.iter().filter(|flag| !**flag).count();
    if removed == 0 {
        return Ok(0);
    }
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    *df = df.filter(&mask)?;
    Ok(removed)
}
