//! IP-range reference table loading.
//!
//! The published range table stores bounds as floating-point text
//! (`16777216.0`), so bounds are accepted as integers or as floats with a
//! zero fractional part. Bound order is not checked here; the interval index
//! rejects inverted ranges when it is built.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use fraud_model::{Interval, ReferenceColumns};

use crate::error::{IngestError, Result};

/// Parses one address bound cell.
///
/// Returns `None` for blank, negative, fractional, non-finite, or
/// out-of-range values.
pub fn parse_bound(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<u64>() {
        return u32::try_from(value).ok();
    }
    let value = trimmed.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

fn find_column(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|header| {
            header
                .trim()
                .trim_matches('\u{feff}')
                .eq_ignore_ascii_case(name.trim())
        })
        .ok_or_else(|| IngestError::MissingColumn {
            column: name.to_string(),
            path: path.to_path_buf(),
        })
}

/// Loads the reference table as intervals, in file order.
pub fn read_reference_intervals(path: &Path, columns: &ReferenceColumns) -> Result<Vec<Interval>> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let headers = reader
        .headers()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .clone();
    let lower_idx = find_column(&headers, &columns.lower, path)?;
    let upper_idx = find_column(&headers, &columns.upper, path)?;
    let payload_idx = find_column(&headers, &columns.payload, path)?;

    let mut intervals = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let line = record.position().map_or(0, csv::Position::line);
        let bound = |idx: usize, field: &str| -> Result<u32> {
            let raw = record.get(idx).unwrap_or("");
            parse_bound(raw).ok_or_else(|| IngestError::InvalidValue {
                field: field.to_string(),
                value: raw.to_string(),
                line,
                path: path.to_path_buf(),
            })
        };
        let lower = bound(lower_idx, &columns.lower)?;
        let upper = bound(upper_idx, &columns.upper)?;
        let payload = record.get(payload_idx).unwrap_or("").trim().to_string();
        intervals.push(Interval::new(lower, upper, payload));
    }

    if intervals.is_empty() {
        debug!(path = %path.display(), "reference table has no ranges");
    }
    info!(
        path = %path.display(),
        ranges = intervals.len(),
        "loaded reference ranges"
    );
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bound_integer_forms() {
        assert_eq!(parse_bound("0"), Some(0));
        assert_eq!(parse_bound(" 16777216 "), Some(16_777_216));
        assert_eq!(parse_bound("16777216.0"), Some(16_777_216));
        assert_eq!(parse_bound("4294967295"), Some(u32::MAX));
    }

    #[test]
    fn test_parse_bound_rejects_invalid() {
        assert_eq!(parse_bound(""), None);
        assert_eq!(parse_bound("-1"), None);
        assert_eq!(parse_bound("1.5"), None);
        assert_eq!(parse_bound("4294967296"), None);
        assert_eq!(parse_bound("inf"), None);
        assert_eq!(parse_bound("abc"), None);
    }
}
