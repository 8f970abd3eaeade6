//! Shared utilities for the fraud data preparation crates.
//!
//! This crate provides common Polars helpers used across the workspace:
//! `AnyValue` conversions and whole-column extraction for row-wise passes.

pub mod frame;

// Re-export commonly used functions at crate root for convenience
pub use frame::{
    any_to_f64, any_to_string, any_to_string_non_empty, column_f64_values, column_string_values,
    column_names, format_numeric, has_column, parse_f64,
};
