//! Data ingestion for the fraud preparation pipeline.
//!
//! This crate is the file layer around the transformation core:
//!
//! - **Table I/O**: read a transaction CSV into a Polars `DataFrame`, write one back
//! - **Reference ranges**: load the IP-range-to-country table as [`Interval`]s
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use fraud_ingest::{read_csv_table, read_reference_intervals};
//! use fraud_model::ReferenceColumns;
//!
//! let df = read_csv_table(Path::new("data/raw/Fraud_Data.csv"))?;
//! let intervals = read_reference_intervals(
//!     Path::new("data/raw/IpAddress_to_Country.csv"),
//!     &ReferenceColumns::default(),
//! )?;
//! ```
//!
//! [`Interval`]: fraud_model::Interval

mod error;
mod reference;
mod table;

// === Error Types ===
pub use error::{IngestError, Result};

// === Table I/O ===
pub use table::{read_csv_table, write_csv_table};

// === Reference Ranges ===
pub use reference::{parse_bound, read_reference_intervals};
