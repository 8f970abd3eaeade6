//! Error types for the transformation stages.

use polars::prelude::PolarsError;
use thiserror::Error;

use fraud_model::{ConfigError, Stage};

/// A scalar that could not be read as an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected 4 octets, found {found} in '{input}'")]
    OctetCount { input: String, found: usize },
    #[error("octet '{octet}' is out of range in '{input}'")]
    OctetRange { input: String, octet: String },
    #[error("non-numeric token '{token}' in '{input}'")]
    NonNumeric { input: String, token: String },
    #[error("address value '{input}' is outside the 32-bit range")]
    OutOfRange { input: String },
}

impl ParseError {
    /// The raw text that failed to parse.
    pub fn input(&self) -> &str {
        match self {
            Self::OctetCount { input, .. }
            | Self::OctetRange { input, .. }
            | Self::NonNumeric { input, .. }
            | Self::OutOfRange { input } => input,
        }
    }
}

/// An interval set that cannot be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("interval {position} ('{payload}') has lower bound {lower} above upper bound {upper}")]
pub struct ConstructionError {
    /// Position of the interval in the input sequence.
    pub position: usize,
    pub lower: u32,
    pub upper: u32,
    pub payload: String,
}

/// Errors raised by a transformation stage.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// A column the stage needs is not in the table.
    #[error("{stage} stage requires column '{column}'")]
    Schema { stage: Stage, column: String },

    /// A numeric stage met non-null cells that do not read as numbers.
    #[error(
        "{stage} stage requires a numeric column '{column}': {count} cell(s) are not numbers, e.g. '{sample}'"
    )]
    NonNumeric {
        stage: Stage,
        column: String,
        count: usize,
        sample: String,
    },

    /// The stage configuration cannot be honoured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The geolocation stage was configured but no reference ranges were supplied.
    #[error("geolocation stage requires a reference interval table")]
    MissingReference,

    #[error("DataFrame operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl TransformError {
    pub fn schema(stage: Stage, column: impl Into<String>) -> Self {
        Self::Schema {
            stage,
            column: column.into(),
        }
    }
}

/// Result type for transformation operations.
pub type Result<T> = std::result::Result<T, TransformError>;
