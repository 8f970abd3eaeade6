//! Transformation core of the fraud data preparation pipeline.
//!
//! - **geo**: address parsing, the interval index, and the range join
//! - **outliers**: IQR / z-score capping and removal, log transform
//! - **features**: per-user velocity features and temporal parts
//! - **encode**: min-max normalization and cardinality-gated one-hot encoding
//! - **pipeline**: runs the stages in order over one table

pub mod diagnostics;
pub mod encode;
pub mod error;
pub mod features;
pub mod frame;
pub mod geo;
pub mod outliers;
pub mod pipeline;

pub use diagnostics::Diagnostics;
pub use encode::{ColumnEncoder, EncodeSummary, Normalizer, ScalerBounds};
pub use error::{ConstructionError, ParseError, Result, TransformError};
pub use features::{FeatureDeriver, parse_calendar_timestamp, parse_timestamp};
pub use geo::{
    AddressKey, IntervalIndex, RangeJoinEngine, address_key, extract_key, ip_to_key, key_to_ip,
};
pub use outliers::{OutlierPolicy, OutlierScan, quantile};
pub use pipeline::{Pipeline, PipelineOutput};
