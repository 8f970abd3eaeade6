//! Data model for the fraud data preparation pipeline.
//!
//! - **interval**: address ranges tagged with a geolocation payload
//! - **diagnostics**: structured per-stage events emitted by the pipeline
//! - **options**: pipeline configuration, loadable from TOML
//! - **processing**: run and join reports

pub mod diagnostics;
pub mod error;
pub mod interval;
pub mod options;
pub mod processing;

pub use diagnostics::{Diagnostic, DiagnosticKind, Stage};
pub use error::{ConfigError, Result};
pub use interval::Interval;
pub use options::{
    EncodeConfig, FeatureConfig, GeolocationConfig, KeyFormat, NormalizeConfig, OutlierMethod,
    OutlierRule, PipelineConfig, QuantileMethod, ReferenceColumns, UnmatchedMode,
};
pub use processing::{JoinReport, RunReport, StageOutcome, StageStatus};
