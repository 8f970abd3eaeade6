//! Configuration options for the preparation pipeline.
//!
//! A [`PipelineConfig`] lists which stages run and how. Omitted sections are
//! disabled; [`PipelineConfig::fraud_defaults`] reproduces the standard
//! e-commerce fraud workflow and is what the CLI uses without a config file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// How an address cell becomes a 32-bit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyFormat {
    /// Text in `a.b.c.d` form only.
    DottedQuad,
    /// The integer encoding of the address, as a number or digit string.
    /// Fractional parts are truncated.
    Integer,
    /// Integer for numeric cells and digit strings, dotted quad otherwise.
    #[default]
    Auto,
}

/// What the range join does with rows it cannot geolocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmatchedMode {
    /// Remove rows with an absent, malformed, or unmatched address.
    #[default]
    Drop,
    /// Keep those rows with a null payload.
    Preserve,
}

/// Column names of the reference interval table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceColumns {
    pub lower: String,
    pub upper: String,
    pub payload: String,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            lower: "lower_bound_ip_address".to_string(),
            upper: "upper_bound_ip_address".to_string(),
            payload: "country".to_string(),
        }
    }
}

/// Options for the IP-range geolocation join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeolocationConfig {
    /// Address column of the transaction table.
    pub key_column: String,
    pub key_format: KeyFormat,
    /// Name of the column that receives the payload.
    pub payload_column: String,
    pub unmatched: UnmatchedMode,
    /// When set, the parsed integer key is attached under this name.
    pub key_output_column: Option<String>,
    pub reference: ReferenceColumns,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            key_column: "ip_address".to_string(),
            key_format: KeyFormat::default(),
            payload_column: "country".to_string(),
            unmatched: UnmatchedMode::default(),
            key_output_column: None,
            reference: ReferenceColumns::default(),
        }
    }
}

/// Outlier treatment selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlierMethod {
    /// Clamp to `[Q1 - t·IQR, Q3 + t·IQR]`.
    IqrCap,
    /// Drop rows outside the IQR bounds.
    IqrRemove,
    /// Clamp to `[mean - t·stdev, mean + t·stdev]`.
    ZscoreCap,
    /// Drop rows whose absolute z-score exceeds `t`.
    ZscoreRemove,
    /// `log1p` of positive values; non-positive values pass through unchanged.
    Log,
}

impl OutlierMethod {
    pub fn default_threshold(self) -> f64 {
        match self {
            Self::IqrCap | Self::IqrRemove => 1.5,
            Self::ZscoreCap | Self::ZscoreRemove => 3.0,
            Self::Log => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IqrCap => "iqr-cap",
            Self::IqrRemove => "iqr-remove",
            Self::ZscoreCap => "zscore-cap",
            Self::ZscoreRemove => "zscore-remove",
            Self::Log => "log",
        }
    }

    /// Whether the method changes the row count.
    pub fn removes_rows(self) -> bool {
        matches!(self, Self::IqrRemove | Self::ZscoreRemove)
    }
}

/// Quartile estimator used by the IQR methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuantileMethod {
    /// Q1 at rank `ceil(0.25·(n-1))`, Q3 at rank `floor(0.75·(n-1))`.
    ///
    /// Both quartiles are observed values inside the interquartile band, so
    /// capping never moves them and `iqr-cap` is idempotent.
    #[default]
    Inward,
    /// Linear interpolation between neighbouring order statistics.
    Linear,
}

/// One outlier rule; rules run in the order they are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutlierRule {
    pub column: String,
    pub method: OutlierMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub quantile: QuantileMethod,
}

impl OutlierRule {
    pub fn new(column: impl Into<String>, method: OutlierMethod) -> Self {
        Self {
            column: column.into(),
            method,
            threshold: None,
            quantile: QuantileMethod::default(),
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_quantile(mut self, quantile: QuantileMethod) -> Self {
        self.quantile = quantile;
        self
    }

    pub fn effective_threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.method.default_threshold())
    }
}

/// Behavioral and temporal feature derivation.
///
/// Each derivation runs only when its source columns are configured.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureConfig {
    /// Identity column for per-group counts and velocity.
    pub group_column: Option<String>,
    /// Transaction timestamp column.
    pub time_column: Option<String>,
    /// Account creation timestamp, paired with `time_column`.
    pub signup_column: Option<String>,
    /// Raw seconds offset column for `hour_of_day`.
    pub seconds_column: Option<String>,
    /// Derive `hour_of_day` and `day_of_week` from `time_column`.
    pub calendar_parts: bool,
}

impl FeatureConfig {
    /// Reject derivations that would be silently dropped or overwrite each other.
    pub fn validate(&self) -> Result<()> {
        if self.seconds_column.is_some() && self.calendar_parts {
            return Err(ConfigError::Invalid(
                "features.seconds_column and features.calendar_parts both derive hour_of_day"
                    .to_string(),
            ));
        }
        if self.calendar_parts && self.time_column.is_none() {
            return Err(ConfigError::Invalid(
                "features.calendar_parts requires features.time_column".to_string(),
            ));
        }
        if self.signup_column.is_some() && self.time_column.is_none() {
            return Err(ConfigError::Invalid(
                "features.signup_column requires features.time_column".to_string(),
            ));
        }
        Ok(())
    }
}

/// Min-max normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    pub columns: Vec<String>,
}

/// One-hot encoding with a cardinality gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeConfig {
    /// Columns to encode; every string column when omitted.
    pub columns: Option<Vec<String>>,
    pub cardinality_threshold: usize,
    pub drop_first: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            columns: None,
            cardinality_threshold: 10,
            drop_first: true,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Skip a failing stage and keep going instead of halting the run.
    pub continue_on_error: bool,
    pub geolocation: Option<GeolocationConfig>,
    pub outliers: Vec<OutlierRule>,
    pub features: Option<FeatureConfig>,
    pub normalize: Option<NormalizeConfig>,
    pub encode: Option<EncodeConfig>,
}

impl PipelineConfig {
    /// The standard workflow for the e-commerce fraud dataset.
    pub fn fraud_defaults() -> Self {
        Self {
            continue_on_error: false,
            geolocation: Some(GeolocationConfig::default()),
            outliers: vec![OutlierRule::new("purchase_value", OutlierMethod::IqrCap)],
            features: Some(FeatureConfig {
                group_column: Some("user_id".to_string()),
                time_column: Some("purchase_time".to_string()),
                signup_column: Some("signup_time".to_string()),
                seconds_column: None,
                calendar_parts: true,
            }),
            normalize: Some(NormalizeConfig {
                columns: vec!["purchase_value".to_string(), "age".to_string()],
            }),
            encode: Some(EncodeConfig::default()),
        }
    }

    /// Parse a TOML document and validate it.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Reject combinations no stage can honour.
    pub fn validate(&self) -> Result<()> {
        if let Some(geo) = &self.geolocation
            && geo.key_column.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "geolocation.key_column must not be empty".to_string(),
            ));
        }
        for rule in &self.outliers {
            let threshold = rule.effective_threshold();
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "outlier threshold for {} must be a non-negative number",
                    rule.column
                )));
            }
        }
        if let Some(features) = &self.features {
            features.validate()?;
        }
        Ok(())
    }
}
