//! Tests for fraud-model types.

use std::io::Write;
use std::path::Path;

use fraud_model::{
    ConfigError, Diagnostic, DiagnosticKind, FeatureConfig, Interval, KeyFormat, OutlierMethod,
    PipelineConfig, QuantileMethod, RunReport, Stage, StageOutcome, StageStatus, UnmatchedMode,
};

#[test]
fn interval_contains_both_bounds() {
    let interval = Interval::new(1000, 1999, "B");
    assert!(interval.contains(1000));
    assert!(interval.contains(1999));
    assert!(!interval.contains(999));
    assert!(!interval.contains(2000));
    assert_eq!(interval.width(), 1000);
    assert_eq!(Interval::new(5, 4, "bad").width(), 0);
    assert_eq!(Interval::new(0, u32::MAX, "all").width(), 1u64 << 32);
}

#[test]
fn diagnostic_display_includes_column() {
    let diagnostic = Diagnostic::new(Stage::Outliers, DiagnosticKind::ValuesCapped, 3, "iqr-cap")
        .with_column("purchase_value");
    assert_eq!(
        diagnostic.to_string(),
        "[outliers] values_capped purchase_value (3): iqr-cap"
    );
    assert!(!diagnostic.kind.is_warning());
    assert!(DiagnosticKind::StageSkipped.is_warning());
}

#[test]
fn empty_toml_disables_every_stage() {
    let config = PipelineConfig::from_toml_str("", Path::new("empty.toml")).unwrap();
    assert_eq!(config, PipelineConfig::default());
    assert!(config.geolocation.is_none());
    assert!(config.outliers.is_empty());
}

#[test]
fn toml_config_parses_sections() {
    let text = r#"
continue_on_error = true

[geolocation]
key_column = "ip"
key_format = "dotted-quad"
unmatched = "preserve"
key_output_column = "ip_int"

[geolocation.reference]
lower = "lo"
upper = "hi"
payload = "nation"

[[outliers]]
column = "purchase_value"
method = "iqr-cap"

[[outliers]]
column = "age"
method = "zscore-remove"
threshold = 2.5
quantile = "linear"

[features]
group_column = "user_id"
time_column = "purchase_time"
calendar_parts = true

[encode]
cardinality_threshold = 4
drop_first = false
"#;
    let config = PipelineConfig::from_toml_str(text, Path::new("pipeline.toml")).unwrap();
    assert!(config.continue_on_error);

    let geo = config.geolocation.as_ref().unwrap();
    assert_eq!(geo.key_column, "ip");
    assert_eq!(geo.key_format, KeyFormat::DottedQuad);
    assert_eq!(geo.unmatched, UnmatchedMode::Preserve);
    assert_eq!(geo.payload_column, "country");
    assert_eq!(geo.reference.payload, "nation");

    assert_eq!(config.outliers.len(), 2);
    assert_eq!(config.outliers[0].method, OutlierMethod::IqrCap);
    assert_eq!(config.outliers[0].effective_threshold(), 1.5);
    assert_eq!(config.outliers[1].effective_threshold(), 2.5);
    assert_eq!(config.outliers[1].quantile, QuantileMethod::Linear);

    let encode = config.encode.as_ref().unwrap();
    assert_eq!(encode.cardinality_threshold, 4);
    assert!(!encode.drop_first);
    assert!(encode.columns.is_none());
    assert!(config.normalize.is_none());
}

#[test]
fn unknown_fields_are_rejected() {
    let err = PipelineConfig::from_toml_str("[encode]\nthreshold = 3\n", Path::new("bad.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn conflicting_hour_sources_are_rejected() {
    let text = "[features]\nseconds_column = \"Time\"\ntime_column = \"t\"\ncalendar_parts = true\n";
    let err = PipelineConfig::from_toml_str(text, Path::new("bad.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn signup_without_purchase_time_is_rejected() {
    let text = "[features]\nsignup_column = \"signup_time\"\n";
    let err = PipelineConfig::from_toml_str(text, Path::new("bad.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("signup_column")));

    let features = FeatureConfig {
        signup_column: Some("signup_time".to_string()),
        time_column: Some("purchase_time".to_string()),
        ..FeatureConfig::default()
    };
    features.validate().unwrap();
}

#[test]
fn negative_threshold_is_rejected() {
    let text = "[[outliers]]\ncolumn = \"a\"\nmethod = \"iqr-cap\"\nthreshold = -1.0\n";
    let err = PipelineConfig::from_toml_str(text, Path::new("bad.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn load_reads_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[normalize]\ncolumns = [\"age\"]\n").unwrap();
    let config = PipelineConfig::load(file.path()).unwrap();
    assert_eq!(config.normalize.unwrap().columns, vec!["age".to_string()]);

    let missing = PipelineConfig::load(Path::new("/nonexistent/pipeline.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Read { .. }));
}

#[test]
fn fraud_defaults_validate() {
    let config = PipelineConfig::fraud_defaults();
    config.validate().unwrap();
    assert_eq!(config.outliers[0].column, "purchase_value");
    assert!(config.features.as_ref().unwrap().calendar_parts);
}

#[test]
fn run_report_serializes() {
    let report = RunReport {
        input: "Fraud_Data.csv".into(),
        output: None,
        input_rows: 10,
        output_rows: 8,
        output_columns: 12,
        stages: vec![StageOutcome {
            stage: Stage::Features,
            status: StageStatus::Skipped,
            rows_in: 8,
            rows_out: 8,
            columns_out: 12,
            duration_ms: 1,
            error: Some("missing column".to_string()),
        }],
        join: None,
        diagnostics: vec![],
    };
    assert!(report.has_skipped_stages());
    let json = serde_json::to_string(&report).expect("serialize report");
    assert!(json.contains("\"status\":\"skipped\""));
    let round: RunReport = serde_json::from_str(&json).expect("deserialize report");
    assert_eq!(round.output_rows, 8);
    assert_eq!(round.stages[0].stage, Stage::Features);
}
