//! Integration tests for the fraudprep commands.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use fraud_cli::commands::{
    default_output_path, load_config, lookup_addresses, reference_columns, run_pipeline,
    scan_outliers,
};
use fraud_cli::types::RunOptions;
use fraud_model::{OutlierMethod, ReferenceColumns, RunReport, StageStatus};

const TRANSACTIONS: &str = "\
user_id,signup_time,purchase_time,purchase_value,device_id,source,browser,sex,age,ip_address,class
22058,2015-02-24 22:55:49,2015-04-18 02:47:11,34,QVPSPJUOCKZAR,SEO,Chrome,M,39,16777300.5,0
333320,2015-06-07 20:39:50,2015-06-08 01:38:54,16,EOGFQPIZPYXFZ,Ads,Chrome,F,53,16777500,0
1359,2015-01-01 18:52:44,2015-01-01 18:52:45,15,YSSKYOSJHPPLJ,SEO,Opera,M,53,3232235521,1
150084,2015-04-28 21:13:25,2015-05-04 13:54:50,44,ATGTXKYKUDUQN,SEO,Safari,M,41,5,0
221365,2015-07-21 07:09:52,2015-09-09 18:40:53,39,NAUITBZFJKHWW,Ads,Safari,M,45,16777400,0
";

const RANGES: &str = "\
lower_bound_ip_address,upper_bound_ip_address,country
16777216.0,16777471,Australia
16777472.0,16777727,China
3232235520.0,3232301055,Private
";

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn run_writes_table_and_report() {
    let dir = TempDir::new().expect("temp dir");
    let input = write(dir.path(), "Fraud_Data.csv", TRANSACTIONS);
    let reference = write(dir.path(), "IpAddress_to_Country.csv", RANGES);
    let report_path = dir.path().join("report.json");

    let result = run_pipeline(&RunOptions {
        input: input.clone(),
        reference: Some(reference),
        report: Some(report_path.clone()),
        ..RunOptions::default()
    })
    .expect("run");

    let output = default_output_path(&input);
    assert_eq!(result.report.output.as_deref(), Some(output.as_path()));
    assert_eq!(result.report.input_rows, 5);
    // 5 has no matching range.
    assert_eq!(result.report.output_rows, 4);
    assert!(result.report.stages.iter().all(|s| s.status == StageStatus::Completed));

    let text = fs::read_to_string(&output).expect("read output");
    let header = text.lines().next().expect("header");
    assert!(header.contains("transaction_velocity"));
    assert!(header.contains("country_Private"));
    // Four distinct devices stay under the default cardinality gate.
    assert!(header.contains("device_id_"));
    assert!(!header.contains("device_id,"));

    let json = fs::read_to_string(&report_path).expect("read report");
    let parsed: RunReport = serde_json::from_str(&json).expect("parse report");
    assert_eq!(parsed.output_rows, 4);
    assert_eq!(parsed.join.expect("join").matched, 4);
}

#[test]
fn dry_run_writes_nothing() {
    let dir = TempDir::new().expect("temp dir");
    let input = write(dir.path(), "Fraud_Data.csv", TRANSACTIONS);
    let reference = write(dir.path(), "ranges.csv", RANGES);
    let result = run_pipeline(&RunOptions {
        input: input.clone(),
        reference: Some(reference),
        dry_run: true,
        ..RunOptions::default()
    })
    .expect("run");
    assert!(result.report.output.is_none());
    assert!(!default_output_path(&input).exists());
}

#[test]
fn missing_reference_skips_geolocation_when_continuing() {
    let dir = TempDir::new().expect("temp dir");
    let input = write(dir.path(), "Fraud_Data.csv", TRANSACTIONS);
    let output = dir.path().join("out.csv");
    let result = run_pipeline(&RunOptions {
        input: input.clone(),
        output: Some(output.clone()),
        continue_on_error: true,
        ..RunOptions::default()
    })
    .expect("run");
    assert!(result.report.has_skipped_stages());
    assert_eq!(result.report.output_rows, 5);
    assert!(output.exists());

    let err = run_pipeline(&RunOptions {
        input,
        output: Some(output),
        ..RunOptions::default()
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("reference"));
}

#[test]
fn config_file_selects_stages() {
    let dir = TempDir::new().expect("temp dir");
    let input = write(dir.path(), "Fraud_Data.csv", TRANSACTIONS);
    let config = write(
        dir.path(),
        "prep.toml",
        r#"
[[outliers]]
column = "purchase_value"
method = "log"

[normalize]
columns = ["age"]
"#,
    );
    let output = dir.path().join("out.csv");
    let result = run_pipeline(&RunOptions {
        input,
        config: Some(config.clone()),
        output: Some(output),
        ..RunOptions::default()
    })
    .expect("run");
    assert_eq!(result.report.stages.len(), 2);
    assert_eq!(result.report.output_columns, 11);
    assert!(load_config(Some(&config)).expect("config").geolocation.is_none());
}

#[test]
fn bad_config_is_reported_with_path() {
    let dir = TempDir::new().expect("temp dir");
    let config = write(dir.path(), "bad.toml", "continue_on_error = \"maybe\"\n");
    let err = load_config(Some(&config)).unwrap_err();
    assert!(format!("{err:#}").contains("bad.toml"));
}

#[test]
fn lookup_resolves_quads_and_integers() {
    let dir = TempDir::new().expect("temp dir");
    let reference = write(dir.path(), "ranges.csv", RANGES);
    let addresses = vec![
        "1.0.0.1".to_string(),
        "16777500".to_string(),
        "999.1.1.1".to_string(),
        "8.8.8.8".to_string(),
    ];
    let rows =
        lookup_addresses(&reference, &ReferenceColumns::default(), &addresses).expect("lookup");
    assert_eq!(rows[0].payload.as_deref(), Some("Australia"));
    assert_eq!(rows[1].payload.as_deref(), Some("China"));
    assert!(rows[2].error.is_some());
    assert_eq!(rows[3].payload, None);
    assert!(rows[3].error.is_none());
}

#[test]
fn outlier_scan_reads_column() {
    let dir = TempDir::new().expect("temp dir");
    let input = write(dir.path(), "Fraud_Data.csv", TRANSACTIONS);
    let scan = scan_outliers(&input, "purchase_value", OutlierMethod::IqrCap, None).expect("scan");
    assert_eq!(scan.non_null, 5);
    assert!(scan.degenerate.is_none());

    let err = scan_outliers(&input, "amount", OutlierMethod::IqrCap, None).unwrap_err();
    assert!(format!("{err:#}").contains("amount"));
}

#[test]
fn lookup_uses_configured_reference_columns() {
    let dir = TempDir::new().expect("temp dir");
    let reference = write(
        dir.path(),
        "ranges.csv",
        "start,end,region\n16777216,16777471,Oceania\n",
    );
    let config = write(
        dir.path(),
        "prep.toml",
        r#"
[geolocation.reference]
lower = "start"
upper = "end"
payload = "region"
"#,
    );
    let columns = reference_columns(&load_config(Some(&config)).expect("config"));
    assert_eq!(columns.payload, "region");
    let rows = lookup_addresses(&reference, &columns, &["1.0.0.1".to_string()]).expect("lookup");
    assert_eq!(rows[0].payload.as_deref(), Some("Oceania"));

    let err = lookup_addresses(&reference, &ReferenceColumns::default(), &["1.0.0.1".to_string()])
        .unwrap_err();
    assert!(format!("{err:#}").contains("ranges.csv"));
}
