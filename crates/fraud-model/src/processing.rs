use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, Stage};

/// Counts produced by one geolocation join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReport {
    pub input_rows: usize,
    pub matched: usize,
    /// Rows with a valid key that no interval contains.
    pub unmatched: usize,
    /// Rows whose address cell was null or blank.
    pub absent_key: usize,
    /// Rows whose address cell could not be parsed.
    pub invalid_key: usize,
    pub output_rows: usize,
    /// A few malformed inputs, for the log.
    pub invalid_samples: Vec<String>,
}

impl JoinReport {
    /// Rows that did not receive a payload, whatever the reason.
    pub fn without_payload(&self) -> usize {
        self.unmatched + self.absent_key + self.invalid_key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    /// Failed and skipped under continue-on-error.
    Skipped,
}

/// How one stage went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_out: usize,
    pub duration_ms: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a complete run, written by the CLI as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub input_rows: usize,
    pub output_rows: usize,
    pub output_columns: usize,
    pub stages: Vec<StageOutcome>,
    pub join: Option<JoinReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn skipped_stages(&self) -> impl Iterator<Item = &StageOutcome> {
        self.stages
            .iter()
            .filter(|outcome| outcome.status == StageStatus::Skipped)
    }

    pub fn has_skipped_stages(&self) -> bool {
        self.skipped_stages().next().is_some()
    }
}
