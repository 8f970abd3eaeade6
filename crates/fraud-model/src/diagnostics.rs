//! Structured diagnostic events.
//!
//! Every stage reports what it did to the table (rows dropped, values capped,
//! columns skipped) as [`Diagnostic`] values. The transform crate mirrors each
//! event to `tracing`; callers receive the full list in the run output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Geolocation,
    Outliers,
    Features,
    Normalize,
    Encode,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Geolocation,
        Stage::Outliers,
        Stage::Features,
        Stage::Normalize,
        Stage::Encode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Geolocation => "geolocation",
            Self::Outliers => "outliers",
            Self::Features => "features",
            Self::Normalize => "normalize",
            Self::Encode => "encode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Rows removed from the table.
    RowsDropped,
    /// Rows kept but tagged with a null result.
    RowsTagged,
    /// Values clamped to outlier bounds.
    ValuesCapped,
    /// Values rewritten by a transform (log, scaling).
    ValuesTransformed,
    /// Derived or indicator columns added to the table.
    ColumnsAdded,
    /// A column deliberately left untouched.
    ColumnSkipped,
    /// Statistics were undefined; the operation fell back to a no-op.
    DegenerateStatistics,
    /// A failing stage was skipped under continue-on-error.
    StageSkipped,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RowsDropped => "rows_dropped",
            Self::RowsTagged => "rows_tagged",
            Self::ValuesCapped => "values_capped",
            Self::ValuesTransformed => "values_transformed",
            Self::ColumnsAdded => "columns_added",
            Self::ColumnSkipped => "column_skipped",
            Self::DegenerateStatistics => "degenerate_statistics",
            Self::StageSkipped => "stage_skipped",
        }
    }

    /// Whether the event signals something a user should look at.
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            Self::ColumnSkipped | Self::DegenerateStatistics | Self::StageSkipped
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured event: stage, kind, optional column, count, and reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub count: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: Stage, kind: DiagnosticKind, count: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            column: None,
            count,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "[{}] {} {} ({}): {}",
                self.stage, self.kind, column, self.count, self.message
            ),
            None => write!(
                f,
                "[{}] {} ({}): {}",
                self.stage, self.kind, self.count, self.message
            ),
        }
    }
}
