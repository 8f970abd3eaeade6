//! Diagnostic collection.
//!
//! Stages push [`Diagnostic`] events here. Each event is mirrored to
//! `tracing` as it arrives, so whatever subscriber the process installed is
//! the sink; the collected list is also handed back to the caller.

use tracing::{info, warn};

use fraud_model::{Diagnostic, DiagnosticKind, Stage};

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Diagnostic) {
        let column = event.column.as_deref().unwrap_or("");
        if event.kind.is_warning() {
            warn!(
                stage = %event.stage,
                kind = %event.kind,
                column,
                count = event.count,
                "{}",
                event.message
            );
        } else {
            info!(
                stage = %event.stage,
                kind = %event.kind,
                column,
                count = event.count,
                "{}",
                event.message
            );
        }
        self.events.push(event);
    }

    /// Record an event about a single column.
    pub fn column(
        &mut self,
        stage: Stage,
        kind: DiagnosticKind,
        column: &str,
        count: usize,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(stage, kind, count, message).with_column(column));
    }

    /// Record an event about the table as a whole.
    pub fn table(
        &mut self,
        stage: Stage,
        kind: DiagnosticKind,
        count: usize,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(stage, kind, count, message));
    }

    /// Move events collected elsewhere into this list without logging them again.
    pub fn append(&mut self, other: Diagnostics) {
        self.events.extend(other.events);
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Diagnostic> {
        self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events of one kind, in emission order.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter(move |event| event.kind == kind)
    }

    /// Events for one stage, in emission order.
    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter(move |event| event.stage == stage)
    }
}
