// # Reporter Trait
//
// Receives one structured report per desired record once its reconciliation
// has finished. Where the reports go (log, channel, file) is up to the
// implementation; the engine only emits values.

use serde::Serialize;

use crate::config::RecordType;

/// Per-record result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Record already matched; nothing was changed
    Unchanged,
    /// Record did not exist and was created
    Created,
    /// A conflicting record was deleted and the desired one created
    Replaced,
    /// Reconciliation failed for this record only
    Failed {
        /// Error detail
        reason: String,
    },
}

impl ReconcileOutcome {
    /// Build a failed outcome from any displayable error
    pub fn failed(reason: impl ToString) -> Self {
        Self::Failed {
            reason: reason.to_string(),
        }
    }

    /// Whether this outcome is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Structured report for a single desired record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    /// Position of the entry in the desired-record list
    pub position: usize,
    /// Fully-qualified name, or the raw name for entries that never got that far
    pub name: String,
    /// Record type, when known
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,
    /// What happened
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
    /// When reconciliation of this record ended
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl RecordReport {
    /// Create a report stamped with the current time
    pub fn new(
        position: usize,
        name: impl Into<String>,
        record_type: Option<RecordType>,
        outcome: ReconcileOutcome,
    ) -> Self {
        Self {
            position,
            name: name.into(),
            record_type,
            outcome,
            finished_at: chrono::Utc::now(),
        }
    }
}

/// Sink for per-record reports
///
/// Called from whichever task finished the record, so implementations must be
/// thread-safe. Reporting must not block on I/O for long; the engine calls it
/// inline.
pub trait Reporter: Send + Sync {
    /// Receive the report of one finished record
    fn report(&self, report: &RecordReport);
}
