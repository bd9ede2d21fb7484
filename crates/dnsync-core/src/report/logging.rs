// # Tracing Reporter
//
// Writes each record report as a log line. This is the sink the daemon uses.

use tracing::{error, info};

use crate::traits::reporter::{ReconcileOutcome, RecordReport, Reporter};

/// Reporter that logs reports through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl TracingReporter {
    /// Create a new tracing reporter
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TracingReporter {
    fn report(&self, report: &RecordReport) {
        let record_type = report
            .record_type
            .map(|t| t.as_str())
            .unwrap_or("?");

        match &report.outcome {
            ReconcileOutcome::Unchanged => info!(
                "{} record for {} already exists and is correct",
                record_type, report.name
            ),
            ReconcileOutcome::Created => {
                info!("Created {} record for {}", record_type, report.name)
            }
            ReconcileOutcome::Replaced => info!(
                "Replaced conflicting record with {} record for {}",
                record_type, report.name
            ),
            ReconcileOutcome::Failed { reason } => error!(
                "Error syncing {} record #{} ({}): {}",
                record_type, report.position, report.name, reason
            ),
        }
    }
}
