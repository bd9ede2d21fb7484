// # Channel Reporter
//
// Forwards reports into a bounded channel so an embedding application can
// consume them as a stream.
//
// When the channel is full the report is dropped with a warning rather than
// blocking the reconciliation task.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::traits::reporter::{RecordReport, Reporter};

/// Reporter backed by a bounded mpsc channel
///
/// # Example
///
/// ```rust,no_run
/// use dnsync_core::report::ChannelReporter;
/// use tokio_stream::StreamExt;
///
/// # async fn example() {
/// let (reporter, mut reports) = ChannelReporter::new(64);
/// // hand `reporter` to the Reconciler, then:
/// while let Some(report) = reports.next().await {
///     println!("{}: {:?}", report.name, report.outcome);
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::Sender<RecordReport>,
}

impl ChannelReporter {
    /// Create a reporter and the stream its reports arrive on
    pub fn new(capacity: usize) -> (Self, ReceiverStream<RecordReport>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, ReceiverStream::new(rx))
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, report: &RecordReport) {
        match self.tx.try_send(report.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    "Report channel full, dropping report for {}. Consider increasing the channel capacity.",
                    dropped.name
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Nobody is listening anymore
            }
        }
    }
}
