//! The notification dispatcher is a single-consumer actor that delivers error
//! records through the `NotificationSink`, off the console path.

use crate::core::{LogRecord, NotificationOutcome};
use crate::internal_metrics::Metrics;
use crate::notification::sink::NotificationSink;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Logs the outcome of a notification attempt and counts it.
pub fn report_outcome(metrics: &Metrics, source: &str, outcome: &NotificationOutcome) {
    metrics.record_notification(outcome);
    match outcome {
        NotificationOutcome::Delivered => debug!(source, "Slack notification delivered"),
        NotificationOutcome::Skipped => debug!(source, "Slack notification skipped"),
        NotificationOutcome::Failed(reason) => {
            error!(source, reason = %reason, "Error sending Slack notification")
        }
    }
}

/// The aggregator's side of the notification queue.
#[derive(Debug, Clone)]
pub struct NotificationHandle {
    tx: Option<mpsc::Sender<LogRecord>>,
}

impl NotificationHandle {
    /// A handle that reports every submission as `Skipped`.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queues a record for delivery without waiting.
    ///
    /// Returns `None` once the record is queued; the dispatcher reports the
    /// final outcome. Returns `Some(outcome)` when the record was not queued.
    pub fn submit(&self, record: LogRecord) -> Option<NotificationOutcome> {
        let Some(tx) = &self.tx else {
            return Some(NotificationOutcome::Skipped);
        };
        match tx.try_send(record) {
            Ok(()) => None,
            Err(TrySendError::Full(_)) => Some(NotificationOutcome::Failed(
                "notification queue full".to_string(),
            )),
            Err(TrySendError::Closed(_)) => Some(NotificationOutcome::Failed(
                "notification dispatcher stopped".to_string(),
            )),
        }
    }
}

/// The `NotificationDispatcher` actor.
pub struct NotificationDispatcher {
    sink: NotificationSink,
    rx: mpsc::Receiver<LogRecord>,
    metrics: Arc<Metrics>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher and the handle that feeds it.
    pub fn new(
        sink: NotificationSink,
        capacity: usize,
        metrics: Arc<Metrics>,
    ) -> (Self, NotificationHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self { sink, rx, metrics },
            NotificationHandle { tx: Some(tx) },
        )
    }

    /// Delivers queued records one at a time until every handle is dropped.
    ///
    /// On shutdown the attempt in flight is abandoned and every record still
    /// queued is reported as `Failed("shutdown")`.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Notification dispatcher started.");
        loop {
            let record = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                record = self.rx.recv() => match record {
                    Some(record) => record,
                    None => {
                        info!("Notification queue closed. Notification dispatcher finished.");
                        return;
                    }
                },
            };

            let outcome = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    report_outcome(&self.metrics, &record.source, &shutdown_outcome());
                    break;
                }
                outcome = self.sink.notify(&record.source, &record.text) => outcome,
            };
            if let NotificationOutcome::Failed(_) = &outcome {
                warn!(sequence = record.sequence, "Notification for record failed");
            }
            report_outcome(&self.metrics, &record.source, &outcome);
        }

        // Later submissions fail fast with "notification dispatcher stopped".
        self.rx.close();
        let mut abandoned = 0;
        while let Ok(record) = self.rx.try_recv() {
            report_outcome(&self.metrics, &record.source, &shutdown_outcome());
            abandoned += 1;
        }
        info!(abandoned, "Notification dispatcher received shutdown signal.");
    }
}

fn shutdown_outcome() -> NotificationOutcome {
    NotificationOutcome::Failed("shutdown".to_string())
}
