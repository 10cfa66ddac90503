//! The single consumer of the shared record queue.

use crate::{
    classification::Classifier,
    core::{ConsoleSink, LogRecord, Severity},
    formatting::Formatter,
    internal_metrics::Metrics,
    notification::{dispatcher::report_outcome, NotificationHandle},
};
use async_channel::Receiver;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

/// Drains the queue in FIFO order: classify, format, write, notify.
pub struct Aggregator {
    rx: Receiver<LogRecord>,
    classifier: Arc<Classifier>,
    formatter: Arc<Formatter>,
    console: Arc<dyn ConsoleSink>,
    notifications: NotificationHandle,
    metrics: Arc<Metrics>,
}

impl Aggregator {
    pub fn new(
        rx: Receiver<LogRecord>,
        classifier: Arc<Classifier>,
        formatter: Arc<Formatter>,
        console: Arc<dyn ConsoleSink>,
        notifications: NotificationHandle,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            rx,
            classifier,
            formatter,
            console,
            notifications,
            metrics,
        }
    }

    /// Runs until shutdown or until every producer is gone. On shutdown the
    /// records already queued are still written.
    #[instrument(skip_all)]
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(console = self.console.name(), "Aggregator started.");
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    let drained = self.drain().await;
                    info!(drained, "Aggregator received shutdown signal.");
                    break;
                }
                res = self.rx.recv() => match res {
                    Ok(record) => {
                        self.process(record).await;
                    }
                    Err(_) => {
                        info!("All source readers have finished.");
                        break;
                    }
                }
            }
        }
        info!("Aggregator finished.");
    }

    /// Handles one record and returns its severity.
    pub async fn process(&self, record: LogRecord) -> Severity {
        let severity = self.classifier.classify(&record.source, &record.text);
        let line = self.formatter.format(&record.source, severity, &record.text);

        if let Err(e) = self.console.write_line(&line).await {
            self.metrics.console_write_errors_total.increment(1);
            error!(error = %e, "Failed to write to console");
        }
        self.metrics.records_processed_total.increment(1);
        self.metrics.increment_severity(severity);

        if severity == Severity::Error {
            debug!(source = %record.source, sequence = record.sequence, "Error line, notifying");
            let source = record.source.clone();
            if let Some(outcome) = self.notifications.submit(record) {
                report_outcome(&self.metrics, &source, &outcome);
            }
        }
        severity
    }

    async fn drain(&self) -> usize {
        let mut drained = 0;
        while let Ok(record) = self.rx.try_recv() {
            self.process(record).await;
            drained += 1;
        }
        drained
    }
}
