//! # Internal Metrics Module
//!
//! Counters for the pipeline, recorded through the `metrics` facade. Nothing
//! is exported over the network; when `metrics.log_metrics` is enabled a
//! `LoggingRecorder` prints periodic snapshots to the diagnostic log.

pub mod logging_recorder;

use crate::core::{NotificationOutcome, ReaderExit, Severity};
use metrics::{Counter, Unit};

/// Cloneable handles to the pipeline counters.
#[derive(Clone)]
pub struct Metrics {
    pub records_processed_total: Counter,
    pub console_write_errors_total: Counter,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Registers descriptions with the installed recorder and returns the handles.
    pub fn new() -> Self {
        metrics::describe_counter!("records_enqueued_total", Unit::Count, "Log lines enqueued by source readers, labeled by source.");
        metrics::describe_counter!("records_processed_total", Unit::Count, "Log lines formatted and written by the aggregator.");
        metrics::describe_counter!("records_by_severity_total", Unit::Count, "Processed log lines, labeled by severity.");
        metrics::describe_counter!("decode_errors_total", Unit::Count, "Lines skipped because they were not valid UTF-8, labeled by source.");
        metrics::describe_counter!("notifications_total", Unit::Count, "Notification attempts, labeled by outcome.");
        metrics::describe_counter!("console_write_errors_total", Unit::Count, "Failed writes to the console sink.");
        metrics::describe_counter!("reader_exits_total", Unit::Count, "Source readers that reached a terminal state, labeled by exit.");

        Self {
            records_processed_total: metrics::counter!("records_processed_total"),
            console_write_errors_total: metrics::counter!("console_write_errors_total"),
        }
    }

    pub fn increment_enqueued(&self, source: &str) {
        metrics::counter!("records_enqueued_total", "source" => source.to_string()).increment(1);
    }

    pub fn increment_decode_errors(&self, source: &str) {
        metrics::counter!("decode_errors_total", "source" => source.to_string()).increment(1);
    }

    pub fn increment_severity(&self, severity: Severity) {
        metrics::counter!("records_by_severity_total", "severity" => severity.as_str()).increment(1);
    }

    pub fn record_notification(&self, outcome: &NotificationOutcome) {
        metrics::counter!("notifications_total", "outcome" => outcome.label()).increment(1);
    }

    pub fn record_reader_exit(&self, exit: &ReaderExit) {
        metrics::counter!("reader_exits_total", "exit" => exit.label()).increment(1);
    }
}
