//! Per-source log tailing.
//!
//! A `SourceReader` moves through `Attaching → Streaming` and ends in one of
//! the terminal states of `ReaderExit`. Failures never leave the
//! reader; they become its exit value.

use crate::config::{QueueConfig, QueueMode};
use crate::core::{LogRecord, LogSourceProvider, ReaderExit};
use crate::internal_metrics::Metrics;
use async_channel::{Receiver, Sender};
use chrono::Utc;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// The live states of a reader. Terminal states are reported as `ReaderExit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Attaching,
    Streaming,
}

/// The producer side of the shared record queue.
///
/// Cloned into every reader. Sequence numbers are taken from one counter so
/// that records carry a process-wide arrival order.
#[derive(Debug, Clone)]
pub struct RecordQueue {
    tx: Sender<LogRecord>,
    sequence: Arc<AtomicU64>,
}

impl RecordQueue {
    /// Creates the queue according to the configured backpressure policy.
    pub fn new(config: &QueueConfig) -> (Self, Receiver<LogRecord>) {
        let (tx, rx) = match config.mode {
            QueueMode::Bounded => async_channel::bounded(config.capacity.max(1)),
            QueueMode::Unbounded => async_channel::unbounded(),
        };
        (
            Self {
                tx,
                sequence: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Enqueues a line, waiting for room when the queue is bounded and full.
    /// Fails only when the consumer is gone.
    pub async fn push(&self, source: &str, text: String) -> Result<(), async_channel::SendError<LogRecord>> {
        let record = LogRecord {
            source: source.to_string(),
            text,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            received_at: Utc::now(),
        };
        self.tx.send(record).await
    }
}

/// Decodes one raw line, dropping the trailing line terminator.
pub fn decode_line(mut bytes: Vec<u8>) -> Result<String, std::string::FromUtf8Error> {
    while matches!(bytes.last(), Some(b'\n') | Some(b'\r')) {
        bytes.pop();
    }
    String::from_utf8(bytes)
}

/// Tails one source into the shared queue.
pub struct SourceReader {
    name: String,
    provider: Arc<dyn LogSourceProvider>,
    queue: RecordQueue,
    metrics: Arc<Metrics>,
}

impl SourceReader {
    pub fn new(
        name: String,
        provider: Arc<dyn LogSourceProvider>,
        queue: RecordQueue,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            name,
            provider,
            queue,
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the reader to a terminal state and reports it once.
    #[instrument(skip_all, fields(source = %self.name))]
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) -> ReaderExit {
        let exit = self.tail(shutdown_rx).await;
        match &exit {
            ReaderExit::Closed => info!("Log stream for {} ended.", self.name),
            ReaderExit::NotFound => error!("Error: Container '{}' not found", self.name),
            ReaderExit::Errored(reason) => {
                error!(reason = %reason, "Docker Error for {}", self.name)
            }
            ReaderExit::Cancelled => debug!("Reader for {} cancelled.", self.name),
        }
        self.metrics.record_reader_exit(&exit);
        exit
    }

    async fn tail(&self, mut shutdown_rx: watch::Receiver<bool>) -> ReaderExit {
        if *shutdown_rx.borrow() {
            return ReaderExit::Cancelled;
        }

        let mut state = ReaderState::Attaching;
        debug!(?state, "Attaching to source");

        let exists = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => return ReaderExit::Cancelled,
            res = self.provider.exists(&self.name) => res,
        };
        match exists {
            Ok(true) => {}
            Ok(false) => return ReaderExit::NotFound,
            Err(e) => return ReaderExit::Errored(e.to_string()),
        }

        let stream = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => return ReaderExit::Cancelled,
            res = self.provider.stream_lines(&self.name) => res,
        };
        // Dropping the stream detaches from the source.
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => return ReaderExit::Errored(e.to_string()),
        };

        state = ReaderState::Streaming;
        debug!(?state, "Attached to source");
        info!("Starting log monitor for {}...", self.name);

        let mut decode_errors: u64 = 0;
        loop {
            let item = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => return ReaderExit::Cancelled,
                item = stream.next() => item,
            };

            let bytes = match item {
                None => return ReaderExit::Closed,
                Some(Err(e)) => return ReaderExit::Errored(e.to_string()),
                Some(Ok(bytes)) => bytes,
            };

            let text = match decode_line(bytes) {
                Ok(text) => text,
                Err(e) => {
                    decode_errors += 1;
                    self.metrics.increment_decode_errors(&self.name);
                    if decode_errors == 1 {
                        warn!(error = %e, "Skipping line that is not valid UTF-8");
                    } else {
                        debug!(error = %e, decode_errors, "Skipping line that is not valid UTF-8");
                    }
                    continue;
                }
            };

            let pushed = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => return ReaderExit::Cancelled,
                res = self.queue.push(&self.name, text) => res,
            };
            if pushed.is_err() {
                // The aggregator is gone, which only happens during shutdown.
                return ReaderExit::Cancelled;
            }
            self.metrics.increment_enqueued(&self.name);
        }
    }
}

/// Runs readers one after another, stopping early on cancellation.
pub async fn run_sequentially(
    readers: Vec<SourceReader>,
    shutdown_rx: watch::Receiver<bool>,
) -> Vec<(String, ReaderExit)> {
    let mut exits = Vec::with_capacity(readers.len());
    for reader in readers {
        let name = reader.name().to_string();
        let exit = reader.run(shutdown_rx.clone()).await;
        let cancelled = exit == ReaderExit::Cancelled;
        exits.push((name, exit));
        if cancelled {
            break;
        }
    }
    exits
}
