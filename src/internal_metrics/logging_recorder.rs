//! A metrics recorder that periodically logs all captured counters.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// A metrics recorder backed by an in-memory registry.
pub struct LoggingRecorder {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

impl LoggingRecorder {
    /// Creates the recorder and the future that logs a snapshot every
    /// `interval` until shutdown. The caller decides where to spawn it.
    pub fn new(
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> (Self, impl Future<Output = ()> + Send + 'static) {
        let registry = Arc::new(Registry::new(AtomicStorage));
        let recorder = Self {
            registry: registry.clone(),
        };

        let task = async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        log_snapshot(&registry);
                        break;
                    }
                    _ = ticker.tick() => log_snapshot(&registry),
                }
            }
        };

        (recorder, task)
    }
}

/// Renders `name{label=value,...}`.
fn render_key(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|label| format!("{}={}", label.key(), label.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

fn counter_snapshot(registry: &Registry<Key, AtomicStorage>) -> Vec<(String, u64)> {
    let mut counters: Vec<(String, u64)> = registry
        .get_counter_handles()
        .into_iter()
        .map(|(key, counter)| (render_key(&key), counter.load(Ordering::Relaxed)))
        .collect();
    counters.sort();
    counters
}

fn log_snapshot(registry: &Registry<Key, AtomicStorage>) {
    tracing::info!("--- Metrics Snapshot ---");
    for (key, value) in counter_snapshot(registry) {
        tracing::info!("[Counter] {}: {}", key, value);
    }
}

impl Recorder for LoggingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        self.registry
            .get_or_create_counter(key, |c| Counter::from_arc(c.clone()))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        self.registry
            .get_or_create_gauge(key, |g| Gauge::from_arc(g.clone()))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        self.registry
            .get_or_create_histogram(key, |h| Histogram::from_arc(h.clone()))
    }
}
