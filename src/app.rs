//! The main application logic, decoupled from the entry point.

use crate::{
    aggregator::Aggregator,
    classification::Classifier,
    config::{Config, QueueMode},
    console::StdoutConsole,
    core::{ChatTransport, ConsoleSink, LogSourceProvider, ReaderExit},
    docker::DockerCli,
    formatting::Formatter,
    internal_metrics::Metrics,
    notification::{NotificationDispatcher, NotificationHandle, NotificationSink, SlackClient},
    reader::{run_sequentially, RecordQueue, SourceReader},
    task_manager::{ShutdownSummary, TaskManager},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

/// How the application stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The external shutdown signal fired.
    Signal,
    /// Every source reached a terminal state and the queue was drained.
    SourcesFinished,
}

/// What `App::run` reports once every task has stopped.
#[derive(Debug)]
pub struct RunReport {
    pub stop_reason: StopReason,
    /// Terminal state of each reader, in the order they were reported.
    pub reader_exits: Vec<(String, ReaderExit)>,
    pub tasks: ShutdownSummary,
}

impl RunReport {
    pub fn exit_for(&self, source: &str) -> Option<&ReaderExit> {
        self.reader_exits
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, exit)| exit)
    }
}

/// A handle to the running application, containing all its task handles.
pub struct App {
    task_manager: TaskManager,
    shutdown_rx: watch::Receiver<bool>,
    cancel_tx: watch::Sender<bool>,
    pipeline_done_rx: oneshot::Receiver<()>,
    exits_rx: mpsc::UnboundedReceiver<(String, ReaderExit)>,
    grace: Duration,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Waits for the shutdown signal or for the pipeline to finish on its own,
    /// then waits for every task within the grace period. Tasks are only
    /// cancelled when the signal fired.
    pub async fn run(self) -> Result<RunReport> {
        let App {
            task_manager,
            mut shutdown_rx,
            cancel_tx,
            mut pipeline_done_rx,
            mut exits_rx,
            grace,
        } = self;

        let stop_reason = if *shutdown_rx.borrow_and_update() {
            StopReason::Signal
        } else {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal received. Waiting for tasks to complete...");
                    StopReason::Signal
                }
                _ = &mut pipeline_done_rx => {
                    info!("All sources finished. Shutting down...");
                    StopReason::SourcesFinished
                }
            }
        };

        // When the sources finished on their own, the dispatcher is left to
        // deliver what is still queued; it stops once the aggregator is gone.
        if stop_reason == StopReason::Signal {
            // A send error only means every task already dropped its receiver.
            let _ = cancel_tx.send(true);
        }
        let tasks = task_manager.shutdown(grace).await;
        drop(cancel_tx);

        let mut reader_exits = Vec::new();
        while let Ok(exit) = exits_rx.try_recv() {
            reader_exits.push(exit);
        }

        info!("All tasks shut down.");
        Ok(RunReport {
            stop_reason,
            reader_exits,
            tasks,
        })
    }
}

/// Builder for the main application.
///
/// This pattern allows for a clean separation of concerns between constructing
/// the application's components and running the application. It also provides
/// a convenient way to override components for testing purposes.
pub struct AppBuilder {
    config: Config,
    source_provider_override: Option<Arc<dyn LogSourceProvider>>,
    console_override: Option<Arc<dyn ConsoleSink>>,
    chat_transport_override: Option<Arc<dyn ChatTransport>>,
    metrics_override: Option<Metrics>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            source_provider_override: None,
            console_override: None,
            chat_transport_override: None,
            metrics_override: None,
        }
    }

    /// Overrides the log source provider for testing.
    pub fn source_provider_override(mut self, provider: Arc<dyn LogSourceProvider>) -> Self {
        self.source_provider_override = Some(provider);
        self
    }

    /// Overrides the console sink for testing.
    pub fn console_override(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console_override = Some(console);
        self
    }

    /// Overrides the chat transport for testing. Used whenever notifications
    /// are enabled, with or without a token.
    pub fn chat_transport_override(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.chat_transport_override = Some(transport);
        self
    }

    /// Overrides the metrics system for testing.
    pub fn metrics_override(mut self, metrics: Metrics) -> Self {
        self.metrics_override = Some(metrics);
        self
    }

    /// Builds and initializes all application components, returning a runnable `App`.
    ///
    /// Fails before any task is spawned when the classification patterns or
    /// the Slack client cannot be built.
    #[instrument(skip_all)]
    pub fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        config.validate()?;

        // =========================================================================
        // 1. Services
        // =========================================================================
        let metrics = Arc::new(self.metrics_override.unwrap_or_default());
        let classifier = Arc::new(
            Classifier::from_sources(&config.sources).context("Failed to compile patterns")?,
        );
        let formatter = Arc::new(Formatter::new(&config.sources, config.output.color));
        let provider = self
            .source_provider_override
            .unwrap_or_else(|| Arc::new(DockerCli::default()));
        let console = self
            .console_override
            .unwrap_or_else(|| Arc::new(StdoutConsole));

        let sink = build_sink(&config, self.chat_transport_override)?;

        // =========================================================================
        // 2. Tasks
        // =========================================================================
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task_manager = TaskManager::new(cancel_rx);

        let notifications = if sink.is_enabled() {
            let (dispatcher, handle) = NotificationDispatcher::new(
                sink,
                config.notification.queue_capacity,
                metrics.clone(),
            );
            task_manager.spawn(
                "NotificationDispatcher",
                dispatcher.run(task_manager.get_shutdown_rx()),
            );
            handle
        } else {
            NotificationHandle::disabled()
        };

        let (queue, records_rx) = RecordQueue::new(&config.queue);
        if config.queue.mode == QueueMode::Unbounded {
            warn!("Record queue is unbounded; memory grows if output falls behind.");
        }

        let (exits_tx, exits_rx) = mpsc::unbounded_channel();
        let readers: Vec<SourceReader> = config
            .sources
            .iter()
            .map(|source| {
                SourceReader::new(
                    source.name.clone(),
                    provider.clone(),
                    queue.clone(),
                    metrics.clone(),
                )
            })
            .collect();
        // Only the readers may hold producers, so the queue closes when they finish.
        drop(queue);

        if config.concurrency.per_source {
            for reader in readers {
                let name = reader.name().to_string();
                let exits_tx = exits_tx.clone();
                let shutdown_rx = task_manager.get_shutdown_rx();
                task_manager.spawn(format!("SourceReader[{}]", name), async move {
                    let exit = reader.run(shutdown_rx).await;
                    let _ = exits_tx.send((name, exit));
                });
            }
        } else {
            debug!("Tailing sources sequentially");
            let shutdown_rx = task_manager.get_shutdown_rx();
            task_manager.spawn("SourceReaders", async move {
                for exit in run_sequentially(readers, shutdown_rx).await {
                    let _ = exits_tx.send(exit);
                }
            });
        }

        let (pipeline_done_tx, pipeline_done_rx) = oneshot::channel();
        let aggregator = Aggregator::new(
            records_rx,
            classifier,
            formatter,
            console,
            notifications,
            metrics,
        );
        let aggregator_shutdown_rx = task_manager.get_shutdown_rx();
        task_manager.spawn("Aggregator", async move {
            aggregator.run(aggregator_shutdown_rx).await;
            let _ = pipeline_done_tx.send(());
        });

        Ok(App {
            task_manager,
            shutdown_rx,
            cancel_tx,
            pipeline_done_rx,
            exits_rx,
            grace: Duration::from_millis(config.shutdown.grace_period_ms),
        })
    }
}

fn build_sink(
    config: &Config,
    transport_override: Option<Arc<dyn ChatTransport>>,
) -> Result<NotificationSink> {
    let notification = &config.notification;
    let timeout = Duration::from_millis(notification.timeout_ms);

    if !notification.enabled {
        info!("Slack notifications disabled.");
        return Ok(NotificationSink::disabled());
    }
    if let Some(transport) = transport_override {
        return Ok(NotificationSink::new(
            transport,
            notification.channel.clone(),
            timeout,
        ));
    }
    match notification.active_token() {
        Some(token) => {
            let client = SlackClient::new(notification.api_url.clone(), token.to_string(), timeout)
                .context("Failed to build Slack client")?;
            Ok(NotificationSink::new(
                Arc::new(client),
                notification.channel.clone(),
                timeout,
            ))
        }
        None => {
            warn!("Slack notifications are enabled but no token is configured; notifications will be skipped.");
            Ok(NotificationSink::disabled())
        }
    }
}
