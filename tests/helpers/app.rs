//! Test helpers for running the full application instance.

use anyhow::Result;
use logwatch::{
    app::{App, RunReport},
    config::{Config, DisplayColor, SourceConfig},
    core::{ChatTransport, LogSourceProvider},
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle, time::timeout};

use super::recording_console::RecordingConsole;

/// A running instance of the application.
pub struct TestApp {
    pub shutdown_tx: watch::Sender<bool>,
    pub app_handle: JoinHandle<Result<RunReport>>,
    pub console: RecordingConsole,
}

impl TestApp {
    /// Sends the shutdown signal and waits for the application to terminate.
    /// Fails if it does not shut down within `timeout_duration`.
    pub async fn shutdown(self, timeout_duration: Duration) -> Result<RunReport> {
        let _ = self.shutdown_tx.send(true);
        self.join(timeout_duration).await
    }

    /// Waits for the application to stop on its own.
    pub async fn wait(self, timeout_duration: Duration) -> Result<RunReport> {
        let shutdown_tx = self.shutdown_tx;
        let result = match timeout(timeout_duration, self.app_handle).await {
            Ok(joined) => joined?,
            Err(_) => Err(anyhow::anyhow!("App did not stop within the timeout")),
        };
        drop(shutdown_tx);
        result
    }

    async fn join(self, timeout_duration: Duration) -> Result<RunReport> {
        match timeout(timeout_duration, self.app_handle).await {
            Ok(joined) => joined?,
            Err(_) => Err(anyhow::anyhow!("App failed to shut down within the timeout")),
        }
    }
}

/// A builder for creating `TestApp` instances with specific configurations.
pub struct TestAppBuilder {
    pub config: Config,
    provider: Option<Arc<dyn LogSourceProvider>>,
    transport: Option<Arc<dyn ChatTransport>>,
}

impl TestAppBuilder {
    /// Plain-text output, notifications off, a short grace period.
    pub fn new(sources: &[&str]) -> Self {
        let mut config = Config::default();
        config.sources = sources
            .iter()
            .enumerate()
            .map(|(i, name)| {
                SourceConfig::with_defaults(*name, DisplayColor::PALETTE[i % DisplayColor::PALETTE.len()])
            })
            .collect();
        config.output.color = false;
        config.notification.enabled = false;
        config.shutdown.grace_period_ms = 1000;
        Self {
            config,
            provider: None,
            transport: None,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn LogSourceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Enables notifications through the given transport.
    pub fn with_transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.config.notification.enabled = true;
        self.transport = Some(transport);
        self
    }

    pub fn with_config<F: FnOnce(&mut Config)>(mut self, f: F) -> Self {
        f(&mut self.config);
        self
    }

    pub fn start(self) -> Result<TestApp> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let console = RecordingConsole::new();

        let mut builder = App::builder(self.config).console_override(Arc::new(console.clone()));
        if let Some(provider) = self.provider {
            builder = builder.source_provider_override(provider);
        }
        if let Some(transport) = self.transport {
            builder = builder.chat_transport_override(transport);
        }
        let app = builder.build(shutdown_rx)?;

        Ok(TestApp {
            shutdown_tx,
            app_handle: tokio::spawn(app.run()),
            console,
        })
    }
}
