//! LogWatch - Container Log Monitor
//!
//! Tails one or more containers, prints their lines colored by severity and
//! posts error lines to a Slack channel.

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use logwatch::{
    app::{App, StopReason},
    cli::Cli,
    config::{Config, QueueMode},
    internal_metrics::logging_recorder::LoggingRecorder,
};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    // Diagnostics go to stderr; stdout carries only the monitored log lines.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(config).await {
        error!("Fatal error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    log_configuration(&config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // =========================================================================
    // Initialize Metrics Recorder if enabled
    // =========================================================================
    let mut metrics_task = None;
    if config.metrics.log_metrics {
        info!(
            "Logging recorder enabled. Metrics will be printed every {} seconds.",
            config.metrics.log_interval_seconds
        );
        let (recorder, task) = LoggingRecorder::new(
            Duration::from_secs(config.metrics.log_interval_seconds),
            shutdown_rx.clone(),
        );
        match metrics::set_global_recorder(recorder) {
            Ok(()) => metrics_task = Some(tokio::spawn(task)),
            Err(e) => warn!("Failed to install logging recorder: {}", e),
        }
    }

    let app = App::builder(config).build(shutdown_rx)?;

    info!("Starting log monitoring...");
    info!("Press Ctrl+C to stop monitoring");

    let ctrl_c = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Shutting down gracefully...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Failed to listen for ctrl-c: {}", e),
        }
        shutdown_tx
    });

    let report = app.run().await?;
    for (source, exit) in &report.reader_exits {
        info!(source = %source, exit = exit.label(), "Reader finished");
    }

    match report.stop_reason {
        StopReason::Signal => info!("Log monitoring stopped"),
        StopReason::SourcesFinished => {
            ctrl_c.abort();
            info!("All sources have stopped. Log monitoring stopped");
        }
    }

    if let Some(handle) = metrics_task {
        // The recorder task stops on the shutdown signal or when the sender is dropped.
        if let Err(e) = handle.await {
            error!("Metrics task panicked: {:?}", e);
        }
    }

    Ok(())
}

fn log_configuration(config: &Config) {
    info!("LogWatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    for source in &config.sources {
        info!(
            "Source: {} (color: {:?}, patterns: {})",
            source.name,
            source.color,
            source.patterns.len()
        );
    }
    match config.queue.mode {
        QueueMode::Bounded => info!("Record Queue: bounded ({})", config.queue.capacity),
        QueueMode::Unbounded => info!("Record Queue: unbounded"),
    }
    info!(
        "Concurrency: {}",
        if config.concurrency.per_source {
            "one reader per source"
        } else {
            "sequential"
        }
    );
    info!(
        "Slack Notifications: {}",
        if config.notification.active_token().is_some() {
            format!("Enabled ({})", config.notification.channel)
        } else {
            "Disabled".to_string()
        }
    );
    info!("Console Colors: {}", config.output.color);
    info!("Shutdown Grace Period: {}ms", config.shutdown.grace_period_ms);
    info!("Log Metrics: {}", config.metrics.log_metrics);
    info!("-------------------------------------------------------");
}
