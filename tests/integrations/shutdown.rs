//! Graceful shutdown of the whole application.

#[path = "../helpers/mod.rs"]
mod helpers;

use async_trait::async_trait;
use helpers::app::TestAppBuilder;
use helpers::fake_chat::{Behavior, FakeChatTransport};
use helpers::fake_source::{Ending, FakeSourceProvider};
use helpers::wait_until;
use logwatch::app::{App, StopReason};
use logwatch::config::Config;
use logwatch::core::{ConsoleSink, ReaderExit};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::test]
async fn test_blocked_reader_unblocks_on_shutdown() {
    let provider = FakeSourceProvider::new()
        .with_source("bookstore-app", &[], Ending::Hang)
        .with_source("bookstore-db", &["[info] ready"], Ending::Hang);

    let app = TestAppBuilder::new(&["bookstore-app", "bookstore-db"])
        .with_provider(Arc::new(provider.clone()))
        .start()
        .unwrap();
    let console = app.console.clone();
    assert!(wait_until(Duration::from_secs(2), || provider.attached() == 2).await);
    assert!(wait_until(Duration::from_secs(2), || console.len() == 1).await);

    let report = app.shutdown(Duration::from_secs(2)).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Signal);
    assert_eq!(report.exit_for("bookstore-app"), Some(&ReaderExit::Cancelled));
    assert_eq!(report.exit_for("bookstore-db"), Some(&ReaderExit::Cancelled));
    assert!(report.tasks.is_clean(), "{:?}", report.tasks);
    // No reader keeps its stream after exiting.
    assert_eq!(provider.attached(), 0);
}

#[tokio::test]
async fn test_hung_notification_does_not_hold_up_shutdown() {
    let provider = FakeSourceProvider::new().with_source(
        "bookstore-app",
        &["[error] one", "[error] two", "[error] three"],
        Ending::Hang,
    );
    let transport = Arc::new(FakeChatTransport::new(Behavior::Delay(Duration::from_secs(60))));

    let app = TestAppBuilder::new(&["bookstore-app"])
        .with_provider(Arc::new(provider))
        .with_transport(transport.clone())
        .start()
        .unwrap();
    let console = app.console.clone();
    assert!(wait_until(Duration::from_secs(2), || console.len() == 3).await);
    assert!(wait_until(Duration::from_secs(2), || !transport.sent().is_empty()).await);

    let started = tokio::time::Instant::now();
    let report = app.shutdown(Duration::from_secs(3)).await.unwrap();

    // The grace period is 1s; a clean stop must not wait for it.
    assert!(started.elapsed() < Duration::from_millis(900));
    assert!(report.tasks.is_clean(), "{:?}", report.tasks);
    // Only the first alert was attempted; the rest were abandoned.
    assert_eq!(transport.sent().len(), 1);
}

struct StuckConsole;

#[async_trait]
impl ConsoleSink for StuckConsole {
    fn name(&self) -> &str {
        "stuck"
    }

    async fn write_line(&self, _line: &str) -> anyhow::Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_stuck_task_is_aborted_after_grace_period() {
    let provider = FakeSourceProvider::new().with_source("bookstore-app", &["[info] hi"], Ending::Hang);
    let mut config = Config::default();
    config.notification.enabled = false;
    config.shutdown.grace_period_ms = 200;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config)
        .source_provider_override(Arc::new(provider))
        .console_override(Arc::new(StuckConsole))
        .build(shutdown_rx)
        .unwrap();
    let handle = tokio::spawn(app.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();
    let report = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("app did not stop within the grace period")
        .unwrap()
        .unwrap();

    assert_eq!(report.tasks.aborted, vec!["Aggregator".to_string()]);
    assert_eq!(report.exit_for("bookstore-app"), Some(&ReaderExit::Cancelled));
}

#[tokio::test]
async fn test_invalid_config_fails_before_spawning() {
    let mut config = Config::default();
    config.sources.clear();

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    assert!(App::builder(config).build(shutdown_rx).is_err());
}
