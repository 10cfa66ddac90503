//! Notification failures and slowness never hold up console output.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::app::TestAppBuilder;
use helpers::fake_chat::{Behavior, FakeChatTransport};
use helpers::fake_source::{Ending, FakeSourceProvider};
use helpers::wait_until;
use logwatch::core::NotificationOutcome;
use logwatch::error::TransportError;
use logwatch::notification::NotificationSink;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_disabled_sink_reports_skipped() {
    let outcome = NotificationSink::disabled()
        .notify("bookstore-app", "[ERROR] disk full")
        .await;
    assert_eq!(outcome, NotificationOutcome::Skipped);
}

#[tokio::test]
async fn test_enabled_without_token_still_prints_errors() {
    let provider = FakeSourceProvider::new().with_source(
        "bookstore-app",
        &["[ERROR] disk full", "[info] recovered"],
        Ending::Close,
    );

    let app = TestAppBuilder::new(&["bookstore-app"])
        .with_provider(Arc::new(provider))
        .with_config(|c| {
            c.notification.enabled = true;
            c.notification.token = None;
        })
        .start()
        .unwrap();
    let console = app.console.clone();
    app.wait(Duration::from_secs(3)).await.unwrap();

    assert_eq!(console.lines(), vec!["[ERROR] disk full", "[info] recovered"]);
}

#[tokio::test]
async fn test_rejected_notification_does_not_stop_the_pipeline() {
    let provider = FakeSourceProvider::new().with_source(
        "bookstore-app",
        &["[error] first", "[info] between", "[error] second"],
        Ending::Close,
    );
    let transport = Arc::new(FakeChatTransport::new(Behavior::Fail(
        TransportError::Rejected("channel_not_found".to_string()),
    )));

    let app = TestAppBuilder::new(&["bookstore-app"])
        .with_provider(Arc::new(provider))
        .with_transport(transport.clone())
        .start()
        .unwrap();
    let console = app.console.clone();
    app.wait(Duration::from_secs(3)).await.unwrap();

    assert_eq!(console.len(), 3);
    // Each error line gets its own attempt; a failure is not retried.
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test]
async fn test_slow_transport_does_not_delay_console() {
    let provider = FakeSourceProvider::new().with_source(
        "bookstore-app",
        &["[error] one", "[info] two", "[error] three", "[info] four"],
        Ending::Hang,
    );
    let transport = Arc::new(FakeChatTransport::new(Behavior::Delay(Duration::from_secs(30))));

    let app = TestAppBuilder::new(&["bookstore-app"])
        .with_provider(Arc::new(provider))
        .with_transport(transport.clone())
        .with_config(|c| c.notification.timeout_ms = 200)
        .start()
        .unwrap();
    let console = app.console.clone();

    // All four lines are printed while the first notification is still pending.
    assert!(wait_until(Duration::from_millis(150), || console.len() == 4).await);
    assert!(wait_until(Duration::from_millis(150), || !transport.sent().is_empty()).await);

    // The first attempt times out, then the second one is made.
    assert!(wait_until(Duration::from_secs(2), || transport.sent().len() == 2).await);

    app.shutdown(Duration::from_secs(3)).await.unwrap();
}
