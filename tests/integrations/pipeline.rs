//! End-to-end runs of the reader → aggregator → console pipeline.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::app::TestAppBuilder;
use helpers::fake_chat::{Behavior, FakeChatTransport};
use helpers::fake_source::{Ending, FakeSourceProvider};
use logwatch::app::StopReason;
use logwatch::core::ReaderExit;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_bookstore_error_is_printed_and_notified_once() {
    let provider = FakeSourceProvider::new().with_source(
        "bookstore-app",
        &["[INFO] started", "[ERROR] disk full", "[info] request served"],
        Ending::Close,
    );
    let transport = Arc::new(FakeChatTransport::new(Behavior::Succeed));

    let app = TestAppBuilder::new(&["bookstore-app"])
        .with_provider(Arc::new(provider))
        .with_transport(transport.clone())
        .start()
        .unwrap();
    let console = app.console.clone();
    let report = app.wait(WAIT).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::SourcesFinished);
    assert_eq!(report.exit_for("bookstore-app"), Some(&ReaderExit::Closed));
    // A single source is printed without a label.
    assert_eq!(
        console.lines(),
        vec!["[INFO] started", "[ERROR] disk full", "[info] request served"]
    );
    assert_eq!(
        transport.sent(),
        vec![(
            "#monitoring".to_string(),
            "🚨 *Error detected in bookstore-app*\n```[ERROR] disk full```".to_string()
        )]
    );
}

#[tokio::test]
async fn test_order_is_preserved_per_source() {
    let a: Vec<String> = (0..50).map(|i| format!("a-{}", i)).collect();
    let b: Vec<String> = (0..50).map(|i| format!("b-{}", i)).collect();
    let provider = FakeSourceProvider::new()
        .with_source("a", &a.iter().map(String::as_str).collect::<Vec<_>>(), Ending::Close)
        .with_source("b", &b.iter().map(String::as_str).collect::<Vec<_>>(), Ending::Close);

    let app = TestAppBuilder::new(&["a", "b"])
        .with_provider(Arc::new(provider))
        .with_config(|c| c.queue.capacity = 4)
        .start()
        .unwrap();
    let console = app.console.clone();
    app.wait(WAIT).await.unwrap();

    let lines = console.lines();
    assert_eq!(lines.len(), 100);
    for (name, expected) in [("a", &a), ("b", &b)] {
        let prefix = format!("[{}] ", name);
        let seen: Vec<&str> = lines
            .iter()
            .filter_map(|l| l.strip_prefix(prefix.as_str()))
            .collect();
        assert_eq!(seen, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_sequential_mode_tails_sources_one_after_another() {
    let provider = FakeSourceProvider::new()
        .with_source("a", &["a-1", "a-2"], Ending::Close)
        .with_source("b", &["b-1", "b-2"], Ending::Close);

    let app = TestAppBuilder::new(&["a", "b"])
        .with_provider(Arc::new(provider))
        .with_config(|c| c.concurrency.per_source = false)
        .start()
        .unwrap();
    let console = app.console.clone();
    let report = app.wait(WAIT).await.unwrap();

    assert_eq!(console.lines(), vec!["[a] a-1", "[a] a-2", "[b] b-1", "[b] b-2"]);
    assert_eq!(
        report.reader_exits,
        vec![
            ("a".to_string(), ReaderExit::Closed),
            ("b".to_string(), ReaderExit::Closed)
        ]
    );
}

#[tokio::test]
async fn test_undecodable_line_is_skipped() {
    let provider = FakeSourceProvider::new().with_raw_source(
        "bookstore-app",
        vec![b"before\n".to_vec(), vec![0xff, 0xfe, b'\n'], b"after\r\n".to_vec()],
        Ending::Close,
    );

    let app = TestAppBuilder::new(&["bookstore-app"])
        .with_provider(Arc::new(provider))
        .start()
        .unwrap();
    let console = app.console.clone();
    app.wait(WAIT).await.unwrap();

    assert_eq!(console.lines(), vec!["before", "after"]);
}

#[tokio::test]
async fn test_empty_and_control_character_lines() {
    let provider = FakeSourceProvider::new().with_source(
        "bookstore-app",
        &["", "bell\u{7}here", "tab\tkept"],
        Ending::Close,
    );

    let app = TestAppBuilder::new(&["bookstore-app"])
        .with_provider(Arc::new(provider))
        .start()
        .unwrap();
    let console = app.console.clone();
    app.wait(WAIT).await.unwrap();

    assert_eq!(console.lines(), vec!["", "bell\u{FFFD}here", "tab\tkept"]);
}
