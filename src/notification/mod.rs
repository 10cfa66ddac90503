//! Error notifications.
//!
//! The aggregator hands error records to a `NotificationHandle`. A
//! `NotificationDispatcher` task drains that queue and delivers each record
//! through the `NotificationSink`, so a slow chat service never holds up
//! console output.
pub mod dispatcher;
pub mod sink;
pub mod slack;

pub use dispatcher::{NotificationDispatcher, NotificationHandle};
pub use sink::NotificationSink;
pub use slack::SlackClient;

/// Renders the alert text for an error line.
pub fn alert_text(source: &str, line: &str) -> String {
    format!("🚨 *Error detected in {}*\n```{}```", source, line)
}
