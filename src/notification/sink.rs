//! The notification boundary: bounded, infallible from the caller's side.

use crate::core::{ChatTransport, NotificationOutcome};
use crate::error::TransportError;
use crate::notification::alert_text;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
struct Target {
    transport: Arc<dyn ChatTransport>,
    channel: String,
}

/// Wraps a chat transport. Without a transport it is a no-op that reports
/// every call as `Skipped`.
#[derive(Clone)]
pub struct NotificationSink {
    target: Option<Target>,
    timeout: Duration,
}

impl std::fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSink")
            .field("channel", &self.target.as_ref().map(|t| t.channel.as_str()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NotificationSink {
    pub fn new(transport: Arc<dyn ChatTransport>, channel: String, timeout: Duration) -> Self {
        Self {
            target: Some(Target { transport, channel }),
            timeout,
        }
    }

    pub fn disabled() -> Self {
        Self {
            target: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Sends an alert for an error line. Returns within the configured
    /// timeout and never propagates a transport failure.
    pub async fn notify(&self, source: &str, line: &str) -> NotificationOutcome {
        let Some(target) = &self.target else {
            return NotificationOutcome::Skipped;
        };

        let text = alert_text(source, line);
        let send = target.transport.send(&target.channel, &text);
        match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(_ack)) => NotificationOutcome::Delivered,
            Ok(Err(e)) => NotificationOutcome::Failed(e.to_string()),
            Err(_) => NotificationOutcome::Failed(
                TransportError::Timeout(self.timeout.as_millis() as u64).to_string(),
            ),
        }
    }
}
