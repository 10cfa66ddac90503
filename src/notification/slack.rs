//! A client for posting messages through the Slack Web API.

use crate::core::{Ack, ChatTransport};
use crate::error::TransportError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// The subset of a `chat.postMessage` response we act on.
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Posts messages to `chat.postMessage` with a bot token.
pub struct SlackClient {
    api_url: String,
    token: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl SlackClient {
    /// Creates a new `SlackClient`. Every request is bounded by `timeout`.
    pub fn new(api_url: String, token: String, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(Self {
            api_url,
            token,
            client,
            timeout,
        })
    }

    /// Builds the request body: plain text plus the same text as a single
    /// mrkdwn section block.
    pub fn payload(channel: &str, text: &str) -> Value {
        json!({
            "channel": channel,
            "text": text,
            "blocks": [
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": text }
                }
            ]
        })
    }

    fn map_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout.as_millis() as u64)
        } else {
            TransportError::Io(e.to_string())
        }
    }
}

#[async_trait]
impl ChatTransport for SlackClient {
    #[instrument(skip(self, text), fields(channel = %channel))]
    async fn send(&self, channel: &str, text: &str) -> Result<Ack, TransportError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&Self::payload(channel, text))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected(format!(
                "status {}, body: {}",
                status, body
            )));
        }

        let body: SlackResponse = response.json().await.map_err(|e| self.map_error(e))?;
        if !body.ok {
            return Err(TransportError::Rejected(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        debug!("Slack accepted message");
        Ok(Ack { id: body.ts })
    }
}
