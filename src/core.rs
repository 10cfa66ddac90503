//! Core domain types and service traits for logwatch
//!
//! This module defines the records that flow through the pipeline and the
//! trait contracts for the external collaborators: the container runtime,
//! the chat service and the console.

use crate::error::TransportError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification bucket for a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[serde(alias = "warning")]
    Warn,
    Info,
    Debug,
    Unclassified,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
            Severity::Debug => "debug",
            Severity::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded log line, tagged with its source and arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Name of the source the line came from.
    pub source: String,
    /// The decoded line with its trailing line terminator removed.
    pub text: String,
    /// Process-wide enqueue sequence number.
    pub sequence: u64,
    /// Wall-clock time of enqueue.
    pub received_at: DateTime<Utc>,
}

/// Result of a single notification attempt. Logged, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Delivered,
    /// No transport is configured.
    Skipped,
    Failed(String),
}

impl NotificationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationOutcome::Delivered => "delivered",
            NotificationOutcome::Skipped => "skipped",
            NotificationOutcome::Failed(_) => "failed",
        }
    }
}

/// Terminal state of a source reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderExit {
    /// The source stream ended.
    Closed,
    /// The source did not exist at attach time.
    NotFound,
    /// The source API failed.
    Errored(String),
    /// Shutdown was requested while the reader was running.
    Cancelled,
}

impl ReaderExit {
    pub fn label(&self) -> &'static str {
        match self {
            ReaderExit::Closed => "closed",
            ReaderExit::NotFound => "not_found",
            ReaderExit::Errored(_) => "errored",
            ReaderExit::Cancelled => "cancelled",
        }
    }
}

/// An acknowledgement returned by a chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ack {
    /// Transport-specific message identifier, if the service returns one.
    pub id: Option<String>,
}

/// A lazily produced sequence of raw lines from one source. Ends when the
/// source stops; an `Err` item reports a transport failure.
pub type LineStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

// =============================================================================
// Service Traits
// =============================================================================

/// Discovers sources and attaches to their log streams.
#[async_trait]
pub trait LogSourceProvider: Send + Sync {
    /// Checks whether the named source currently exists.
    async fn exists(&self, name: &str) -> Result<bool, TransportError>;

    /// Attaches to the named source's log stream. The returned stream is
    /// infinite until the source stops and cannot be restarted.
    async fn stream_lines(&self, name: &str) -> Result<LineStream, TransportError>;
}

/// Sends a text message to a chat channel.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, channel: &str, text: &str) -> Result<Ack, TransportError>;
}

/// Receives formatted lines for display.
#[async_trait]
pub trait ConsoleSink: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &str;

    /// Writes one line and flushes it.
    async fn write_line(&self, line: &str) -> Result<()>;
}
