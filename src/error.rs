//! Error types shared across the crate.

use thiserror::Error;

/// A failure of an external transport: the container runtime or the
/// notification service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The operation did not finish within its deadline.
    #[error("timed out after {0}ms")]
    Timeout(u64),
    /// The remote side answered but rejected the request.
    #[error("rejected by remote: {0}")]
    Rejected(String),
    /// The request could not be carried out at all (I/O, HTTP, process spawn).
    #[error("transport failure: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// Invalid or missing configuration detected at startup. Always fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,
    #[error("source name must not be empty")]
    EmptySourceName,
    #[error("source '{0}' is configured more than once")]
    DuplicateSource(String),
    #[error("invalid pattern '{pattern}' for source '{source_name}': {reason}")]
    InvalidPattern {
        source_name: String,
        pattern: String,
        reason: String,
    },
    #[error("queue capacity must be greater than zero in bounded mode")]
    ZeroCapacity,
    #[error("notification timeout must be greater than zero")]
    ZeroTimeout,
}
