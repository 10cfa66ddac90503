//! Container log source backed by the `docker` command-line client.

use crate::core::{LineStream, LogSourceProvider};
use crate::error::TransportError;
use async_trait::async_trait;
use futures::StreamExt;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::wrappers::SplitStream;
use tracing::debug;

/// Talks to the container runtime through the `docker` binary.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// Checks `docker ps --format {{.Names}}` output for an exact name match.
/// The `name=` filter itself matches substrings.
pub fn container_listed(ps_output: &str, name: &str) -> bool {
    ps_output.lines().any(|line| line.trim() == name)
}

#[async_trait]
impl LogSourceProvider for DockerCli {
    async fn exists(&self, name: &str) -> Result<bool, TransportError> {
        let filter = format!("name={}", name);
        let output = Command::new(&self.binary)
            .args(["ps", "--filter", filter.as_str(), "--format", "{{.Names}}"])
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(TransportError::Rejected(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(container_listed(&String::from_utf8_lossy(&output.stdout), name))
    }

    async fn stream_lines(&self, name: &str) -> Result<LineStream, TransportError> {
        debug!(container = name, "Spawning docker logs");
        let mut child = Command::new(&self.binary)
            .args(["logs", "-f", "--timestamps", name])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Io("docker logs stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::Io("docker logs stderr not captured".to_string()))?;

        // Containers write to both streams; docker relays them separately.
        let lines = futures::stream::select(
            SplitStream::new(BufReader::new(stdout).split(b'\n')),
            SplitStream::new(BufReader::new(stderr).split(b'\n')),
        );

        let stream = futures::stream::unfold(Some((child, lines)), |state| async move {
            let (mut child, mut lines) = state?;
            match lines.next().await {
                Some(Ok(line)) => Some((Ok(line), Some((child, lines)))),
                Some(Err(e)) => Some((Err(TransportError::from(e)), None)),
                None => match child.wait().await {
                    Ok(status) if status.success() => None,
                    Ok(status) => Some((
                        Err(TransportError::Rejected(format!("docker logs exited with {}", status))),
                        None,
                    )),
                    Err(e) => Some((Err(TransportError::from(e)), None)),
                },
            }
        });

        Ok(stream.boxed())
    }
}
