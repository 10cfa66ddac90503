//! Manages the lifecycle of all spawned tasks in the application.
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// What happened to the managed tasks during shutdown.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub completed: Vec<String>,
    pub panicked: Vec<String>,
    /// Tasks still running when the grace period ran out.
    pub aborted: Vec<String>,
}

impl ShutdownSummary {
    pub fn is_clean(&self) -> bool {
        self.panicked.is_empty() && self.aborted.is_empty()
    }
}

/// A centralized manager for all spawned tasks.
///
/// This struct is responsible for:
/// - Spawning tasks and keeping track of their `JoinHandle`s.
/// - Waiting for them within a grace period and aborting stragglers.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(String, JoinHandle<()>)>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    /// Creates a new `TaskManager`.
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns a new task and adds its handle to the manager.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        debug!(task_name = %name, "Spawning task");
        let handle = tokio::spawn(future);
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((name, handle));
    }

    /// Returns a clone of the shutdown receiver.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Waits for all managed tasks to complete, aborting any that are still
    /// running once `grace` has elapsed.
    pub async fn shutdown(self, grace: Duration) -> ShutdownSummary {
        let handles = self
            .handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect::<Vec<_>>();
        info!(
            "TaskManager shutting down. Waiting up to {}ms for {} tasks to complete...",
            grace.as_millis(),
            handles.len()
        );

        let deadline = Instant::now() + grace;
        let mut summary = ShutdownSummary::default();
        for (name, mut handle) in handles {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {
                    debug!(task_name = %name, "Task shut down gracefully.");
                    summary.completed.push(name);
                }
                Ok(Err(e)) => {
                    error!(task_name = %name, error = %e, "Task panicked during shutdown.");
                    summary.panicked.push(name);
                }
                Err(_) => {
                    warn!(task_name = %name, "Task did not stop within the grace period, aborting.");
                    handle.abort();
                    summary.aborted.push(name);
                }
            }
        }

        if summary.is_clean() {
            info!("All tasks shut down gracefully.");
        } else {
            error!(
                panicked = ?summary.panicked,
                aborted = ?summary.aborted,
                "Some tasks did not shut down cleanly."
            );
        }
        summary
    }
}
