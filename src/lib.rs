//! LogWatch - tails container logs, colors them by severity and reports
//! error lines to Slack.
//!
//! The library holds the whole pipeline; `main.rs` only loads the
//! configuration, sets up logging and waits for ctrl-c.

pub mod aggregator;
pub mod app;
pub mod classification;
pub mod cli;
pub mod config;
pub mod console;
pub mod core;
pub mod docker;
pub mod error;
pub mod formatting;
pub mod internal_metrics;
pub mod notification;
pub mod reader;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
