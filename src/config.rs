//! Configuration management for logwatch
//!
//! This module defines the main `Config` struct and its sub-structs. Values
//! are layered with `figment`: built-in defaults, then the TOML file, then the
//! Slack credential variables, then `LOGWATCH_`-prefixed environment variables,
//! and finally command-line flags.

use crate::{cli::Cli, core::Severity, error::ConfigError};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "logwatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level used when `RUST_LOG` is not set.
    pub log_level: String,
    /// The containers to monitor, in display order.
    pub sources: Vec<SourceConfig>,
    /// Capacity and backpressure policy of the shared record queue.
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    /// Configuration for error notifications.
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// One monitored container.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    /// The container name.
    pub name: String,
    /// Style for the source label and unclassified lines.
    #[serde(default)]
    pub color: DisplayColor,
    /// Severity patterns, evaluated in the declared order.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<PatternConfig>,
}

impl SourceConfig {
    /// A source with the default `[error]`/`[warn]`/`[info]`/`[debug]` tags.
    pub fn with_defaults(name: impl Into<String>, color: DisplayColor) -> Self {
        Self {
            name: name.into(),
            color,
            patterns: default_patterns(),
        }
    }
}

/// A single `(severity, pattern)` pair.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PatternConfig {
    pub severity: Severity,
    pub pattern: String,
    #[serde(default)]
    pub kind: PatternKind,
}

impl PatternConfig {
    pub fn literal(severity: Severity, pattern: &str) -> Self {
        Self {
            severity,
            pattern: pattern.to_string(),
            kind: PatternKind::Literal,
        }
    }

    pub fn regex(severity: Severity, pattern: &str) -> Self {
        Self {
            severity,
            pattern: pattern.to_string(),
            kind: PatternKind::Regex,
        }
    }
}

/// How a pattern string is interpreted. Both kinds match case-insensitively.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// A plain substring.
    #[default]
    Literal,
    /// A regular expression.
    Regex,
}

/// Terminal colors available for sources.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayColor {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    #[default]
    White,
    Grey,
}

impl DisplayColor {
    /// Colors handed out to sources named on the command line.
    pub const PALETTE: [DisplayColor; 4] = [
        DisplayColor::Cyan,
        DisplayColor::Magenta,
        DisplayColor::White,
        DisplayColor::Grey,
    ];
}

/// Backpressure policy of the shared queue.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    /// Producers wait when the queue is full.
    #[default]
    Bounded,
    /// The queue grows without limit.
    Unbounded,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    pub mode: QueueMode,
    /// Capacity in records. Ignored in unbounded mode.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mode: QueueMode::Bounded,
            capacity: 1024,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Tail every source in its own task. When false, sources are tailed one
    /// after another by a single task.
    pub per_source: bool,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { per_source: true }
    }
}

/// Configuration for Slack notifications.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Slack bot token. Falls back to `SLACK_BOT_TOKEN`.
    pub token: Option<String>,
    /// Target channel. Falls back to `SLACK_CHANNEL`.
    pub channel: String,
    pub api_url: String,
    /// Upper bound for a single notification attempt.
    pub timeout_ms: u64,
    /// Pending notifications held between the aggregator and the dispatcher.
    pub queue_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: None,
            channel: "#monitoring".to_string(),
            api_url: "https://slack.com/api/chat.postMessage".to_string(),
            timeout_ms: 5000,
            queue_capacity: 256,
        }
    }
}

impl NotificationConfig {
    /// Returns the token if notifications are enabled and a non-empty token is set.
    pub fn active_token(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Emit ANSI colors on the console.
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long tasks get to finish after the shutdown signal.
    pub grace_period_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Log counter snapshots periodically.
    pub log_metrics: bool,
    pub log_interval_seconds: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            log_metrics: false,
            log_interval_seconds: 60,
        }
    }
}

fn default_patterns() -> Vec<PatternConfig> {
    vec![
        PatternConfig::literal(Severity::Error, "[error]"),
        PatternConfig::literal(Severity::Warn, "[warn]"),
        PatternConfig::literal(Severity::Info, "[info]"),
        PatternConfig::literal(Severity::Debug, "[debug]"),
    ]
}

impl Config {
    /// Loads the configuration by layering defaults, the TOML file, the
    /// environment and the command line, then validates it.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(slack_env())
            // e.g. LOGWATCH_QUEUE__CAPACITY=4096
            .merge(Env::prefixed("LOGWATCH_").split("__"))
            .merge(cli.clone())
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants that deserialization alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::EmptySourceName);
            }
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
            for p in source.patterns.iter().filter(|p| p.kind == PatternKind::Regex) {
                RegexBuilder::new(&p.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern {
                        source_name: source.name.clone(),
                        pattern: p.pattern.clone(),
                        reason: e.to_string(),
                    })?;
            }
        }

        if self.queue.mode == QueueMode::Bounded && self.queue.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.notification.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Maps the conventional Slack variables onto the notification section.
fn slack_env() -> Env {
    Env::raw().filter_map(|key| {
        if key.as_str().eq_ignore_ascii_case("SLACK_BOT_TOKEN") {
            Some("notification.token".into())
        } else if key.as_str().eq_ignore_ascii_case("SLACK_CHANNEL") {
            Some("notification.channel".into())
        } else {
            None
        }
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            sources: vec![SourceConfig::with_defaults("bookstore-app", DisplayColor::Cyan)],
            queue: QueueConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            notification: NotificationConfig::default(),
            output: OutputConfig::default(),
            shutdown: ShutdownConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
