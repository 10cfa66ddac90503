//! Command-Line Interface (CLI) argument parsing.
//!
//! The parsed flags are merged on top of the TOML file and environment
//! variables, so anything given here wins.

use crate::config::{DisplayColor, SourceConfig};
use clap::Parser;
use figment::{
    providers::Serialized,
    value::{Dict, Map},
    Error, Figment, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Tails container logs, colors them by severity and reports errors to Slack.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Container to monitor with the default tag patterns. Repeatable; replaces
    /// the configured sources.
    #[arg(short, long = "source", value_name = "NAME")]
    pub sources: Vec<String>,

    /// Disable ANSI colors on the console.
    #[arg(long)]
    pub no_color: bool,

    /// Disable Slack notifications.
    #[arg(long)]
    pub no_notify: bool,

    /// Capacity of the shared record queue.
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,

    /// Logging level for diagnostics (e.g. "debug").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut figment = Figment::new();

        if !self.sources.is_empty() {
            let sources: Vec<SourceConfig> = self
                .sources
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let color = DisplayColor::PALETTE[i % DisplayColor::PALETTE.len()];
                    SourceConfig::with_defaults(name.clone(), color)
                })
                .collect();
            figment = figment.merge(Serialized::default("sources", sources));
        }

        if self.no_color {
            figment = figment.merge(Serialized::default("output.color", false));
        }

        if self.no_notify {
            figment = figment.merge(Serialized::default("notification.enabled", false));
        }

        if let Some(capacity) = self.queue_capacity {
            figment = figment.merge(Serialized::default("queue.capacity", capacity));
        }

        if let Some(level) = &self.log_level {
            figment = figment.merge(Serialized::default("log_level", level.clone()));
        }

        figment.data()
    }
}
