//! Console rendering of classified log lines.

use crate::{
    config::{DisplayColor, SourceConfig},
    core::Severity,
};
use crossterm::style::{Color, Stylize};
use std::collections::HashMap;

/// Stands in for control characters that would corrupt the terminal.
pub const PLACEHOLDER: char = '\u{FFFD}';

impl From<DisplayColor> for Color {
    fn from(color: DisplayColor) -> Self {
        match color {
            DisplayColor::Red => Color::Red,
            DisplayColor::Green => Color::Green,
            DisplayColor::Yellow => Color::Yellow,
            DisplayColor::Blue => Color::Blue,
            DisplayColor::Magenta => Color::Magenta,
            DisplayColor::Cyan => Color::Cyan,
            DisplayColor::White => Color::White,
            DisplayColor::Grey => Color::Grey,
        }
    }
}

/// Returns the fixed color for a severity, or `None` for `Unclassified`.
pub fn severity_color(severity: Severity) -> Option<Color> {
    match severity {
        Severity::Error => Some(Color::Red),
        Severity::Warn => Some(Color::Yellow),
        Severity::Info => Some(Color::Green),
        Severity::Debug => Some(Color::Blue),
        Severity::Unclassified => None,
    }
}

/// Renders lines for the console. Stateless after construction.
#[derive(Debug, Clone)]
pub struct Formatter {
    source_colors: HashMap<String, Color>,
    show_label: bool,
    color: bool,
}

impl Formatter {
    /// Builds a formatter for the configured sources. The source label is
    /// shown when more than one source is configured.
    pub fn new(sources: &[SourceConfig], color: bool) -> Self {
        let source_colors = sources
            .iter()
            .map(|s| (s.name.clone(), Color::from(s.color)))
            .collect();
        Self {
            source_colors,
            show_label: sources.len() > 1,
            color,
        }
    }

    /// Forces the source label on or off.
    pub fn with_label(mut self, show_label: bool) -> Self {
        self.show_label = show_label;
        self
    }

    /// Formats one line. Never fails.
    pub fn format(&self, source: &str, severity: Severity, line: &str) -> String {
        let text = sanitize(line);
        let source_color = self
            .source_colors
            .get(source)
            .copied()
            .unwrap_or(Color::White);
        let line_color = severity_color(severity).unwrap_or(source_color);

        let label = if self.show_label {
            Some(format!("[{}]", source))
        } else {
            None
        };

        match (label, self.color) {
            (Some(label), true) => format!("{} {}", label.with(source_color), text.with(line_color)),
            (Some(label), false) => format!("{} {}", label, text),
            (None, true) => text.with(line_color).to_string(),
            (None, false) => text,
        }
    }
}

/// Replaces control characters other than tab with `PLACEHOLDER`.
fn sanitize(line: &str) -> String {
    line.chars()
        .map(|c| if c.is_control() && c != '\t' { PLACEHOLDER } else { c })
        .collect()
}
