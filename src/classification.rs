//! Severity classification of raw log lines.
//!
//! Each source carries an ordered list of `(severity, pattern)` pairs. A line
//! is classified by the first pattern that matches it, case-insensitively.

use crate::{
    config::{PatternConfig, PatternKind, SourceConfig},
    core::Severity,
    error::ConfigError,
};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// A single compiled `(severity, pattern)` pair.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub severity: Severity,
    matcher: Regex,
}

impl ClassificationRule {
    /// Compiles a pattern. Literal patterns are escaped so that tags such as
    /// `[error]` are matched as plain text.
    pub fn compile(pattern: &PatternConfig) -> Result<Self, regex::Error> {
        let source = match pattern.kind {
            PatternKind::Literal => regex::escape(&pattern.pattern),
            PatternKind::Regex => pattern.pattern.clone(),
        };
        let matcher = RegexBuilder::new(&source).case_insensitive(true).build()?;
        Ok(Self {
            severity: pattern.severity,
            matcher,
        })
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.matcher.is_match(line)
    }
}

/// The compiled rules of one source.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Returns the severity of the first matching rule, or `Unclassified`.
    pub fn classify(&self, line: &str) -> Severity {
        self.rules
            .iter()
            .find(|rule| rule.is_match(line))
            .map(|rule| rule.severity)
            .unwrap_or(Severity::Unclassified)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Rule sets for every configured source. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    by_source: HashMap<String, RuleSet>,
}

impl Classifier {
    /// Compiles the patterns of every source.
    pub fn from_sources(sources: &[SourceConfig]) -> Result<Self, ConfigError> {
        let mut by_source = HashMap::with_capacity(sources.len());
        for source in sources {
            let rules = source
                .patterns
                .iter()
                .map(|p| {
                    ClassificationRule::compile(p).map_err(|e| ConfigError::InvalidPattern {
                        source_name: source.name.clone(),
                        pattern: p.pattern.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            by_source.insert(source.name.clone(), RuleSet::new(rules));
        }
        Ok(Self { by_source })
    }

    /// Classifies a line from the named source. Unknown sources have no
    /// rules, so their lines are `Unclassified`.
    pub fn classify(&self, source: &str, line: &str) -> Severity {
        self.by_source
            .get(source)
            .map(|rules| rules.classify(line))
            .unwrap_or(Severity::Unclassified)
    }
}
