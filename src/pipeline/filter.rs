//! Per-line filters: character allow-list, footer exclusion and
//! indentation-to-list conversion.
//!
//! [`LineFilters`] is compiled once from the pattern strings in
//! [`PipelineConfig`] and cloned into every page worker. `regex::Regex` clones
//! share the compiled program, so a clone is cheap and each worker owns an
//! independent, immutable copy.
//!
//! Footer patterns are anchored: a line is a footer only when a pattern matches
//! at position 0 of the trimmed line, never when the footer text merely appears
//! somewhere inside it.

use crate::config::{PipelineConfig, DEFAULT_CHARS_REGEX};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

const NBSP: char = '\u{00A0}';

static DEFAULT_ALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(DEFAULT_CHARS_REGEX).unwrap());

/// Compiled allow-list and footer patterns.
#[derive(Debug, Clone)]
pub struct LineFilters {
    allowed_chars: Regex,
    footers: Vec<Regex>,
}

impl LineFilters {
    /// Compile the filters described by `config`.
    ///
    /// An invalid allow-list falls back to [`DEFAULT_CHARS_REGEX`]; invalid
    /// footer patterns are skipped. Each problem is logged once.
    pub fn compile(config: &PipelineConfig) -> Self {
        let allowed_chars = match Regex::new(&config.allowed_chars_regex) {
            Ok(re) => re,
            Err(e) => {
                warn!(
                    "Invalid allowed_chars_regex '{}': {}. Using default character set.",
                    config.allowed_chars_regex, e
                );
                DEFAULT_ALLOWED_CHARS.clone()
            }
        };

        Self {
            allowed_chars,
            footers: compile_footer_patterns(&config.footer_regexes),
        }
    }

    /// Number of footer patterns that compiled.
    pub fn footer_count(&self) -> usize {
        self.footers.len()
    }

    /// Keep only allowed character runs, joined by single spaces and trimmed.
    pub fn filter_line_content(&self, line: &str) -> String {
        let runs: Vec<&str> = self
            .allowed_chars
            .find_iter(line)
            .map(|m| m.as_str())
            .collect();
        runs.join(" ").trim().to_string()
    }

    /// `true` when the trimmed line starts with a match of any footer pattern.
    pub fn is_footer(&self, line: &str) -> bool {
        let cleaned = line.trim();
        if cleaned.is_empty() {
            return false;
        }
        self.footers.iter().any(|re| re.is_match(cleaned))
    }
}

/// Compile footer pattern strings, case-insensitive and anchored at the start.
///
/// Patterns that fail to compile are skipped with a warning.
pub fn compile_footer_patterns(patterns: &[String]) -> Vec<Regex> {
    let mut compiled = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let anchored = format!("^(?:{pattern})");
        match RegexBuilder::new(&anchored).case_insensitive(true).build() {
            Ok(re) => compiled.push(re),
            Err(e) => warn!("Invalid regex pattern '{}' skipped. Error: {}", pattern, e),
        }
    }
    debug!("Compiled {}/{} footer patterns", compiled.len(), patterns.len());
    compiled
}

/// Turn a single-space indented line into a `- ` list item.
///
/// Non-breaking spaces count as spaces. Lines indented by two or more spaces,
/// unindented lines, and lines already carrying a `-`/`*` marker are returned
/// unchanged (apart from the NBSP normalisation).
pub fn format_indented_line(line: &str) -> String {
    let normalized = line.replace(NBSP, " ");
    if let Some(rest) = normalized.strip_prefix(' ') {
        let already_list = rest.trim_start().starts_with(['-', '*']);
        if !rest.starts_with(' ') && !already_list {
            return format!("- {rest}");
        }
    }
    normalized
}
