//! Document post-processing: join the formatted lines and apply the
//! configured enclosure rules.
//!
//! ## Rule order
//!
//! Rules run one after another over the already-modified text, so an earlier
//! rule's wrapper characters are visible to every later rule. With the rules
//! `[(\[.*?\], "`"), (TODO, "!"), (one, "*")]` the line
//! `Line one [1, 2, 3]` becomes ``Line *one* `[1, 2, 3]` ``; swapping the order
//! changes the result. This is intentional and the order in the config file
//! is the order applied.

use crate::config::EnclosureRule;
use regex::{Captures, Regex, RegexBuilder};
use tracing::{debug, warn};

/// One compiled enclosure rule.
#[derive(Debug, Clone)]
struct Enclosure {
    pattern: Regex,
    wrapper: String,
}

/// Compiled enclosure rules, applied in order.
#[derive(Debug, Clone, Default)]
pub struct PostProcessor {
    enclosures: Vec<Enclosure>,
}

impl PostProcessor {
    /// Compile `rules` case-insensitively.
    ///
    /// A rule with an empty pattern or wrapper, or with a pattern that does
    /// not compile, is skipped with a warning; the remaining rules still apply.
    pub fn new(rules: &[EnclosureRule]) -> Self {
        let mut enclosures = Vec::with_capacity(rules.len());
        for rule in rules {
            if rule.pattern.is_empty() || rule.wrapper.is_empty() {
                warn!(
                    "Enclosure rule skipped: pattern and wrapper are both required (pattern={:?}, wrapper={:?})",
                    rule.pattern, rule.wrapper
                );
                continue;
            }
            match RegexBuilder::new(&rule.pattern).case_insensitive(true).build() {
                Ok(pattern) => enclosures.push(Enclosure {
                    pattern,
                    wrapper: rule.wrapper.clone(),
                }),
                Err(e) => warn!(
                    "Invalid enclosure regex pattern '{}' skipped. Error: {}",
                    rule.pattern, e
                ),
            }
        }
        debug!("Compiled {}/{} enclosure rules", enclosures.len(), rules.len());
        Self { enclosures }
    }

    /// Number of rules that will be applied.
    pub fn rule_count(&self) -> usize {
        self.enclosures.len()
    }

    /// Join `lines` with `\n` and apply every enclosure rule to the result.
    pub fn apply(&self, lines: &[String]) -> String {
        let joined = lines.join("\n");
        self.enclose(&joined)
    }

    /// Apply the enclosure rules to already-joined text.
    pub fn enclose(&self, text: &str) -> String {
        self.enclosures
            .iter()
            .fold(text.to_string(), |acc, rule| wrap_matches(&acc, rule))
    }
}

// ── Enclosure ────────────────────────────────────────────────────────────────

/// Surround every non-overlapping match with the rule's wrapper.
///
/// A closure replacement keeps `$` in the wrapper literal.
fn wrap_matches(text: &str, rule: &Enclosure) -> String {
    rule.pattern
        .replace_all(text, |caps: &Captures<'_>| {
            format!("{w}{m}{w}", w = rule.wrapper, m = &caps[0])
        })
        .into_owned()
}
