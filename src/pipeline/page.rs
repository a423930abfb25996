//! Per-page formatting: filter chain, accumulation and wrapping.
//!
//! A [`PageFormatter`] holds everything a worker needs to turn one
//! [`PageBlock`] into output lines. It is built once per run and cloned into
//! each task; all of its parts are immutable.

use crate::config::{PageSeparator, PipelineConfig};
use crate::output::PageOutput;
use crate::pipeline::filter::{format_indented_line, LineFilters};
use crate::pipeline::rewrap::LineAccumulator;
use crate::pipeline::segment::PageBlock;
use crate::pipeline::spelling::SpellingNormalizer;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct PageFormatter {
    filters: LineFilters,
    spelling: SpellingNormalizer,
    min_chars: usize,
    max_chars: usize,
    enforce_cap: bool,
    separator: PageSeparator,
}

impl PageFormatter {
    pub fn new(config: &PipelineConfig, filters: LineFilters, spelling: SpellingNormalizer) -> Self {
        Self {
            filters,
            spelling,
            min_chars: config.min_chars_per_line,
            max_chars: config.max_chars_per_line,
            enforce_cap: config.enforce_capitalization,
            separator: config.page_separator.clone(),
        }
    }

    /// Format one page block.
    ///
    /// Every page after the first gets its separator, even when nothing
    /// else survives.
    pub fn format_page(&self, block: &PageBlock) -> PageOutput {
        let mut acc = LineAccumulator::new(self.min_chars, self.max_chars, self.enforce_cap);
        let mut dropped_footers = 0;
        for raw in block.content.lines() {
            let filtered = self.filters.filter_line_content(raw);
            if self.filters.is_footer(&filtered) {
                trace!("Footer dropped on page {}: {:?}", block.index + 1, filtered);
                dropped_footers += 1;
                continue;
            }
            if let Some(line) = self.clean_filtered(&filtered) {
                acc.push(&line);
            }
        }

        let mut lines: Vec<String> = self.separator.render(block.index).into_iter().collect();
        lines.extend(acc.finish());

        PageOutput {
            index: block.index,
            lines,
            dropped_footers,
        }
    }

    /// Spelling, whitespace collapse and list conversion. `None` when the
    /// line ends up empty.
    fn clean_filtered(&self, filtered: &str) -> Option<String> {
        let cleaned = self.spelling.clean_and_lint(filtered);
        let formatted = format_indented_line(&cleaned);
        (!formatted.trim().is_empty()).then_some(formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpellingLocale;
    use crate::pipeline::spelling::VariantTable;
    use std::sync::Arc;

    const FOOTER_REGEXES: &[&str] = &[
        r"^\s*\d+\s*$",
        r"^.*\s*[A-Za-z]+\d+\s.*$",
        r"^.*\d+S\d+[vV]\d+.*$",
        r"^.*Copyright.*$",
        r"^.*Official.*$",
        r"^.*Private.*$",
        r"^.*All rights reserved.*$",
        r"^.*(?:AY\s?)?\d{4}.*$",
        r"^.*v\d\.\d$",
        r"^Page\s\d.*$",
    ];

    fn formatter(builder: crate::config::PipelineConfigBuilder) -> PageFormatter {
        let config = builder
            .footer_regexes(FOOTER_REGEXES.iter().map(|s| s.to_string()).collect())
            .spelling_locale(SpellingLocale::EnUs)
            .build();
        let filters = LineFilters::compile(&config);
        let spelling = SpellingNormalizer::new(
            config.spelling_locale,
            &config.ignore_locale_strings,
            Arc::new(VariantTable::builtin()),
        );
        PageFormatter::new(&config, filters, spelling)
    }

    fn literal() -> crate::config::PipelineConfigBuilder {
        PipelineConfig::builder().page_separator(PageSeparator::Literal("___".into()))
    }

    #[test]
    fn footer_lines_are_excluded() {
        let f = formatter(literal());
        let block = PageBlock::new(
            0,
            "Normal line.\nPage 5 out of 10.\nIT1234 - Module Code\n\n25\n\nCopyright 2024",
        );
        let out = f.format_page(&block);
        assert_eq!(out.lines, vec!["Normal line."]);
        assert_eq!(out.dropped_footers, 4);
    }

    #[test]
    fn separator_modes() {
        let block = PageBlock::new(1, "Content");

        let out = formatter(literal()).format_page(&block);
        assert_eq!(out.lines[0], "___");

        let out = formatter(PipelineConfig::builder().page_separator(PageSeparator::Numbered))
            .format_page(&block);
        assert_eq!(out.lines[0], "--- Page 2 ---");

        let out = formatter(PipelineConfig::builder().page_separator(PageSeparator::None))
            .format_page(&block);
        assert_eq!(out.lines, vec!["Content"]);
    }

    #[test]
    fn first_page_has_no_separator() {
        let out = formatter(literal()).format_page(&PageBlock::new(0, "Content"));
        assert_eq!(out.lines, vec!["Content"]);
    }

    #[test]
    fn blank_block_keeps_its_separator() {
        let out = formatter(literal()).format_page(&PageBlock::new(4, " \n\t\n"));
        assert_eq!(out.lines, vec!["___"]);
        assert_eq!(out.index, 4);

        let out = formatter(PipelineConfig::builder().page_separator(PageSeparator::Numbered))
            .format_page(&PageBlock::new(1, "   \n"));
        assert_eq!(out.lines, vec!["--- Page 2 ---"]);
    }

    #[test]
    fn blank_first_block_yields_nothing() {
        let out = formatter(literal()).format_page(&PageBlock::new(0, "  \n"));
        assert!(out.is_empty());
    }

    #[test]
    fn min_chars_controls_joining() {
        let block = PageBlock::new(0, "Line One (Long)\nShort\nLine Three (Long)");

        let out = formatter(literal().min_chars_per_line(0)).format_page(&block);
        assert_eq!(out.lines.len(), 3);

        let out = formatter(literal().min_chars_per_line(20)).format_page(&block);
        assert_eq!(out.lines, vec!["Line One (Long) Short Line Three (Long)"]);
    }

    #[test]
    fn max_chars_controls_wrapping() {
        let block = PageBlock::new(
            0,
            "A very long sentence that will be split if max_chars is set to a small value.",
        );
        let out = formatter(literal().max_chars_per_line(0)).format_page(&block);
        assert_eq!(out.lines.len(), 1);
        let out = formatter(literal().max_chars_per_line(30)).format_page(&block);
        assert!(out.lines.len() > 1);
    }

    #[test]
    fn capitalization_toggle() {
        let block = PageBlock::new(0, "line one starts with lower case.");
        let out = formatter(literal().max_chars_per_line(100)).format_page(&block);
        assert_eq!(out.lines, vec!["line one starts with lower case."]);
        let out = formatter(literal().max_chars_per_line(100).enforce_capitalization(true))
            .format_page(&block);
        assert_eq!(out.lines, vec!["Line one starts with lower case."]);
    }

    #[test]
    fn restrictive_allow_list_then_join() {
        let block = PageBlock::new(0, "Line 1: 100!\nLine 2: 200.");
        let out = formatter(
            literal()
                .allowed_chars_regex(r"[a-zA-Z0-9\s]+")
                .min_chars_per_line(50),
        )
        .format_page(&block);
        assert_eq!(out.lines, vec!["Line 1 100 Line 2 200"]);
    }

    #[test]
    fn spelling_is_applied_per_line() {
        let block = PageBlock::new(0, "The colour of the Centre.");
        let out = formatter(literal()).format_page(&block);
        assert_eq!(out.lines, vec!["The color of the Center."]);
    }
}
