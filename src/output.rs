//! Result types returned by the formatting and image entry points.
//!
//! Everything here is `Serialize` so the CLI can emit it with `--json`.

use serde::{Deserialize, Serialize};

/// Output of one page block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOutput {
    /// 0-based position of the block in the extracted text.
    pub index: usize,
    /// Wrapped lines, preceded by the page separator when one applies.
    pub lines: Vec<String>,
    /// Raw lines dropped because they matched a footer pattern.
    pub dropped_footers: usize,
}

impl PageOutput {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Counters for one image stage run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStats {
    /// Files accepted by discovery (extension and naming convention).
    pub discovered: usize,
    /// `.bmp` files deleted before deduplication.
    pub bmp_discarded: usize,
    /// Near-duplicates deleted by the perceptual-hash pass.
    pub duplicates_discarded: usize,
    /// Candidates whose hash could not be computed; left untouched.
    pub unhashable: usize,
    /// Images re-encoded under their final name.
    pub written: usize,
    /// Images skipped during renaming (unparseable name, encode or I/O error).
    pub skipped: usize,
}

/// Statistics for a formatting run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Page blocks found in the extracted text.
    pub total_pages: usize,
    /// Blocks holding any non-whitespace text.
    pub formatted_pages: usize,
    /// Lines in the final text (separators included).
    pub output_lines: usize,
    /// Raw lines removed by the footer filter.
    pub dropped_footers: usize,
    /// Worker-pool size used for the page stage.
    pub workers: usize,
    /// Wall-clock time for the whole run.
    pub total_duration_ms: u64,
    /// Time spent in extraction (0 for [`crate::format_text`]).
    pub extract_duration_ms: u64,
    /// Present when the image stage ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<ImageStats>,
}

/// Complete result of a formatting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedOutput {
    /// Newline-joined document after enclosure rules.
    pub text: String,
    /// Per-page results in page order.
    pub pages: Vec<PageOutput>,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_stats_omitted_when_absent() {
        let stats = RunStats::default();
        let json = serde_json::to_string(&stats).unwrap();
        assert!(!json.contains("images"));

        let stats = RunStats {
            images: Some(ImageStats {
                written: 2,
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["images"]["written"], 2);
    }

    #[test]
    fn default_page_output_is_empty() {
        let page = PageOutput::default();
        assert_eq!(page.index, 0);
        assert!(page.is_empty());
    }
}
