//! Page segmentation of the raw extracted text.

use crate::config::DEFAULT_PAGE_BREAK;

/// One page of raw text and its 0-based position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBlock {
    pub index: usize,
    pub content: String,
}

impl PageBlock {
    pub fn new(index: usize, content: impl Into<String>) -> Self {
        Self {
            index,
            content: content.into(),
        }
    }

    /// `true` when the block holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Raw text as produced by an extraction backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText {
    pub blob: String,
    pub page_break: char,
}

impl RawText {
    /// Text using the default form-feed page break.
    pub fn new(blob: impl Into<String>) -> Self {
        Self {
            blob: blob.into(),
            page_break: DEFAULT_PAGE_BREAK,
        }
    }

    pub fn with_page_break(blob: impl Into<String>, page_break: char) -> Self {
        Self {
            blob: blob.into(),
            page_break,
        }
    }

    pub fn pages(&self) -> Vec<PageBlock> {
        split_pages(&self.blob, self.page_break)
    }
}

/// Split `blob` on `marker` into ordered page blocks.
///
/// Blank pages in the middle are kept so block indices match page
/// positions. A whitespace-only tail after the final marker is a terminator,
/// not a page, and is dropped.
pub fn split_pages(blob: &str, marker: char) -> Vec<PageBlock> {
    let mut blocks: Vec<PageBlock> = blob
        .split(marker)
        .enumerate()
        .map(|(index, content)| PageBlock::new(index, content))
        .collect();
    if blocks.len() > 1 && blocks.last().is_some_and(PageBlock::is_blank) {
        blocks.pop();
    }
    blocks
}
