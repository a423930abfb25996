//! Progress-callback trait for per-page and per-image events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to observe a run
//! as pages finish formatting and images are written or skipped.
//!
//! Page events fire from the worker threads as each page finishes, so they
//! may arrive out of page order; image events fire as results are gathered.
//! Implementations must be `Send + Sync` and protect shared state with atomics
//! or a `Mutex`.
//!
//! # Example
//!
//! ```rust
//! use pdf_fmt::{PipelineConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pages: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _lines: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { pages: AtomicUsize::new(0) });
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn RunProgressCallback>)
//!     .build();
//! assert!(config.progress_callback.is_some());
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes pages and images.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait RunProgressCallback: Send + Sync {
    /// Called once after segmentation, before any page is formatted.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page has been filtered and rewrapped.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: number of page blocks in the document
    /// * `lines`      : output lines produced for the page (separator included)
    fn on_page_complete(&self, page_num: usize, total_pages: usize, lines: usize) {
        let _ = (page_num, total_pages, lines);
    }

    /// Called once the image stage knows how many candidates survived dedup.
    fn on_images_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called after an image has been re-encoded under its final name.
    fn on_image_written(&self, file_name: &str, size_bytes: usize) {
        let _ = (file_name, size_bytes);
    }

    /// Called when an image was skipped (unparseable name, decode error, …).
    fn on_image_skipped(&self, file_name: &str, reason: &str) {
        let _ = (file_name, reason);
    }

    /// Called once the text has been assembled.
    fn on_run_complete(&self, total_pages: usize, output_lines: usize) {
        let _ = (total_pages, output_lines);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;
