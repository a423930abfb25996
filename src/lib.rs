//! # pdf-fmt
//!
//! Extract text from a PDF and turn it into clean, reflowed plain text.
//!
//! ## Why this crate?
//!
//! Raw text from a PDF engine is noisy: page numbers and running footers are
//! interleaved with the body, hard line breaks follow the original column
//! width, and stray glyphs from ligatures or symbol fonts leak through. This
//! crate filters every line against an allow-list, drops footers, rejoins
//! broken sentences, rewraps to a target width and optionally normalises
//! US/UK spelling. Embedded images can be extracted alongside, with
//! near-duplicates removed and the survivors renamed by page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / .txt
//!  │
//!  ├─ 1. Input     validate the path and pick a backend
//!  ├─ 2. Extract   page-delimited raw text via pdfium (spawn_blocking)
//!  ├─ 3. Segment   split on the page-break marker
//!  ├─ 4. Format    per page, in parallel: filter → footer → lint → reflow
//!  ├─ 5. Enclose   join pages and apply regex enclosure rules
//!  └─ 6. Images    optional: dedup by perceptual hash, re-encode, rename
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_fmt::{convert, PipelineConfig, SpellingLocale};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .footer_regexes(vec![r"\d+\s*$".to_string()])
//!         .spelling_locale(SpellingLocale::EnUk)
//!         .build();
//!     let output = convert("document.pdf", &config).await?;
//!     println!("{}", output.text);
//!     eprintln!("{} lines from {} pages", output.stats.output_lines, output.stats.total_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-fmt` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-fmt = { version = "0.6", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! PDF input needs the pdfium shared library at runtime. It is looked up via
//! `PDFIUM_LIB_PATH` first, then on the system library path. Plain `.txt`
//! input (pages separated by form feeds) works without it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod settings;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    EnclosureRule, ImageOptions, PageSeparator, PipelineConfig, PipelineConfigBuilder, SpellingLocale,
};
pub use convert::{convert, convert_sync, convert_to_file, format_text};
pub use error::{FmtError, ImageError};
pub use output::{FormattedOutput, ImageStats, PageOutput, RunStats};
pub use pipeline::extract::{PdfiumExtractor, PlainTextExtractor, TextExtractor};
pub use pipeline::images::process_images;
pub use pipeline::segment::RawText;
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use settings::{find_config_file, load_config, ConfigCache};
