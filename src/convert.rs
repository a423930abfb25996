//! Top-level entry points: extract, format, and optionally collect images.
//!
//! ## Why split `format_text` from `convert`?
//!
//! Everything after extraction is pure text processing. [`format_text`] takes
//! a [`RawText`] directly so callers with text from another engine (or tests)
//! run exactly the same filter, reflow and enclosure stages without a PDF.

use crate::config::PipelineConfig;
use crate::error::FmtError;
use crate::output::{FormattedOutput, PageOutput, RunStats};
use crate::pipeline::filter::LineFilters;
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::page::PageFormatter;
use crate::pipeline::postprocess::PostProcessor;
use crate::pipeline::segment::{PageBlock, RawText};
use crate::pipeline::spelling::{self, SpellingNormalizer};
use crate::pipeline::{dispatch, images};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Format already-extracted text.
///
/// # Errors
/// Only [`FmtError::SpellingUnavailable`], when a configured dictionary file
/// cannot be read. Bad patterns are skipped with a warning instead.
pub async fn format_text(raw: &RawText, config: &PipelineConfig) -> Result<FormattedOutput, FmtError> {
    let start = Instant::now();

    // ── Step 1: Build per-run collaborators ──────────────────────────────
    let dictionary = spelling::select_dictionary(config)?;
    let normalizer = SpellingNormalizer::new(
        config.spelling_locale,
        &config.ignore_locale_strings,
        dictionary,
    );
    let formatter = PageFormatter::new(config, LineFilters::compile(config), normalizer);
    let enclosures = PostProcessor::new(&config.regex_enclosures);

    // ── Step 2: Segment into pages ───────────────────────────────────────
    let blocks = raw.pages();
    let total_pages = blocks.len();
    let formatted_pages = blocks.iter().filter(|b| !b.is_blank()).count();
    debug!("Segmented text into {} page blocks", total_pages);
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total_pages);
    }

    // ── Step 3: Format pages in parallel ─────────────────────────────────
    let workers = dispatch::pool_size(config.workers, total_pages);
    info!("Formatting {} pages with {} workers", total_pages, workers);
    let progress = config.progress_callback.clone();
    let blocks: Arc<[PageBlock]> = blocks.into();
    let pages: Vec<PageOutput> = dispatch::map_ordered(blocks, workers, move |block: &PageBlock| {
        let page = formatter.format_page(block);
        if let Some(ref cb) = progress {
            cb.on_page_complete(page.index + 1, total_pages, page.lines.len());
        }
        page
    })
    .await;

    // ── Step 4: Join and apply enclosures ────────────────────────────────
    let lines: Vec<String> = pages.iter().flat_map(|p| p.lines.iter().cloned()).collect();
    let text = enclosures.apply(&lines);

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let stats = RunStats {
        total_pages,
        formatted_pages,
        output_lines: lines.len(),
        dropped_footers: pages.iter().map(|p| p.dropped_footers).sum(),
        workers,
        total_duration_ms: start.elapsed().as_millis() as u64,
        extract_duration_ms: 0,
        images: None,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total_pages, stats.output_lines);
    }

    Ok(FormattedOutput { text, pages, stats })
}

/// Extract and format a PDF or text file.
///
/// # Errors
/// Fatal errors only: the input cannot be opened or classified, extraction
/// failed, images were requested from a backend that cannot provide them,
/// or a configured spelling dictionary is unreadable. No partial text is
/// returned.
pub async fn convert(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<FormattedOutput, FmtError> {
    let total_start = Instant::now();
    info!("Starting run: {}", path.as_ref().display());

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(path)?;
    let extractor = resolved.kind.extractor();
    if config.images.extract && !extractor.supports_images() {
        return Err(FmtError::EngineUnavailable(format!(
            "image extraction was requested but the {} backend cannot extract images",
            extractor.name()
        )));
    }

    // ── Step 2: Extract raw text ─────────────────────────────────────────
    let extract_start = Instant::now();
    let raw = {
        let extractor = extractor.clone();
        let source = resolved.path.clone();
        tokio::task::spawn_blocking(move || extractor.extract_raw_text(&source))
            .await
            .map_err(|e| FmtError::Internal(format!("extraction task panicked: {}", e)))??
    };
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} chars with {} in {}ms",
        raw.blob.len(),
        extractor.name(),
        extract_duration_ms
    );

    // ── Step 3: Format ───────────────────────────────────────────────────
    let mut output = format_text(&raw, config).await?;
    output.stats.extract_duration_ms = extract_duration_ms;

    // ── Step 4: Images ───────────────────────────────────────────────────
    if config.images.extract {
        let dir = image_dir(&resolved, config);
        let source = resolved.path.clone();
        let target = dir.clone();
        let worker = extractor.clone();
        match tokio::task::spawn_blocking(move || worker.extract_images(&source, &target)).await {
            Ok(Ok(n)) => debug!("{} raw images extracted", n),
            Ok(Err(e)) => warn!("Image extraction failed: {}", e),
            Err(e) => warn!("Image extraction task panicked: {}", e),
        }
        let doc_name = resolved
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| resolved.stem());
        output.stats.images = Some(images::process_images(&dir, &doc_name, config).await);
    }

    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Run complete: {}/{} pages, {} lines, {}ms total",
        output.stats.formatted_pages,
        output.stats.total_pages,
        output.stats.output_lines,
        output.stats.total_duration_ms
    );
    Ok(output)
}

/// Where extracted images go: the configured directory, else
/// `<stem>_images` next to the input.
fn image_dir(resolved: &ResolvedInput, config: &PipelineConfig) -> PathBuf {
    if let Some(dir) = &config.images.output_dir {
        return dir.clone();
    }
    let parent = resolved.path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}_images", resolved.stem()))
}

/// Convert and write the text to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<RunStats, FmtError> {
    let output = convert(path, config).await?;
    let out = output_path.as_ref();

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FmtError::OutputWriteFailed {
                path: out.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = out.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, &output.text)
        .await
        .map_err(|e| FmtError::OutputWriteFailed {
            path: out.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, out)
        .await
        .map_err(|e| FmtError::OutputWriteFailed {
            path: out.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<FormattedOutput, FmtError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FmtError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(path, config))
}
