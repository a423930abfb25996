//! Image side channel: discovery, deduplication, re-encoding and renaming.
//!
//! ## Flow
//!
//! ```text
//! dir ──▶ discover (png/jpg/jpeg; .bmp deleted) ──▶ dedup (pHash)
//!     ──▶ sequence ids ──▶ re-encode + rename over a bounded pool
//! ```
//!
//! Extraction engines name dumped images `Im12.png`, `Image3.1.jpg` or
//! `doc-p004-1.png`. Only files following one of these conventions are
//! touched; anything else in the directory is left alone.
//!
//! Every per-image problem is isolated: it is logged, reported to the
//! progress callback and counted in [`ImageStats::skipped`].

use crate::config::PipelineConfig;
use crate::error::ImageError;
use crate::output::ImageStats;
use crate::pipeline::dedup::{self, file_name, PHasher, PerceptualHash, PerceptualHasher};
use crate::pipeline::dispatch;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Quality used for every lossy encode.
pub const JPEG_QUALITY: u8 = 90;

/// Extensions picked up by discovery, in enumeration order.
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

static ENGINE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:Image|Im)\d+(?:\.\d+)*\.|^\w+-p\d+-\d+\.").unwrap());
static COMPLEX_PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\s*p(\d+)-\d+\.").unwrap());
static SIMPLE_PAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:Image|Im)(\d+)(?:\.\d+)?(?:\.\d+)?\.").unwrap());

// ── Naming ───────────────────────────────────────────────────────────────────

/// `true` when `name` follows an extraction engine's naming convention.
pub fn is_engine_output(name: &str) -> bool {
    ENGINE_NAME.is_match(name)
}

/// Page number embedded in an extracted image's file name.
///
/// The `-p<page>-<n>.` form wins over `Im<page>.`. Leading zeros are removed;
/// an all-zero number becomes `"1"`.
pub fn parse_page_number(name: &str) -> Option<String> {
    let caps = COMPLEX_PAGE
        .captures(name)
        .or_else(|| SIMPLE_PAGE.captures(name))?;
    let digits = caps[1].trim_start_matches('0');
    Some(if digits.is_empty() {
        "1".to_string()
    } else {
        digits.to_string()
    })
}

/// `{doc_base}_{timestamp}_{page}.{seq}.{ext}`.
pub fn output_file_name(doc_base: &str, timestamp: &str, page: &str, sequence: usize, ext: &str) -> String {
    format!("{doc_base}_{timestamp}_{page}.{sequence}.{ext}")
}

/// File stem of the source document with spaces replaced by underscores.
pub fn document_base_name(doc_name: &str) -> String {
    Path::new(doc_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| doc_name.to_string())
        .replace(' ', "_")
}

/// Run timestamp in local time, `%m-%d_%H-%M-%S`.
pub fn run_timestamp() -> String {
    chrono::Local::now().format("%m-%d_%H-%M-%S").to_string()
}

// ── Discovery ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Discovery {
    /// Engine-named png/jpg/jpeg files in enumeration order.
    pub candidates: Vec<PathBuf>,
    /// Bitmap files deleted during discovery.
    pub bmp_discarded: usize,
}

/// Enumerate candidate images in `dir`.
///
/// Files are grouped by extension (`png`, `jpg`, `jpeg`, `bmp`); within a
/// group the directory's own enumeration order is kept. Every `.bmp` is
/// deleted regardless of its name.
pub fn discover_images(dir: &Path) -> std::io::Result<Discovery> {
    let mut files: Vec<(PathBuf, String)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        files.push((path, ext));
    }

    let mut discovery = Discovery::default();
    for wanted in IMAGE_EXTENSIONS {
        for (path, _) in files.iter().filter(|(_, ext)| ext == wanted) {
            let name = file_name(path);
            if wanted == "bmp" {
                info!("Discarding bitmap file: {} due to poor compression.", name);
                match std::fs::remove_file(path) {
                    Ok(()) => discovery.bmp_discarded += 1,
                    Err(e) => warn!("Could not delete bitmap {}: {}", name, e),
                }
                continue;
            }
            if is_engine_output(&name) {
                discovery.candidates.push(path.clone());
            } else {
                debug!("Ignoring non-engine image: {}", name);
            }
        }
    }
    Ok(discovery)
}

// ── Format selection ─────────────────────────────────────────────────────────

/// Output encodings the selector can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Parse a configured format name (`png`, `jpg`, `jpeg`; any case).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Encode in memory. PNG keeps alpha; JPEG is written from RGB at
    /// [`JPEG_QUALITY`].
    pub fn encode(self, img: &DynamicImage) -> image::ImageResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            OutputFormat::Png => img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?,
            OutputFormat::Jpeg => {
                let rgb = img.to_rgb8();
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))?;
            }
        }
        Ok(buf)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
        })
    }
}

/// Picks the first configured format whose encoding fits the size ceiling.
#[derive(Debug, Clone)]
pub struct FormatSelector {
    formats: Vec<OutputFormat>,
    fallback: OutputFormat,
    max_bytes: usize,
}

impl FormatSelector {
    /// Build from configured names. Unknown names are skipped with a warning;
    /// the fallback is the last configured entry, or JPEG when that entry is
    /// unknown.
    pub fn new(names: &[String], max_size_kb: u64) -> Self {
        let mut formats = Vec::with_capacity(names.len());
        for name in names {
            match OutputFormat::parse(name) {
                Some(f) => formats.push(f),
                None => warn!("Unsupported image format '{}' skipped", name),
            }
        }
        let fallback = names
            .last()
            .and_then(|n| OutputFormat::parse(n))
            .unwrap_or(OutputFormat::Jpeg);
        Self {
            formats,
            fallback,
            max_bytes: usize::try_from(max_size_kb.saturating_mul(1024)).unwrap_or(usize::MAX),
        }
    }

    /// Encode `img`, returning the chosen format and its bytes.
    pub fn select(&self, img: &DynamicImage) -> image::ImageResult<(OutputFormat, Vec<u8>)> {
        let mut last: Option<(OutputFormat, Vec<u8>)> = None;
        for &format in &self.formats {
            let bytes = format.encode(img)?;
            if bytes.len() <= self.max_bytes {
                return Ok((format, bytes));
            }
            info!(
                "Format {} ({}KB) exceeds {}KB. Trying next format...",
                format,
                bytes.len() / 1024,
                self.max_bytes / 1024
            );
            last = Some((format, bytes));
        }

        match last {
            Some((format, bytes)) if format == self.fallback => Ok((format, bytes)),
            _ => Ok((self.fallback, self.fallback.encode(img)?)),
        }
    }
}

// ── Rename stage ─────────────────────────────────────────────────────────────

/// A deduplicated image awaiting its final name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub path: PathBuf,
    /// Page parsed from the file name; `None` when neither convention matched.
    pub page: Option<String>,
    /// 1-based position among the survivors of this run.
    pub sequence: usize,
    pub hash: PerceptualHash,
}

/// Shared, read-only context for the rename workers.
#[derive(Debug)]
struct RenameContext {
    doc_base: String,
    timestamp: String,
    selector: FormatSelector,
}

#[derive(Debug)]
struct WrittenImage {
    file_name: String,
    size_bytes: usize,
}

fn rename_one(record: &ImageRecord, ctx: &RenameContext) -> Result<WrittenImage, ImageError> {
    let name = file_name(&record.path);
    let page = record
        .page
        .as_deref()
        .ok_or_else(|| ImageError::UnparseableName { name: name.clone() })?;

    let img = image::open(&record.path).map_err(|e| ImageError::DecodeFailed {
        name: name.clone(),
        detail: e.to_string(),
    })?;
    let (format, bytes) = ctx
        .selector
        .select(&img)
        .map_err(|e| ImageError::EncodeFailed {
            name: name.clone(),
            format: ctx.selector.fallback.to_string(),
            detail: e.to_string(),
        })?;

    let new_name = output_file_name(
        &ctx.doc_base,
        &ctx.timestamp,
        page,
        record.sequence,
        format.extension(),
    );
    let dir = record.path.parent().unwrap_or_else(|| Path::new("."));
    let new_path = dir.join(&new_name);
    std::fs::write(&new_path, &bytes).map_err(|e| ImageError::Io {
        name: new_name.clone(),
        source: e,
    })?;
    if new_path != record.path {
        std::fs::remove_file(&record.path).map_err(|e| ImageError::Io {
            name: name.clone(),
            source: e,
        })?;
    }

    debug!("{} -> {} ({} bytes, {})", name, new_name, bytes.len(), format);
    Ok(WrittenImage {
        file_name: new_name,
        size_bytes: bytes.len(),
    })
}

/// Deduplicate and rename the images an extraction engine dumped into `dir`.
///
/// `doc_name` is the source document's file name; its stem prefixes every
/// output file. Never fails: directory problems are logged and yield empty
/// statistics.
pub async fn process_images(dir: &Path, doc_name: &str, config: &PipelineConfig) -> ImageStats {
    process_images_with(dir, doc_name, config, Arc::new(PHasher::default())).await
}

/// [`process_images`] with a caller-supplied perceptual hasher.
pub async fn process_images_with(
    dir: &Path,
    doc_name: &str,
    config: &PipelineConfig,
    hasher: Arc<dyn PerceptualHasher>,
) -> ImageStats {
    let mut stats = ImageStats::default();

    // ── Step 1: Discover ─────────────────────────────────────────────────
    let discovery = match discover_images(dir) {
        Ok(d) => d,
        Err(e) => {
            warn!("Cannot read image directory {}: {}", dir.display(), e);
            return stats;
        }
    };
    stats.discovered = discovery.candidates.len();
    stats.bmp_discarded = discovery.bmp_discarded;
    if discovery.candidates.is_empty() {
        info!("No extracted images to process in {}", dir.display());
        return stats;
    }

    // ── Step 2: Deduplicate ──────────────────────────────────────────────
    let workers = dispatch::pool_size(config.workers, discovery.candidates.len());
    let outcome = dedup::deduplicate(
        discovery.candidates,
        config.images.similarity_threshold,
        workers,
        hasher,
    )
    .await;
    stats.duplicates_discarded = outcome.discarded.len();
    stats.unhashable = outcome.unhashable.len();

    // ── Step 3: Assign sequence ids ──────────────────────────────────────
    let records: Arc<[ImageRecord]> = outcome
        .kept
        .into_iter()
        .enumerate()
        .map(|(i, kept)| ImageRecord {
            page: parse_page_number(&file_name(&kept.path)),
            path: kept.path,
            sequence: i + 1,
            hash: kept.hash,
        })
        .collect();

    if let Some(ref cb) = config.progress_callback {
        cb.on_images_start(records.len());
    }

    // ── Step 4: Re-encode and rename ─────────────────────────────────────
    let ctx = Arc::new(RenameContext {
        doc_base: document_base_name(doc_name),
        timestamp: run_timestamp(),
        selector: FormatSelector::new(&config.images.formats, config.images.max_size_kb),
    });
    let workers = dispatch::pool_size(config.workers, records.len());
    info!(
        "Processing {} images with {} workers",
        records.len(),
        workers
    );

    let worker_ctx = Arc::clone(&ctx);
    let results = dispatch::map_ordered(Arc::clone(&records), workers, move |record: &ImageRecord| {
        rename_one(record, &worker_ctx)
    })
    .await;

    for (record, result) in records.iter().zip(results) {
        match result {
            Ok(written) => {
                stats.written += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_written(&written.file_name, written.size_bytes);
                }
            }
            Err(e) => {
                warn!("Failed to process image. Skipping. {}", e);
                stats.skipped += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_image_skipped(&file_name(&record.path), &e.to_string());
                }
            }
        }
    }

    info!(
        "Images: {} written, {} skipped, {} duplicates, {} bitmaps discarded",
        stats.written, stats.skipped, stats.duplicates_discarded, stats.bmp_discarded
    );
    stats
}
