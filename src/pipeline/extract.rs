//! Text and image extraction backends.
//!
//! ## Why spawn_blocking?
//!
//! Backends are synchronous. pdfium wraps a C++ library with thread-local
//! state that must not be driven from async worker threads, so callers run
//! every [`TextExtractor`] method inside `tokio::task::spawn_blocking`.
//!
//! Two backends exist: [`PdfiumExtractor`] for PDF files and
//! [`PlainTextExtractor`] for text that was already extracted elsewhere
//! (pages separated by form feeds).

use crate::config::DEFAULT_PAGE_BREAK;
use crate::error::FmtError;
use crate::pipeline::segment::RawText;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// A source of page-delimited raw text and, optionally, embedded images.
pub trait TextExtractor: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Extract the whole document as one blob with a page-break marker.
    fn extract_raw_text(&self, path: &Path) -> Result<RawText, FmtError>;

    /// Whether [`TextExtractor::extract_images`] is implemented.
    fn supports_images(&self) -> bool {
        false
    }

    /// Dump embedded images into `out_dir`; returns how many were written.
    fn extract_images(&self, path: &Path, out_dir: &Path) -> Result<usize, FmtError> {
        let _ = (path, out_dir);
        Err(FmtError::EngineUnavailable(format!(
            "the {} backend cannot extract images",
            self.name()
        )))
    }
}

// ── Plain text ───────────────────────────────────────────────────────────────

/// Reads a text file whose pages are separated by form feeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extract_raw_text(&self, path: &Path) -> Result<RawText, FmtError> {
        let bytes = std::fs::read(path).map_err(|e| FmtError::ExtractionFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let blob = String::from_utf8_lossy(&bytes).into_owned();
        debug!("Read {} bytes of text from {}", bytes.len(), path.display());
        Ok(RawText::with_page_break(blob, DEFAULT_PAGE_BREAK))
    }
}

// ── pdfium ───────────────────────────────────────────────────────────────────

/// In-process PDF backend built on pdfium.
///
/// The library is bound on every call: from `library_path` when set, else
/// from `PDFIUM_LIB_PATH`, else from the system search path.
#[derive(Debug, Default, Clone)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, FmtError> {
        let explicit = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => {
                debug!("Binding pdfium from {}", path.display());
                Pdfium::bind_to_library(&path).map_err(|e| {
                    FmtError::EngineUnavailable(format!(
                        "cannot load pdfium from '{}': {:?}",
                        path.display(),
                        e
                    ))
                })?
            }
            None => Pdfium::bind_to_system_library().map_err(|e| {
                FmtError::EngineUnavailable(format!(
                    "pdfium library not found ({:?}). Install it or set {}",
                    e, PDFIUM_LIB_PATH_ENV
                ))
            })?,
        };
        Ok(Pdfium::new(bindings))
    }

    fn open<'a>(&self, pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, FmtError> {
        pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| FmtError::ExtractionFailed {
                path: path.to_path_buf(),
                detail: format!("{:?}", e),
            })
    }
}

impl TextExtractor for PdfiumExtractor {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn extract_raw_text(&self, path: &Path) -> Result<RawText, FmtError> {
        let pdfium = self.bind()?;
        let document = self.open(&pdfium, path)?;
        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        // Every page, the last included, ends with the marker.
        let mut blob = String::new();
        for (idx, page) in pages.iter().enumerate() {
            let text = page.text().map_err(|e| FmtError::ExtractionFailed {
                path: path.to_path_buf(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
            blob.push_str(&text.all());
            blob.push(DEFAULT_PAGE_BREAK);
        }
        Ok(RawText::with_page_break(blob, DEFAULT_PAGE_BREAK))
    }

    fn supports_images(&self) -> bool {
        true
    }

    /// Writes every image object as `img-p{page}-{n}.png` (both 1-based).
    ///
    /// An image that cannot be decoded or written is skipped with a warning.
    fn extract_images(&self, path: &Path, out_dir: &Path) -> Result<usize, FmtError> {
        let pdfium = self.bind()?;
        let document = self.open(&pdfium, path)?;
        std::fs::create_dir_all(out_dir).map_err(|e| FmtError::OutputWriteFailed {
            path: out_dir.to_path_buf(),
            source: e,
        })?;

        let mut written = 0;
        for (idx, page) in document.pages().iter().enumerate() {
            let page_num = idx + 1;
            let mut n = 0;
            for object in page.objects().iter() {
                let Some(image_object) = object.as_image_object() else {
                    continue;
                };
                n += 1;
                let name = format!("img-p{page_num:03}-{n}.png");
                let img = match image_object.get_raw_image() {
                    Ok(img) => img,
                    Err(e) => {
                        warn!("Skipping {}: {:?}", name, e);
                        continue;
                    }
                };
                match img.save(out_dir.join(&name)) {
                    Ok(()) => written += 1,
                    Err(e) => warn!("Could not write {}: {}", name, e),
                }
            }
        }
        info!("Extracted {} images into {}", written, out_dir.display());
        Ok(written)
    }
}
