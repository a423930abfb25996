//! Error types for the pdf-fmt library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`FmtError`]: **Fatal**: the run cannot produce output at all (input
//!   missing, extraction engine failed, an explicitly requested collaborator
//!   is unavailable). Returned as `Err(FmtError)` from the top-level
//!   `convert*` functions; no partial text is emitted.
//!
//! * [`ImageError`]: **Non-fatal**: one extracted image could not be
//!   processed (unparseable file name, decode or encode failure). The image is
//!   skipped with a warning and the rest of the batch proceeds.
//!
//! Configuration problems are neither: a bad regex or a wrong value type is
//! replaced by its default and reported once through `tracing::warn!`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-fmt library.
#[derive(Debug, Error)]
pub enum FmtError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found at path: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension is not handled by any extraction backend.
    #[error(
        "Input file format (.{extension}) is not supported.\n\
Supported formats: pdf, txt. Convert office documents to PDF first."
    )]
    UnsupportedFormat { extension: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The text-extraction engine failed; the whole run is aborted.
    #[error("Extraction failed for '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// An extraction capability was explicitly requested but the backend
    /// cannot provide it (e.g. images from a plain-text input, or no pdfium).
    #[error("Extraction engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A spelling dictionary was configured but could not be loaded.
    #[error("Spelling dictionary '{path}' could not be loaded: {detail}")]
    SpellingUnavailable { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configuration file exists but could not be read from disk.
    #[error("Failed to read configuration '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single extracted image.
///
/// Logged and counted in [`crate::output::ImageStats`]; never aborts the run.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Neither file-name convention yielded a page number.
    #[error("Could not parse page number from filename: {name}")]
    UnparseableName { name: String },

    /// The file could not be opened or decoded as an image.
    #[error("Failed to decode image {name}: {detail}")]
    DecodeFailed { name: String, detail: String },

    /// Encoding into the selected output format failed.
    #[error("Failed to encode image {name} as {format}: {detail}")]
    EncodeFailed {
        name: String,
        format: String,
        detail: String,
    },

    /// Writing the re-encoded file or removing the original failed.
    #[error("I/O error on image {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = FmtError::UnsupportedFormat {
            extension: "docx".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains(".docx"), "got: {msg}");
        assert!(msg.contains("pdf, txt"));
    }

    #[test]
    fn extraction_failed_display() {
        let e = FmtError::ExtractionFailed {
            path: PathBuf::from("/tmp/a.pdf"),
            detail: "bad xref".into(),
        };
        assert!(e.to_string().contains("bad xref"));
        assert!(e.to_string().contains("a.pdf"));
    }

    #[test]
    fn unparseable_name_display() {
        let e = ImageError::UnparseableName {
            name: "cover.png".into(),
        };
        assert!(e.to_string().contains("cover.png"));
    }

    #[test]
    fn encode_failed_display() {
        let e = ImageError::EncodeFailed {
            name: "Im1.png".into(),
            format: "jpeg".into(),
            detail: "unsupported color".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("jpeg"));
        assert!(msg.contains("Im1.png"));
    }
}
