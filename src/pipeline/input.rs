//! Input resolution: validate a user-supplied path and pick its backend.
//!
//! ## Why check the magic bytes?
//!
//! pdfium reports a corrupt or mislabelled file with an opaque error code.
//! Checking for `%PDF` up front gives the caller a readable message instead.

use crate::error::FmtError;
use crate::pipeline::extract::{PdfiumExtractor, PlainTextExtractor, TextExtractor};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Which extraction backend handles a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Text,
}

impl InputKind {
    /// Map a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// A fresh extractor for this kind of input.
    pub fn extractor(self) -> Arc<dyn TextExtractor> {
        match self {
            Self::Pdf => Arc::new(PdfiumExtractor::new()),
            Self::Text => Arc::new(PlainTextExtractor),
        }
    }
}

/// A validated local input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub path: PathBuf,
    pub kind: InputKind,
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem used to name derived artefacts (`doc.pdf` → `doc`).
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// Validate `path` and classify it.
///
/// Fails with `FileNotFound`, `PermissionDenied`, `UnsupportedFormat`, or
/// `ExtractionFailed` when a `.pdf` lacks the PDF header.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<ResolvedInput, FmtError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(FmtError::FileNotFound { path });
    }

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = InputKind::from_extension(&extension)
        .ok_or(FmtError::UnsupportedFormat { extension })?;

    // Check read permission by attempting to open
    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(FmtError::PermissionDenied { path });
        }
        Err(_) => return Err(FmtError::FileNotFound { path }),
    };

    if kind == InputKind::Pdf {
        let mut magic = [0u8; 4];
        if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
            return Err(FmtError::ExtractionFailed {
                path,
                detail: format!("not a PDF (magic bytes {:02X?})", magic),
            });
        }
    }

    debug!("Resolved {:?} input: {}", kind, path.display());
    Ok(ResolvedInput { path, kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_input("/nonexistent/file.pdf").unwrap_err();
        assert!(matches!(err, FmtError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_input(dir.path()).unwrap_err();
        assert!(matches!(err, FmtError::FileNotFound { .. }));
    }

    #[test]
    fn text_file_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Notes.TXT");
        std::fs::write(&path, "hello").unwrap();
        let resolved = resolve_input(&path).unwrap();
        assert_eq!(resolved.kind, InputKind::Text);
        assert_eq!(resolved.stem(), "Notes");
        assert_eq!(resolved.kind.extractor().name(), "text");
    }

    #[test]
    fn office_documents_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.docx");
        std::fs::write(&path, "PK").unwrap();
        match resolve_input(&path).unwrap_err() {
            FmtError::UnsupportedFormat { extension } => assert_eq!(extension, "docx"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(
            resolve_input(&path).unwrap_err(),
            FmtError::UnsupportedFormat { .. }
        ));
    }

    #[test]
    fn pdf_without_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, "plain text pretending").unwrap();
        assert!(matches!(
            resolve_input(&path).unwrap_err(),
            FmtError::ExtractionFailed { .. }
        ));
    }

    #[test]
    fn pdf_with_header_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, "%PDF-1.7\n").unwrap();
        let resolved = resolve_input(&path).unwrap();
        assert_eq!(resolved.kind, InputKind::Pdf);
        assert_eq!(resolved.kind.extractor().name(), "pdfium");
    }
}
