//! Near-duplicate image removal by perceptual hash.
//!
//! Hashes are computed in parallel, then candidates are visited in discovery
//! order: a candidate within the Hamming tolerance of any hash accepted so
//! far is deleted, otherwise its hash joins the accepted set. The first image
//! of a cluster is therefore always the one kept.
//!
//! The hash itself comes from a [`PerceptualHasher`]; [`PHasher`] is a 64-bit
//! gradient hash computed with `img_hash`.

use crate::error::ImageError;
use crate::pipeline::dispatch;
use img_hash::{HashAlg, HasherConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fixed-size perceptual fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PerceptualHash(Vec<u8>);

impl PerceptualHash {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of differing bits. Bytes present in only one hash count as
    /// fully different.
    pub fn distance(&self, other: &Self) -> u32 {
        let common: u32 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let extra = self.0.len().abs_diff(other.0.len()) as u32 * 8;
        common + extra
    }
}

/// Computes the perceptual hash of an image file.
pub trait PerceptualHasher: Send + Sync {
    fn hash(&self, path: &Path) -> Result<PerceptualHash, ImageError>;
}

/// 8×8 gradient hash: one bit per horizontally adjacent pixel pair of the
/// downscaled greyscale image.
#[derive(Debug, Clone, Copy)]
pub struct PHasher {
    hash_size: u32,
}

impl Default for PHasher {
    fn default() -> Self {
        Self { hash_size: 8 }
    }
}

impl PerceptualHasher for PHasher {
    fn hash(&self, path: &Path) -> Result<PerceptualHash, ImageError> {
        let name = file_name(path);
        let decoded = image::open(path).map_err(|e| ImageError::DecodeFailed {
            name: name.clone(),
            detail: e.to_string(),
        })?;

        // img_hash works on its own (older) image types; hand the pixels over raw.
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let legacy = img_hash::image::RgbaImage::from_raw(width, height, rgba.into_raw())
            .ok_or_else(|| ImageError::DecodeFailed {
                name,
                detail: "pixel buffer does not match image dimensions".to_string(),
            })?;

        let hasher = HasherConfig::new()
            .hash_size(self.hash_size, self.hash_size)
            .hash_alg(HashAlg::Gradient)
            .to_hasher();
        let hash = hasher.hash_image(&img_hash::image::DynamicImage::ImageRgba8(legacy));
        Ok(PerceptualHash::from_bytes(hash.as_bytes()))
    }
}

/// Hamming tolerance for a similarity-discard percentage.
///
/// `max(1, round((100 - T) * 0.7))`, rounding halves to even.
pub fn hamming_tolerance(threshold: f64) -> u32 {
    ((100.0 - threshold) * 0.7).round_ties_even().max(1.0) as u32
}

/// Hashes accepted so far in a dedup pass.
#[derive(Debug, Clone)]
pub struct UniqueImageSet {
    accepted: Vec<PerceptualHash>,
    tolerance: u32,
}

impl UniqueImageSet {
    pub fn new(tolerance: u32) -> Self {
        Self {
            accepted: Vec::new(),
            tolerance,
        }
    }

    /// Accept `hash` unless it is within tolerance of an accepted one.
    /// Returns `true` when accepted.
    pub fn admit(&mut self, hash: &PerceptualHash) -> bool {
        if self
            .accepted
            .iter()
            .any(|seen| seen.distance(hash) <= self.tolerance)
        {
            return false;
        }
        self.accepted.push(hash.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// A candidate that survived deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedImage {
    pub path: PathBuf,
    pub hash: PerceptualHash,
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Survivors, in discovery order.
    pub kept: Vec<HashedImage>,
    /// Duplicates removed from disk (or that failed to be removed).
    pub discarded: Vec<PathBuf>,
    /// Candidates that could not be hashed; left on disk untouched.
    pub unhashable: Vec<PathBuf>,
}

/// Remove near-duplicates from `candidates`, keeping the first of each cluster.
pub async fn deduplicate(
    candidates: Vec<PathBuf>,
    threshold: f64,
    workers: usize,
    hasher: Arc<dyn PerceptualHasher>,
) -> DedupOutcome {
    let tolerance = hamming_tolerance(threshold);
    debug!(
        "Deduplicating {} images (threshold {}%, tolerance {} bits)",
        candidates.len(),
        threshold,
        tolerance
    );

    let candidates: Arc<[PathBuf]> = candidates.into();
    let hashes = dispatch::map_ordered(Arc::clone(&candidates), workers, move |path: &PathBuf| {
        hasher.hash(path)
    })
    .await;

    let mut unique = UniqueImageSet::new(tolerance);
    let mut outcome = DedupOutcome::default();
    for (path, hashed) in candidates.iter().cloned().zip(hashes) {
        let hash = match hashed {
            Ok(h) => h,
            Err(e) => {
                warn!("{}. Image left in place and excluded.", e);
                outcome.unhashable.push(path);
                continue;
            }
        };

        if unique.admit(&hash) {
            outcome.kept.push(HashedImage { path, hash });
        } else {
            debug!("Near-duplicate discarded: {}", path.display());
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Could not delete duplicate {}: {}", path.display(), e);
            }
            outcome.discarded.push(path);
        }
    }

    info!(
        "Image dedup: {} kept, {} duplicates removed, {} unhashable",
        outcome.kept.len(),
        outcome.discarded.len(),
        outcome.unhashable.len()
    );
    outcome
}

/// Display name of `path` for log messages and errors.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
