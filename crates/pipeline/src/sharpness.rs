//! Best-candidate selection for scene thumbnails.
//!
//! Candidates are scored by the variance of a 4-neighbour Laplacian over
//! the grayscale image; blurry or flat frames score low. Decoding is
//! content-sniffed, so the file extension does not have to match.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageReader};

use crate::error::PipelineError;

/// Return the sharpest decodable candidate.
///
/// Undecodable files are skipped. If none decode, the largest file wins.
/// Blocking: call from `spawn_blocking` inside async code.
pub fn pick_sharpest<P: AsRef<Path>>(candidates: &[P]) -> Result<PathBuf, PipelineError> {
    if candidates.is_empty() {
        return Err(PipelineError::NoCandidates);
    }

    let mut best: Option<(&Path, f64)> = None;
    for path in candidates.iter().map(AsRef::<Path>::as_ref) {
        let Some(score) = sharpness_score(path) else {
            tracing::debug!(path = %path.display(), "Skipping undecodable thumbnail candidate");
            continue;
        };
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((path, score));
        }
    }

    if let Some((path, score)) = best {
        tracing::debug!(path = %path.display(), score, "Picked sharpest thumbnail candidate");
        return Ok(path.to_path_buf());
    }

    largest_file(candidates)
}

/// Laplacian variance of the image at `path`, or `None` if it cannot be decoded.
pub fn sharpness_score(path: &Path) -> Option<f64> {
    let image = ImageReader::open(path)
        .ok()?
        .with_guessed_format()
        .ok()?
        .decode()
        .ok()?;
    Some(laplacian_variance(&image.to_luma8()))
}

/// Variance of `4*c - up - down - left - right` over interior pixels.
///
/// Images smaller than 3×3 have no interior and score `0.0`.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| f64::from(gray.get_pixel(x, y)[0]);
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0.0;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let lap = 4.0 * px(x, y) - px(x, y - 1) - px(x, y + 1) - px(x - 1, y) - px(x + 1, y);
            sum += lap;
            sum_sq += lap * lap;
            count += 1.0;
        }
    }

    let mean = sum / count;
    sum_sq / count - mean * mean
}

fn largest_file<P: AsRef<Path>>(candidates: &[P]) -> Result<PathBuf, PipelineError> {
    let mut best: Option<(&Path, u64)> = None;
    for path in candidates.iter().map(AsRef::<Path>::as_ref) {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if best.map_or(true, |(_, best_size)| size > best_size) {
            best = Some((path, size));
        }
    }
    best.map(|(path, _)| path.to_path_buf())
        .ok_or(PipelineError::NoCandidates)
}
