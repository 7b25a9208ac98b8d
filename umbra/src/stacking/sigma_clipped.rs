//! Single-pass sigma-clipped mean.

use std::sync::atomic::{AtomicU64, Ordering};

use common::buffer2::Buffer2;

use crate::error::{Error, Result};
use crate::image_buffer::{FrameSet, ImageBuffer};
use crate::math;

pub const DEFAULT_SIGMA: f32 = 1.5;

/// Counters gathered across all pixel positions of one stack.
#[derive(Debug, Default)]
struct ClipStats {
    total_values: AtomicU64,
    clipped_values: AtomicU64,
    pixels_with_clipping: AtomicU64,
    /// Positions where every sample was masked and the plain mean was used.
    fully_masked: AtomicU64,
}

impl ClipStats {
    fn record(&self, original_len: usize, kept: usize) {
        let clipped = original_len - kept;
        self.total_values
            .fetch_add(original_len as u64, Ordering::Relaxed);
        self.clipped_values
            .fetch_add(clipped as u64, Ordering::Relaxed);
        if clipped > 0 {
            self.pixels_with_clipping.fetch_add(1, Ordering::Relaxed);
        }
        if kept == 0 {
            self.fully_masked.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn log_summary(&self, frame_count: usize) {
        let total = self.total_values.load(Ordering::Relaxed);
        let clipped = self.clipped_values.load(Ordering::Relaxed);
        let pixels_clipped = self.pixels_with_clipping.load(Ordering::Relaxed);
        let fully_masked = self.fully_masked.load(Ordering::Relaxed);

        if total == 0 {
            return;
        }

        let pixel_count = total / frame_count as u64;
        tracing::debug!(
            "Sigma clipping stats: {:.2}% of values clipped ({} of {})",
            100.0 * clipped as f64 / total as f64,
            clipped,
            total
        );
        tracing::debug!(
            "  Pixels with any clipping: {:.2}% ({} of {})",
            100.0 * pixels_clipped as f64 / pixel_count as f64,
            pixels_clipped,
            pixel_count
        );
        if fully_masked > 0 {
            tracing::warn!(
                "{} pixels had every sample clipped, used the unclipped mean",
                fully_masked
            );
        }
    }
}

/// Mean of `values` after masking samples with `|v - mean| > sigma * std`.
///
/// Returns `(value, kept)`. When nothing survives the mask the plain mean is
/// returned with `kept == 0`.
fn clipped_mean(values: &[f32], sigma: f32) -> (f32, usize) {
    let (mean, std) = math::mean_std_f32(values);
    let threshold = sigma * std;

    let mut sum = 0.0f64;
    let mut kept = 0usize;
    for &v in values {
        if (v - mean).abs() <= threshold {
            sum += v as f64;
            kept += 1;
        }
    }

    if kept == 0 {
        (mean, 0)
    } else {
        ((sum / kept as f64) as f32, kept)
    }
}

/// Per-pixel sigma-clipped mean across `frames`.
///
/// `sigma` must be positive and finite.
pub fn sigma_clipped_mean_stack(frames: &FrameSet, sigma: f32) -> Result<ImageBuffer> {
    let first = frames.first();
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(Error::DegenerateValue {
            operation: "sigma_clipped_mean_stack",
            origin: first.origin.clone(),
            reason: format!("sigma must be positive, got {sigma}"),
        });
    }

    let shape = frames.shape();
    let stats = ClipStats::default();
    let pixels = super::reduce_per_pixel(frames, |values| {
        let (value, kept) = clipped_mean(values, sigma);
        stats.record(values.len(), kept);
        value
    });
    stats.log_summary(frames.len());

    Ok(first.derive_with(
        Buffer2::new(shape.width, shape.height, pixels),
        "_mean_stacked",
    ))
}
