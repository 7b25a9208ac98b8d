//! Master frame synthesis: per-pixel reduction of a [`FrameSet`] into one frame.

mod median;
mod sigma_clipped;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::image_buffer::{FrameSet, ImageBuffer};

pub use median::median_stack;
pub use sigma_clipped::{sigma_clipped_mean_stack, DEFAULT_SIGMA};

/// Method used for combining multiple frames during stacking.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum StackMethod {
    /// Per-pixel median. Robust to a minority of outliers.
    #[default]
    Median,
    /// Mean after masking samples farther than `sigma` standard deviations from the mean.
    SigmaClippedMean {
        #[serde(default = "default_sigma")]
        sigma: f32,
    },
}

fn default_sigma() -> f32 {
    DEFAULT_SIGMA
}

impl StackMethod {
    pub fn sigma_clipped() -> Self {
        StackMethod::SigmaClippedMean {
            sigma: DEFAULT_SIGMA,
        }
    }
}

impl std::fmt::Display for StackMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackMethod::Median => write!(f, "median"),
            StackMethod::SigmaClippedMean { sigma } => write!(f, "sigma{sigma:.1}"),
        }
    }
}

/// Stack `frames` with `method`.
pub fn stack(frames: &FrameSet, method: StackMethod) -> Result<ImageBuffer> {
    tracing::info!(
        frames = frames.len(),
        shape = %frames.shape(),
        "Stacking '{}' with {method}",
        frames.first().origin
    );
    match method {
        StackMethod::Median => Ok(median_stack(frames)),
        StackMethod::SigmaClippedMean { sigma } => sigma_clipped_mean_stack(frames, sigma),
    }
}

/// Run `reduce(samples)` for every pixel position, where `samples` holds the
/// values of every frame at that position in frame order.
///
/// `reduce` may reorder the samples. Rows are processed in parallel, each
/// band with its own scratch buffer.
fn reduce_per_pixel<F>(frames: &FrameSet, reduce: F) -> Vec<f32>
where
    F: Fn(&mut [f32]) -> f32 + Sync + Send,
{
    let shape = frames.shape();
    let width = shape.width;
    let mut out = vec![0.0f32; shape.pixel_count()];
    let planes: Vec<&[f32]> = frames.iter().map(|f| f.pixels()).collect();

    common::parallel::par_row_chunks_mut(&mut out, width, |first_row, chunk| {
        let mut samples = vec![0.0f32; planes.len()];
        let offset = first_row * width;
        for (i, dst) in chunk.iter_mut().enumerate() {
            let idx = offset + i;
            for (sample, plane) in samples.iter_mut().zip(&planes) {
                *sample = plane[idx];
            }
            *dst = reduce(&mut samples);
        }
    });

    out
}
