//! Threshold-and-label star detection.
//!
//! Background is the plane median and noise its MAD-based sigma. Pixels more
//! than [`DETECTION_SIGMA`] noise levels above background are grouped into
//! 8-connected components; each component becomes one star at its
//! background-subtracted, flux-weighted centroid.

use glam::DVec2;

use crate::image_buffer::ImageBuffer;
use crate::math;

/// Detection threshold in noise sigmas above background.
pub const DETECTION_SIGMA: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub pos: DVec2,
    /// Background-subtracted sum over the component.
    pub flux: f64,
    pub area: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DetectionParams {
    pub max_stars: usize,
    pub min_area: usize,
}

/// Stars of `plane`, brightest first, at most `params.max_stars`.
///
/// Components touching the image border are dropped: their centroids are
/// biased by the cut.
pub(crate) fn detect_stars(plane: &ImageBuffer, params: DetectionParams) -> Vec<Star> {
    let width = plane.width();
    let height = plane.height();
    let pixels = plane.pixels();
    if pixels.is_empty() {
        return Vec::new();
    }

    let mut scratch = pixels.to_vec();
    let (background, mad) = math::median_and_mad_f32_mut(&mut scratch);
    let threshold = background + DETECTION_SIGMA * math::mad_to_sigma(mad);

    let mut visited = vec![false; pixels.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut stars = Vec::new();

    for start in 0..pixels.len() {
        if visited[start] || pixels[start] <= threshold {
            continue;
        }

        visited[start] = true;
        stack.push(start);
        let mut sum_w = 0.0f64;
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        let mut area = 0usize;
        let mut touches_border = false;

        while let Some(idx) = stack.pop() {
            let x = idx % width;
            let y = idx / width;
            let w = (pixels[idx] - background) as f64;
            sum_w += w;
            sum_x += w * x as f64;
            sum_y += w * y as f64;
            area += 1;
            touches_border |= x == 0 || y == 0 || x + 1 == width || y + 1 == height;

            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let n = ny * width + nx;
                    if !visited[n] && pixels[n] > threshold {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        if area >= params.min_area && !touches_border && sum_w > 0.0 {
            stars.push(Star {
                pos: DVec2::new(sum_x / sum_w, sum_y / sum_w),
                flux: sum_w,
                area,
            });
        }
    }

    stars.sort_by(|a, b| b.flux.total_cmp(&a.flux));
    stars.truncate(params.max_stars);

    tracing::debug!(
        origin = %plane.origin,
        background,
        threshold,
        stars = stars.len(),
        "Detected stars"
    );
    stars
}
