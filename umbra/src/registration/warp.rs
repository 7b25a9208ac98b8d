//! Inverse-mapping resampler.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use common::buffer2::Buffer2;

use super::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarpMethod {
    Nearest,
    #[default]
    Bilinear,
}

/// Sample positions this close outside the grid still count as inside.
const EDGE_EPS: f64 = 1e-6;

#[inline]
fn sample_nearest(src: &Buffer2<f32>, p: DVec2, border: f32) -> f32 {
    let x = p.x.round();
    let y = p.y.round();
    if x < 0.0 || y < 0.0 || x >= src.width() as f64 || y >= src.height() as f64 {
        return border;
    }
    src[(x as usize, y as usize)]
}

#[inline]
fn sample_bilinear(src: &Buffer2<f32>, p: DVec2, border: f32) -> f32 {
    let max_x = (src.width() - 1) as f64;
    let max_y = (src.height() - 1) as f64;
    if p.x < -EDGE_EPS || p.y < -EDGE_EPS || p.x > max_x + EDGE_EPS || p.y > max_y + EDGE_EPS {
        return border;
    }
    let x = p.x.clamp(0.0, max_x);
    let y = p.y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let top = src[(x0, y0)] * (1.0 - fx) + src[(x1, y0)] * fx;
    let bottom = src[(x0, y1)] * (1.0 - fx) + src[(x1, y1)] * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Resample `src` into the reference frame.
///
/// `to_source` maps output (reference) coordinates back into `src`. The
/// output has `src`'s dimensions; positions that fall outside `src` get
/// `border`.
pub(crate) fn warp(
    src: &Buffer2<f32>,
    to_source: &Transform,
    method: WarpMethod,
    border: f32,
) -> Buffer2<f32> {
    let width = src.width();
    let height = src.height();
    let mut out = vec![border; width * height];
    if width == 0 || height == 0 {
        return Buffer2::new(width, height, out);
    }

    common::parallel::par_row_chunks_mut(&mut out, width, |first_row, chunk| {
        for (i, row) in chunk.chunks_mut(width).enumerate() {
            let y = (first_row + i) as f64;
            for (x, dst) in row.iter_mut().enumerate() {
                let p = to_source.apply(DVec2::new(x as f64, y));
                *dst = match method {
                    WarpMethod::Nearest => sample_nearest(src, p, border),
                    WarpMethod::Bilinear => sample_bilinear(src, p, border),
                };
            }
        }
    });

    Buffer2::new(width, height, out)
}
