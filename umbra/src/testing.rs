//! Synthetic frames for tests.

#![allow(dead_code)]

use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::image_buffer::ImageBuffer;

/// Gaussian sigma of rendered stars, in pixels.
pub const STAR_SIGMA: f64 = 1.5;

/// Half-size of the square each star is rendered into.
pub const STAR_RADIUS: i64 = 4;

#[derive(Debug, Clone, Copy)]
pub struct StarSpec {
    pub pos: DVec2,
    pub amplitude: f32,
}

impl StarSpec {
    pub fn new(x: f64, y: f64, amplitude: f32) -> Self {
        Self {
            pos: DVec2::new(x, y),
            amplitude,
        }
    }
}

/// Constant `background` plus truncated gaussian stars. Pixels outside every
/// star square are exactly `background`.
pub fn render_star_field(
    width: usize,
    height: usize,
    background: f32,
    stars: &[StarSpec],
) -> ImageBuffer {
    let mut frame = ImageBuffer::filled(width, height, background, "synthetic");
    let two_sigma_sq = 2.0 * STAR_SIGMA * STAR_SIGMA;
    for star in stars {
        let cx = star.pos.x.round() as i64;
        let cy = star.pos.y.round() as i64;
        for y in cy - STAR_RADIUS..=cy + STAR_RADIUS {
            for x in cx - STAR_RADIUS..=cx + STAR_RADIUS {
                if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                    continue;
                }
                let d = DVec2::new(x as f64, y as f64) - star.pos;
                let v = star.amplitude as f64 * (-d.length_squared() / two_sigma_sq).exp();
                frame.data[(x as usize, y as usize)] += v as f32;
            }
        }
    }
    frame
}

/// `count` stars at integer positions, at least `min_separation` apart and
/// `margin` pixels from every edge, with distinct amplitudes.
pub fn random_stars(
    width: usize,
    height: usize,
    count: usize,
    margin: usize,
    min_separation: f64,
    seed: u64,
) -> Vec<StarSpec> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut stars: Vec<StarSpec> = Vec::with_capacity(count);
    let mut attempts = 0;
    while stars.len() < count {
        attempts += 1;
        assert!(attempts < 100_000, "star field too dense");
        let x = rng.random_range(margin..width - margin) as f64;
        let y = rng.random_range(margin..height - margin) as f64;
        let pos = DVec2::new(x, y);
        if stars.iter().all(|s| s.pos.distance(pos) >= min_separation) {
            let amplitude = 300.0 + 150.0 * stars.len() as f32;
            stars.push(StarSpec { pos, amplitude });
        }
    }
    stars
}

/// Copy of `src` moved by `(dx, dy)` whole pixels: `out(x, y) = src(x - dx, y - dy)`.
pub fn shifted(src: &ImageBuffer, dx: i64, dy: i64, fill: f32, origin: &str) -> ImageBuffer {
    let (w, h) = (src.width() as i64, src.height() as i64);
    let mut out = ImageBuffer::from_fn(src.width(), src.height(), origin, |x, y| {
        let sx = x as i64 - dx;
        let sy = y as i64 - dy;
        if sx < 0 || sy < 0 || sx >= w || sy >= h {
            fill
        } else {
            src.data[(sx as usize, sy as usize)]
        }
    });
    out.metadata = src.metadata.clone();
    out
}
