//! Whole-plane bilinear interpolation.
//!
//! Each row forms three neighbour sums once (vertical, horizontal, diagonal)
//! and then fills the planes column class by column class, so the inner loops
//! carry no per-pixel color branching.

use rayon::prelude::*;

use common::buffer2::Buffer2;

use super::BayerPattern;
use crate::image_buffer::Channel;

/// Mirror index `i` (which may be `-1` or `n`) into `0..n`.
#[inline]
pub(super) fn mirror(i: isize, n: usize) -> usize {
    if n == 1 {
        0
    } else if i < 0 {
        (-i) as usize
    } else if i as usize >= n {
        2 * (n - 1) - i as usize
    } else {
        i as usize
    }
}

/// `dst[x] = src[x - 1] + src[x + 1]` with mirrored borders.
#[inline]
fn neighbour_sum(src: &[f32], dst: &mut [f32]) {
    let n = src.len();
    if n == 1 {
        dst[0] = 2.0 * src[0];
        return;
    }
    dst[0] = 2.0 * src[1];
    for ((d, &l), &r) in dst[1..n - 1].iter_mut().zip(&src[..n - 2]).zip(&src[2..]) {
        *d = l + r;
    }
    dst[n - 1] = 2.0 * src[n - 2];
}

/// Per-row scratch: vertical, horizontal and diagonal neighbour sums.
struct RowSums {
    vs: Vec<f32>,
    hs: Vec<f32>,
    ds: Vec<f32>,
}

impl RowSums {
    fn new(width: usize) -> Self {
        Self {
            vs: vec![0.0; width],
            hs: vec![0.0; width],
            ds: vec![0.0; width],
        }
    }

    fn compute(&mut self, up: &[f32], cur: &[f32], down: &[f32]) {
        for ((v, &u), &d) in self.vs.iter_mut().zip(up).zip(down) {
            *v = u + d;
        }
        neighbour_sum(cur, &mut self.hs);
        neighbour_sum(&self.vs, &mut self.ds);
    }
}

struct RowOut<'a> {
    red: &'a mut [f32],
    green: &'a mut [f32],
    blue: &'a mut [f32],
}

fn fill_row(pattern: BayerPattern, y: usize, cur: &[f32], sums: &RowSums, out: RowOut<'_>) {
    let RowSums { vs, hs, ds } = sums;
    let RowOut { red, green, blue } = out;
    let width = cur.len();
    let classes = pattern.pattern_2x2();
    let red_row = pattern.red_in_row(y);

    for phase in 0..width.min(2) {
        let native = classes[((y & 1) << 1) | phase];
        let columns = (phase..width).step_by(2);
        match native {
            Channel::Red => {
                for x in columns {
                    red[x] = cur[x];
                    green[x] = (vs[x] + hs[x]) * 0.25;
                    blue[x] = ds[x] * 0.25;
                }
            }
            Channel::Blue => {
                for x in columns {
                    blue[x] = cur[x];
                    green[x] = (vs[x] + hs[x]) * 0.25;
                    red[x] = ds[x] * 0.25;
                }
            }
            Channel::Green if red_row => {
                for x in columns {
                    green[x] = cur[x];
                    red[x] = hs[x] * 0.5;
                    blue[x] = vs[x] * 0.5;
                }
            }
            Channel::Green => {
                for x in columns {
                    green[x] = cur[x];
                    blue[x] = hs[x] * 0.5;
                    red[x] = vs[x] * 0.5;
                }
            }
        }
    }
}

/// Demosaic `mosaic` into `[red, green, blue]` planes of the same size.
///
/// Rows are processed in parallel.
pub fn demosaic_bilinear(mosaic: &Buffer2<f32>, pattern: BayerPattern) -> [Buffer2<f32>; 3] {
    let width = mosaic.width();
    let height = mosaic.height();
    let mut red = vec![0.0f32; width * height];
    let mut green = vec![0.0f32; width * height];
    let mut blue = vec![0.0f32; width * height];

    if width > 0 && height > 0 {
        red.par_chunks_mut(width)
            .zip(green.par_chunks_mut(width))
            .zip(blue.par_chunks_mut(width))
            .enumerate()
            .for_each_init(
                || RowSums::new(width),
                |sums, (y, ((r, g), b))| {
                    let up = mosaic.row(mirror(y as isize - 1, height));
                    let down = mosaic.row(mirror(y as isize + 1, height));
                    let cur = mosaic.row(y);
                    sums.compute(up, cur, down);
                    fill_row(
                        pattern,
                        y,
                        cur,
                        sums,
                        RowOut {
                            red: r,
                            green: g,
                            blue: b,
                        },
                    );
                },
            );
    }

    [
        Buffer2::new(width, height, red),
        Buffer2::new(width, height, green),
        Buffer2::new(width, height, blue),
    ]
}
