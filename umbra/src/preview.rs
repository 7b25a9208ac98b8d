//! 8-bit PNG previews of calibrated frames.
//!
//! Each channel is stretched independently: `(v - min) / (max - min) * 255 * boost`,
//! clipped to `0..=255`. A channel with `max == min` renders black. The 8-bit
//! channel can then be histogram equalized and gamma corrected.

use std::path::Path;

use image::{GrayImage, RgbImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image_buffer::{ColorTriple, ImageBuffer};

pub const DEFAULT_BOOST: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub enabled: bool,
    pub boost: f32,
    /// Output is `255 * (v / 255)^(1 / gamma)`. Values above 1 brighten
    /// shadows. Non-positive or non-finite values are ignored.
    pub gamma: f32,
    pub equalize_histogram: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            boost: DEFAULT_BOOST,
            gamma: 1.0,
            equalize_histogram: false,
        }
    }
}

impl PreviewConfig {
    pub fn with_boost(boost: f32) -> Self {
        Self {
            boost,
            ..Self::default()
        }
    }
}

/// Linear min-max stretch of one plane to 8 bits.
pub fn stretch_channel(plane: &[f32], boost: f32) -> Vec<u8> {
    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !(range > 0.0 && range.is_finite()) {
        return vec![0; plane.len()];
    }

    let scale = 255.0 * boost / range;
    plane
        .par_iter()
        .map(|&v| ((v - min) * scale).clamp(0.0, 255.0) as u8)
        .collect()
}

/// Spread the 8-bit levels over the full range by their cumulative
/// distribution. A single-level channel is left as is.
pub fn equalize_histogram(channel: &mut [u8]) {
    let mut histogram = [0usize; 256];
    for &v in channel.iter() {
        histogram[v as usize] += 1;
    }

    let total = channel.len();
    let Some(cdf_min) = histogram.iter().copied().find(|&n| n > 0) else {
        return;
    };
    if cdf_min == total {
        return;
    }

    let scale = 255.0 / (total - cdf_min) as f64;
    let mut lut = [0u8; 256];
    let mut cdf = 0usize;
    for (level, &count) in histogram.iter().enumerate() {
        cdf += count;
        lut[level] = (cdf.saturating_sub(cdf_min) as f64 * scale).round() as u8;
    }
    channel.par_iter_mut().for_each(|v| *v = lut[*v as usize]);
}

pub fn adjust_gamma(channel: &mut [u8], gamma: f32) {
    if !(gamma > 0.0 && gamma.is_finite()) || gamma == 1.0 {
        return;
    }
    let inv = 1.0 / gamma;
    let mut lut = [0u8; 256];
    for (level, out) in lut.iter_mut().enumerate() {
        *out = (255.0 * (level as f32 / 255.0).powf(inv)).round() as u8;
    }
    channel.par_iter_mut().for_each(|v| *v = lut[*v as usize]);
}

/// Stretch, then equalize and gamma correct as `config` asks.
pub fn render_channel(plane: &[f32], config: &PreviewConfig) -> Vec<u8> {
    let mut channel = stretch_channel(plane, config.boost);
    if config.equalize_histogram {
        equalize_histogram(&mut channel);
    }
    adjust_gamma(&mut channel, config.gamma);
    channel
}

pub fn render_preview(triple: &ColorTriple, config: &PreviewConfig) -> RgbImage {
    let shape = triple.shape();
    let [r, g, b] = [&triple.red, &triple.green, &triple.blue]
        .map(|plane| render_channel(plane.pixels(), config));

    RgbImage::from_fn(shape.width as u32, shape.height as u32, |x, y| {
        let i = y as usize * shape.width + x as usize;
        image::Rgb([r[i], g[i], b[i]])
    })
}

/// Write `triple` as an RGB PNG at `path`.
pub fn write_preview(triple: &ColorTriple, config: &PreviewConfig, path: &Path) -> Result<()> {
    let img = render_preview(triple, config);
    save(path, |p| img.save_with_format(p, image::ImageFormat::Png))?;
    tracing::info!(path = %path.display(), boost = config.boost, gamma = config.gamma, "Wrote preview");
    Ok(())
}

/// Write one plane as a grayscale PNG at `path`.
pub fn write_grayscale_preview(
    plane: &ImageBuffer,
    config: &PreviewConfig,
    path: &Path,
) -> Result<()> {
    let pixels = render_channel(plane.pixels(), config);
    let img = GrayImage::from_raw(plane.width() as u32, plane.height() as u32, pixels)
        .ok_or_else(|| Error::DegenerateValue {
            operation: "write_grayscale_preview",
            origin: plane.origin.clone(),
            reason: "pixel count does not match dimensions".to_string(),
        })?;
    save(path, |p| img.save_with_format(p, image::ImageFormat::Png))
}

fn save<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> image::ImageResult<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::Preview {
            path: path.display().to_string(),
            source: image::ImageError::IoError(e),
        })?;
    }
    write(path).map_err(|source| Error::Preview {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::test_output_path;

    #[test]
    fn test_stretch_full_range() {
        let out = stretch_channel(&[10.0, 15.0, 20.0], 1.0);
        assert_eq!(out, vec![0, 127, 255]);
    }

    #[test]
    fn test_stretch_boost_clips() {
        let out = stretch_channel(&[0.0, 0.1, 0.5, 1.0], 8.0);
        assert_eq!(out, vec![0, 204, 255, 255]);
    }

    #[test]
    fn test_flat_channel_is_black() {
        assert_eq!(stretch_channel(&[3.0; 4], 8.0), vec![0; 4]);
    }

    #[test]
    fn test_channels_stretched_independently() {
        let red = ImageBuffer::from_fn(2, 1, "r", |x, _| x as f32);
        let green = ImageBuffer::from_fn(2, 1, "g", |x, _| 1000.0 + 500.0 * x as f32);
        let blue = ImageBuffer::filled(2, 1, 7.0, "b");
        let triple = ColorTriple::new(red, green, blue).unwrap();
        let img = render_preview(&triple, &PreviewConfig::with_boost(1.0));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 255, 0]);
    }

    #[test]
    fn test_gamma_brightens_midtones_and_keeps_ends() {
        let mut channel = vec![0, 64, 255];
        adjust_gamma(&mut channel, 2.0);
        assert_eq!(channel, vec![0, 128, 255]);

        let mut unchanged = vec![0, 64, 255];
        adjust_gamma(&mut unchanged, 1.0);
        adjust_gamma(&mut unchanged, 0.0);
        adjust_gamma(&mut unchanged, f32::NAN);
        assert_eq!(unchanged, vec![0, 64, 255]);
    }

    #[test]
    fn test_equalize_histogram_spreads_levels() {
        let mut channel = vec![0, 0, 10, 10, 10, 200];
        equalize_histogram(&mut channel);
        assert_eq!(channel, vec![0, 0, 191, 191, 191, 255]);

        let mut flat = vec![42; 5];
        equalize_histogram(&mut flat);
        assert_eq!(flat, vec![42; 5]);

        let mut empty: Vec<u8> = Vec::new();
        equalize_histogram(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_render_channel_applies_options_after_stretch() {
        let plane = [0.0, 1.0, 2.0, 3.0];
        let plain = render_channel(&plane, &PreviewConfig::with_boost(1.0));
        assert_eq!(plain, vec![0, 85, 170, 255]);

        let config = PreviewConfig {
            gamma: 2.0,
            ..PreviewConfig::with_boost(1.0)
        };
        assert_eq!(render_channel(&plane, &config), vec![0, 147, 208, 255]);

        let skewed = [0.0, 0.0, 0.0, 1.0, 100.0];
        let config = PreviewConfig {
            equalize_histogram: true,
            ..PreviewConfig::with_boost(1.0)
        };
        assert_eq!(render_channel(&skewed, &config), vec![0, 0, 0, 128, 255]);
    }

    #[test]
    fn test_write_preview_png() {
        let plane = ImageBuffer::from_fn(8, 6, "p", |x, y| (x * y) as f32);
        let triple = ColorTriple::new(plane.clone(), plane.clone(), plane.clone()).unwrap();
        let path = test_output_path("preview/triple.png");
        write_preview(&triple, &PreviewConfig::default(), &path).unwrap();
        assert!(path.is_file());

        let gray = test_output_path("preview/gray.png");
        let config = PreviewConfig {
            gamma: 2.2,
            equalize_histogram: true,
            ..PreviewConfig::with_boost(1.0)
        };
        write_grayscale_preview(&plane, &config, &gray).unwrap();
        assert!(gray.is_file());
    }
}
