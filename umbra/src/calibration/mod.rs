//! Pixelwise dark subtraction and flat-field correction.
//!
//! Every operation requires identical operand shapes and fails with
//! [`Error::ShapeMismatch`] otherwise. Each comes in an in-place form used by
//! the pipeline and a copy form that returns a new frame with a derived origin.


use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::image_buffer::{Channel, ColorTriple, ImageBuffer};
use crate::math;

pub const SUBTRACT_SUFFIX: &str = "_subdark";
pub const NORMALIZE_SUFFIX: &str = "_norm";
pub const DIVIDE_SUFFIX: &str = "_divflat";

/// `target = max(target - dark, 0)`.
pub fn subtract_in_place(target: &mut ImageBuffer, dark: &ImageBuffer) -> Result<()> {
    target.ensure_same_shape(dark, "subtract")?;
    target
        .pixels_mut()
        .par_iter_mut()
        .zip(dark.pixels().par_iter())
        .for_each(|(t, &d)| *t = (*t - d).max(0.0));
    Ok(())
}

pub fn subtract(target: &ImageBuffer, dark: &ImageBuffer) -> Result<ImageBuffer> {
    let mut out = target.derive(SUBTRACT_SUFFIX);
    subtract_in_place(&mut out, dark)?;
    Ok(out)
}

/// Divide every pixel by the frame's median. Returns the median used.
///
/// A zero, subnormal or non-finite median is [`Error::DegenerateValue`] and
/// leaves the frame untouched. A quotient that overflows is set to 0, the same
/// as in [`divide_in_place`].
pub fn normalize_in_place(frame: &mut ImageBuffer) -> Result<f32> {
    let median = math::median_f32(frame.pixels());
    if median == 0.0 || !median.is_finite() || !median.recip().is_finite() {
        return Err(Error::DegenerateValue {
            operation: "normalize",
            origin: frame.origin.clone(),
            reason: format!("median is {median}"),
        });
    }

    frame.pixels_mut().par_iter_mut().for_each(|v| {
        let q = *v / median;
        *v = if q.is_finite() { q } else { 0.0 };
    });
    tracing::debug!(origin = %frame.origin, median, "Normalized");
    Ok(median)
}

pub fn normalize(frame: &ImageBuffer) -> Result<ImageBuffer> {
    let mut out = frame.derive(NORMALIZE_SUFFIX);
    normalize_in_place(&mut out)?;
    Ok(out)
}

/// `target = target / flat`, with 0 wherever the flat is 0 or the quotient
/// is not finite.
pub fn divide_in_place(target: &mut ImageBuffer, flat: &ImageBuffer) -> Result<()> {
    target.ensure_same_shape(flat, "divide")?;
    target
        .pixels_mut()
        .par_iter_mut()
        .zip(flat.pixels().par_iter())
        .for_each(|(t, &f)| {
            let q = if f == 0.0 { 0.0 } else { *t / f };
            *t = if q.is_finite() { q } else { 0.0 };
        });
    Ok(())
}

pub fn divide(target: &ImageBuffer, flat: &ImageBuffer) -> Result<ImageBuffer> {
    let mut out = target.derive(DIVIDE_SUFFIX);
    divide_in_place(&mut out, flat)?;
    Ok(out)
}

pub fn subtract_triple_in_place(target: &mut ColorTriple, dark: &ColorTriple) -> Result<()> {
    for channel in Channel::ALL {
        subtract_in_place(target.channel_mut(channel), dark.channel(channel))?;
    }
    Ok(())
}

/// Normalizes each plane by its own median.
pub fn normalize_triple_in_place(frame: &mut ColorTriple) -> Result<()> {
    for channel in Channel::ALL {
        normalize_in_place(frame.channel_mut(channel))?;
    }
    Ok(())
}

pub fn divide_triple_in_place(target: &mut ColorTriple, flat: &ColorTriple) -> Result<()> {
    for channel in Channel::ALL {
        divide_in_place(target.channel_mut(channel), flat.channel(channel))?;
    }
    Ok(())
}

/// Linearly rescale red and blue so their mean and standard deviation match
/// the green plane. A channel with zero spread is left unchanged.
pub fn equalize_to_green(triple: &mut ColorTriple) {
    let (green_mean, green_std) = math::mean_std_f32(triple.green.pixels());

    for channel in [Channel::Red, Channel::Blue] {
        let plane = triple.channel_mut(channel);
        let (mean, std) = math::mean_std_f32(plane.pixels());
        if std <= f32::EPSILON || !std.is_finite() {
            tracing::warn!(origin = %plane.origin, "Skipping color equalization of {channel} plane");
            continue;
        }
        let gain = green_std / std;
        plane
            .pixels_mut()
            .par_iter_mut()
            .for_each(|v| *v = (*v - mean) * gain + green_mean);
    }
}
