//! Median, mean, standard deviation and MAD over f32 samples.
//!
//! Means and variances accumulate in f64 so that multi-megapixel planes
//! do not lose precision.

/// MAD (Median Absolute Deviation) to standard deviation conversion factor.
///
/// For a normal distribution, σ ≈ 1.4826 × MAD.
pub const MAD_TO_SIGMA: f32 = 1.4826022;

#[inline]
pub fn mad_to_sigma(mad: f32) -> f32 {
    mad * MAD_TO_SIGMA
}

/// Median of `data`, reordering it in place (quickselect).
///
/// Even lengths average the two middle values. Empty input yields 0.
pub fn median_f32_mut(data: &mut [f32]) -> f32 {
    let len = data.len();
    if len == 0 {
        return 0.0;
    }
    let mid = len / 2;

    let (left_part, upper, _) = data.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper;
    if len & 1 == 1 {
        upper
    } else {
        let lower = left_part.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        (lower + upper) * 0.5
    }
}

/// Median of `data` without touching it.
pub fn median_f32(data: &[f32]) -> f32 {
    let mut scratch = data.to_vec();
    median_f32_mut(&mut scratch)
}

/// MAD around a known `median`, using `scratch` as working storage.
pub fn mad_f32_with_scratch(values: &[f32], median: f32, scratch: &mut Vec<f32>) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    scratch.clear();
    scratch.extend(values.iter().map(|&v| (v - median).abs()));
    median_f32_mut(scratch)
}

/// Median and MAD together. Overwrites `data` with absolute deviations.
pub fn median_and_mad_f32_mut(data: &mut [f32]) -> (f32, f32) {
    let median = median_f32_mut(data);
    for v in data.iter_mut() {
        *v = (*v - median).abs();
    }
    let mad = median_f32_mut(data);
    (median, mad)
}

pub fn mean_f32(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f64 = data.iter().map(|&v| v as f64).sum();
    (sum / data.len() as f64) as f32
}

/// Mean and population standard deviation.
pub fn mean_std_f32(data: &[f32]) -> (f32, f32) {
    if data.is_empty() {
        return (0.0, 0.0);
    }
    let n = data.len() as f64;
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = data
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean as f32, var.sqrt() as f32)
}
