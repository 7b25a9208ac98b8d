//! Scalar statistics shared by stacking, calibration and star detection.

pub mod statistics;

pub use statistics::{
    mad_f32_with_scratch, mad_to_sigma, mean_f32, mean_std_f32, median_and_mad_f32_mut,
    median_f32, median_f32_mut, MAD_TO_SIGMA,
};
