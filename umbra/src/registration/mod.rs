//! Frame alignment: estimate a transform from a moving frame onto a reference
//! frame and resample the moving frame with it.
//!
//! Estimation never fails loudly. Anything that prevents a transform yields
//! [`TransformEstimate::NotFound`], and applying that sentinel reports
//! [`AlignFailed`] without touching pixels. The pipeline turns `AlignFailed`
//! into a per-frame skip.

mod fit;
mod stars;
mod transform;
mod triangle;
mod warp;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

use crate::image_buffer::{ColorTriple, ImageBuffer};

pub use stars::{Star, DETECTION_SIGMA};
pub use transform::{Transform, TransformModel};
pub use warp::WarpMethod;

pub const ALIGN_SUFFIX: &str = "_align";

/// Why no transform could be estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NotFoundReason {
    #[strum(to_string = "too few stars detected")]
    TooFewStars,
    #[strum(to_string = "no star correspondences")]
    NoMatches,
    #[strum(to_string = "too few consistent correspondences")]
    TooFewInliers,
    #[strum(to_string = "degenerate star geometry")]
    Degenerate,
}

/// Result of transform estimation. `NotFound` is the "no transform" sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformEstimate {
    Found(Transform),
    NotFound { reason: NotFoundReason },
}

impl TransformEstimate {
    pub fn transform(&self) -> Option<&Transform> {
        match self {
            TransformEstimate::Found(t) => Some(t),
            TransformEstimate::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, TransformEstimate::Found(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignFailed {
    #[error("No transform for '{origin}': {reason}")]
    NoTransform {
        origin: String,
        reason: NotFoundReason,
    },
    #[error("Transform for '{origin}' is not invertible: {transform}")]
    Singular { origin: String, transform: Transform },
}

/// Point-correspondence capability: find the transform mapping `moving` onto `reference`.
pub trait TransformEstimator: Send + Sync {
    fn estimate(&self, moving: &ImageBuffer, reference: &ImageBuffer) -> TransformEstimate;
}

/// Alignment settings. All fields have defaults so configs may omit them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Stars kept per frame after detection, brightest first.
    pub max_stars: usize,
    /// Stars used to form triangles.
    pub triangle_stars: usize,
    /// Components smaller than this are treated as hot pixels.
    pub min_star_area: usize,
    pub ratio_tolerance: f64,
    pub min_votes: usize,
    /// Pixels.
    pub inlier_threshold: f64,
    pub min_inliers: usize,
    pub model: TransformModel,
    pub warp: WarpMethod,
    pub border_value: f32,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            max_stars: 50,
            triangle_stars: 15,
            min_star_area: 2,
            ratio_tolerance: 0.01,
            min_votes: 2,
            inlier_threshold: 2.0,
            min_inliers: 3,
            model: TransformModel::Similarity,
            warp: WarpMethod::Bilinear,
            border_value: 0.0,
        }
    }
}

/// Star detection + triangle matching + robust fit.
#[derive(Debug, Clone, Default)]
pub struct StarTriangleEstimator {
    config: AlignConfig,
}

impl StarTriangleEstimator {
    pub fn new(config: AlignConfig) -> Self {
        Self { config }
    }

    fn detect(&self, plane: &ImageBuffer) -> Vec<Star> {
        stars::detect_stars(
            plane,
            stars::DetectionParams {
                max_stars: self.config.max_stars,
                min_area: self.config.min_star_area,
            },
        )
    }

    fn try_estimate(
        &self,
        moving: &ImageBuffer,
        reference: &ImageBuffer,
    ) -> Result<Transform, NotFoundReason> {
        let c = &self.config;
        let moving_stars = self.detect(moving);
        let ref_stars = self.detect(reference);
        if moving_stars.len() < 3 || ref_stars.len() < 3 {
            return Err(NotFoundReason::TooFewStars);
        }

        let positions = |stars: &[Star]| -> Vec<glam::DVec2> {
            stars
                .iter()
                .take(c.triangle_stars)
                .map(|s| s.pos)
                .collect()
        };
        let moving_pos = positions(&moving_stars);
        let ref_pos = positions(&ref_stars);

        let matches = triangle::match_triangles(
            &ref_pos,
            &moving_pos,
            triangle::MatchParams {
                ratio_tolerance: c.ratio_tolerance,
                min_votes: c.min_votes,
                check_orientation: true,
            },
        );
        if matches.is_empty() {
            return Err(NotFoundReason::NoMatches);
        }

        let from: Vec<_> = matches.iter().map(|m| moving_pos[m.moving_idx]).collect();
        let to: Vec<_> = matches.iter().map(|m| ref_pos[m.ref_idx]).collect();
        let fit = fit::fit_robust(
            &from,
            &to,
            fit::FitParams {
                model: c.model,
                inlier_threshold: c.inlier_threshold,
                min_inliers: c.min_inliers,
            },
        )?;

        tracing::debug!(
            moving = %moving.origin,
            reference = %reference.origin,
            matches = matches.len(),
            inliers = fit.inliers,
            rms = fit.rms,
            "Fitted {}",
            fit.transform
        );
        Ok(fit.transform)
    }
}

impl TransformEstimator for StarTriangleEstimator {
    fn estimate(&self, moving: &ImageBuffer, reference: &ImageBuffer) -> TransformEstimate {
        match self.try_estimate(moving, reference) {
            Ok(transform) => TransformEstimate::Found(transform),
            Err(reason) => {
                tracing::debug!(moving = %moving.origin, %reason, "No transform");
                TransformEstimate::NotFound { reason }
            }
        }
    }
}

/// Estimates and applies alignment transforms.
pub struct FrameAligner {
    estimator: Box<dyn TransformEstimator>,
    warp: WarpMethod,
    border_value: f32,
}

impl Default for FrameAligner {
    fn default() -> Self {
        Self::new(AlignConfig::default())
    }
}

impl FrameAligner {
    pub fn new(config: AlignConfig) -> Self {
        Self {
            estimator: Box::new(StarTriangleEstimator::new(config)),
            warp: config.warp,
            border_value: config.border_value,
        }
    }

    /// Aligner with a custom estimator and the given resampling settings.
    pub fn with_estimator(
        estimator: Box<dyn TransformEstimator>,
        warp: WarpMethod,
        border_value: f32,
    ) -> Self {
        Self {
            estimator,
            warp,
            border_value,
        }
    }

    pub fn estimate_transform(
        &self,
        moving: &ImageBuffer,
        reference: &ImageBuffer,
    ) -> TransformEstimate {
        self.estimator.estimate(moving, reference)
    }

    /// Resample `target` into the reference frame. The output has `target`'s
    /// shape and origin `<origin>_align`.
    pub fn apply_transform(
        &self,
        target: &ImageBuffer,
        estimate: &TransformEstimate,
    ) -> Result<ImageBuffer, AlignFailed> {
        let transform = match estimate {
            TransformEstimate::Found(t) => t,
            TransformEstimate::NotFound { reason } => {
                return Err(AlignFailed::NoTransform {
                    origin: target.origin.clone(),
                    reason: *reason,
                });
            }
        };
        let to_source = transform.inverse().ok_or_else(|| AlignFailed::Singular {
            origin: target.origin.clone(),
            transform: *transform,
        })?;

        let data = warp::warp(&target.data, &to_source, self.warp, self.border_value);
        Ok(target.derive_with(data, ALIGN_SUFFIX))
    }

    /// Estimate once on the green planes and apply the same transform to all
    /// three planes of `moving`.
    pub fn align_triple(
        &self,
        moving: &ColorTriple,
        reference: &ColorTriple,
    ) -> Result<(ColorTriple, Transform), AlignFailed> {
        let estimate = self.estimate_transform(&moving.green, &reference.green);
        let green = self.apply_transform(&moving.green, &estimate)?;
        let red = self.apply_transform(&moving.red, &estimate)?;
        let blue = self.apply_transform(&moving.blue, &estimate)?;
        let transform = estimate.transform().copied().unwrap_or_default();
        Ok((ColorTriple { red, green, blue }, transform))
    }
}
