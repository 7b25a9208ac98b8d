//! Geometric transform mapping moving-frame coordinates onto the reference frame.

use glam::{DAffine2, DMat2, DVec2};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Model fitted to the star correspondences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformModel {
    /// Translation + rotation + uniform scale (4 DOF).
    #[default]
    Similarity,
    /// Full affine (6 DOF).
    Affine,
}

impl TransformModel {
    /// Minimum number of correspondences to fit this model.
    pub fn min_points(&self) -> usize {
        match self {
            TransformModel::Similarity => 2,
            TransformModel::Affine => 3,
        }
    }
}

/// Affine map `reference = affine(moving)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub affine: DAffine2,
    pub model: TransformModel,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            affine: DAffine2::IDENTITY,
            model: TransformModel::Similarity,
        }
    }

    pub fn translation(t: DVec2) -> Self {
        Self {
            affine: DAffine2::from_translation(t),
            model: TransformModel::Similarity,
        }
    }

    /// Rotation by `angle` radians and uniform `scale` about the origin, then translation.
    pub fn similarity(t: DVec2, angle: f64, scale: f64) -> Self {
        Self {
            affine: DAffine2::from_scale_angle_translation(DVec2::splat(scale), angle, t),
            model: TransformModel::Similarity,
        }
    }

    /// Rows `[a, b, tx]` and `[c, d, ty]` of the 2x3 matrix.
    pub fn affine(row_x: [f64; 3], row_y: [f64; 3]) -> Self {
        let matrix2 = DMat2::from_cols(
            DVec2::new(row_x[0], row_y[0]),
            DVec2::new(row_x[1], row_y[1]),
        );
        Self {
            affine: DAffine2 {
                matrix2,
                translation: DVec2::new(row_x[2], row_y[2]),
            },
            model: TransformModel::Affine,
        }
    }

    #[inline]
    pub fn apply(&self, p: DVec2) -> DVec2 {
        self.affine.transform_point2(p)
    }

    /// Inverse map, or `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Transform> {
        let det = self.affine.matrix2.determinant();
        if !det.is_finite() || det.abs() < 1e-12 {
            return None;
        }
        Some(Self {
            affine: self.affine.inverse(),
            model: self.model,
        })
    }

    pub fn translation_components(&self) -> DVec2 {
        self.affine.translation
    }

    /// Rotation of the x axis, in radians.
    pub fn rotation_angle(&self) -> f64 {
        let x_axis = self.affine.matrix2.x_axis;
        x_axis.y.atan2(x_axis.x)
    }

    /// Geometric mean scale, `sqrt(|det|)`.
    pub fn scale_factor(&self) -> f64 {
        self.affine.matrix2.determinant().abs().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.affine.is_finite()
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = self.translation_components();
        write!(
            f,
            "{}(dx={:.2}, dy={:.2}, rot={:.3}°, scale={:.4})",
            self.model,
            t.x,
            t.y,
            self.rotation_angle().to_degrees(),
            self.scale_factor()
        )
    }
}
