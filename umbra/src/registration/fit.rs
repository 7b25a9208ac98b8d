//! Robust transform fitting from matched point pairs.
//!
//! Hypotheses come from every pair of correspondences (a similarity is fully
//! determined by two points). The hypothesis with the most inliers wins and
//! the model is refitted by least squares on its inliers.

use glam::{DMat3, DVec2, DVec3};

use super::transform::{Transform, TransformModel};
use super::NotFoundReason;

#[derive(Debug, Clone, Copy)]
pub(crate) struct FitParams {
    pub model: TransformModel,
    /// Maximum residual of an inlier, in pixels.
    pub inlier_threshold: f64,
    pub min_inliers: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Fit {
    pub transform: Transform,
    pub inliers: usize,
    pub rms: f64,
}

fn centroid(points: &[DVec2]) -> DVec2 {
    points.iter().copied().sum::<DVec2>() / points.len() as f64
}

/// Least-squares similarity mapping `from` onto `to`.
pub(crate) fn estimate_similarity(from: &[DVec2], to: &[DVec2]) -> Option<Transform> {
    if from.len() < 2 {
        return None;
    }
    let from_c = centroid(from);
    let to_c = centroid(to);

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syx = 0.0;
    let mut syy = 0.0;
    let mut from_var = 0.0;
    for (f, t) in from.iter().zip(to) {
        let f = *f - from_c;
        let t = *t - to_c;
        sxx += f.x * t.x;
        sxy += f.x * t.y;
        syx += f.y * t.x;
        syy += f.y * t.y;
        from_var += f.length_squared();
    }
    if from_var < 1e-10 {
        return None;
    }

    let angle = (sxy - syx).atan2(sxx + syy);
    let (sin_a, cos_a) = angle.sin_cos();
    let scale = ((sxx + syy) * cos_a + (sxy - syx) * sin_a) / from_var;
    if scale <= 0.0 || !scale.is_finite() {
        return None;
    }

    let rotated = DVec2::new(
        cos_a * from_c.x - sin_a * from_c.y,
        sin_a * from_c.x + cos_a * from_c.y,
    );
    Some(Transform::similarity(to_c - scale * rotated, angle, scale))
}

/// Least-squares affine mapping `from` onto `to` via the normal equations.
pub(crate) fn estimate_affine(from: &[DVec2], to: &[DVec2]) -> Option<Transform> {
    if from.len() < 3 {
        return None;
    }
    // Centre for conditioning; the translation is restored afterwards.
    let from_c = centroid(from);
    let to_c = centroid(to);

    let mut normal = DMat3::ZERO;
    let mut rhs_x = DVec3::ZERO;
    let mut rhs_y = DVec3::ZERO;
    for (f, t) in from.iter().zip(to) {
        let f = *f - from_c;
        let t = *t - to_c;
        let row = DVec3::new(f.x, f.y, 1.0);
        normal += DMat3::from_cols(row * row.x, row * row.y, row * row.z);
        rhs_x += row * t.x;
        rhs_y += row * t.y;
    }

    let det = normal.determinant();
    if !det.is_finite() || det.abs() < 1e-9 {
        return None;
    }
    let inv = normal.inverse();
    let px = inv * rhs_x;
    let py = inv * rhs_y;

    // p_to = A (p_from - from_c) + c + to_c
    let a = [px.x, px.y];
    let c = [py.x, py.y];
    let tx = to_c.x + px.z - (a[0] * from_c.x + a[1] * from_c.y);
    let ty = to_c.y + py.z - (c[0] * from_c.x + c[1] * from_c.y);
    let transform = Transform::affine([a[0], a[1], tx], [c[0], c[1], ty]);
    transform.is_finite().then_some(transform)
}

fn estimate(model: TransformModel, from: &[DVec2], to: &[DVec2]) -> Option<Transform> {
    match model {
        TransformModel::Similarity => estimate_similarity(from, to),
        TransformModel::Affine => estimate_affine(from, to),
    }
}

/// Indices of pairs whose residual under `t` is within `threshold`, and their RMS.
fn inliers(t: &Transform, from: &[DVec2], to: &[DVec2], threshold: f64) -> (Vec<usize>, f64) {
    let mut idx = Vec::new();
    let mut sum_sq = 0.0;
    for (i, (f, r)) in from.iter().zip(to).enumerate() {
        let d = t.apply(*f).distance_squared(*r);
        if d <= threshold * threshold {
            idx.push(i);
            sum_sq += d;
        }
    }
    let rms = if idx.is_empty() {
        f64::INFINITY
    } else {
        (sum_sq / idx.len() as f64).sqrt()
    };
    (idx, rms)
}

/// Fit `params.model` mapping `moving[i]` onto `reference[i]`.
pub(crate) fn fit_robust(
    moving: &[DVec2],
    reference: &[DVec2],
    params: FitParams,
) -> Result<Fit, NotFoundReason> {
    debug_assert_eq!(moving.len(), reference.len());
    let required = params.min_inliers.max(params.model.min_points());
    if moving.len() < required {
        return Err(NotFoundReason::TooFewInliers);
    }

    let mut best: Option<(Vec<usize>, f64)> = None;
    for i in 0..moving.len() {
        for j in i + 1..moving.len() {
            let Some(hypothesis) =
                estimate_similarity(&[moving[i], moving[j]], &[reference[i], reference[j]])
            else {
                continue;
            };
            let (idx, rms) = inliers(&hypothesis, moving, reference, params.inlier_threshold);
            let better = match &best {
                None => true,
                Some((best_idx, best_rms)) => {
                    idx.len() > best_idx.len() || (idx.len() == best_idx.len() && rms < *best_rms)
                }
            };
            if better {
                best = Some((idx, rms));
            }
        }
    }

    let Some((mut inlier_idx, _)) = best else {
        return Err(NotFoundReason::Degenerate);
    };
    if inlier_idx.len() < required {
        return Err(NotFoundReason::TooFewInliers);
    }

    // Refit, re-select inliers, refit once more.
    let mut transform = Transform::identity();
    let mut rms = f64::INFINITY;
    for _ in 0..2 {
        let from: Vec<DVec2> = inlier_idx.iter().map(|&i| moving[i]).collect();
        let to: Vec<DVec2> = inlier_idx.iter().map(|&i| reference[i]).collect();
        transform = estimate(params.model, &from, &to).ok_or(NotFoundReason::Degenerate)?;
        let (idx, r) = inliers(&transform, moving, reference, params.inlier_threshold);
        if idx.len() < required {
            return Err(NotFoundReason::TooFewInliers);
        }
        inlier_idx = idx;
        rms = r;
    }

    Ok(Fit {
        transform,
        inliers: inlier_idx.len(),
        rms,
    })
}
