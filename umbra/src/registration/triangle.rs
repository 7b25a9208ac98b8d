//! Scale and rotation invariant triangle matching between two star lists.
//!
//! Every triangle over the brightest stars is described by its two side
//! ratios `(shortest / longest, middle / longest)`. Similar triangles in the
//! two lists vote for the correspondence of their vertices, and the votes are
//! resolved greedily into one-to-one point matches.

use std::collections::HashMap;

use glam::DVec2;

/// Reject triangles whose longest side exceeds this multiple of the shortest.
const MAX_SIDE_RATIO: f64 = 10.0;

/// Minimum squared area (Heron) of an accepted triangle, in px⁴.
const MIN_TRIANGLE_AREA_SQ: f64 = 1e-6;

const MIN_TRIANGLE_SIDE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone)]
struct Triangle {
    /// Point indices ordered by the length of the opposite side, shortest first.
    indices: [usize; 3],
    ratios: (f64, f64),
    orientation: Orientation,
}

impl Triangle {
    fn from_positions(indices: [usize; 3], positions: [DVec2; 3]) -> Option<Self> {
        let [p0, p1, p2] = positions;
        let d01 = (p1 - p0).length();
        let d12 = (p2 - p1).length();
        let d20 = (p0 - p2).length();
        if d01 < MIN_TRIANGLE_SIDE || d12 < MIN_TRIANGLE_SIDE || d20 < MIN_TRIANGLE_SIDE {
            return None;
        }

        // (side length, index of the vertex opposite to it)
        let mut sides = [(d01, 2usize), (d12, 0), (d20, 1)];
        sides.sort_by(|a, b| a.0.total_cmp(&b.0));
        let [short, middle, long] = [sides[0].0, sides[1].0, sides[2].0];

        if long / short > MAX_SIDE_RATIO {
            return None;
        }

        let s = (short + middle + long) / 2.0;
        let area_sq = s * (s - short) * (s - middle) * (s - long);
        if area_sq < MIN_TRIANGLE_AREA_SQ {
            return None;
        }

        let ordered = [sides[0].1, sides[1].1, sides[2].1];
        let [a, b, c] = ordered.map(|k| positions[k]);
        let cross = (b - a).perp_dot(c - a);
        if cross.abs() < 1e-10 * long * long {
            return None;
        }

        Some(Self {
            indices: ordered.map(|k| indices[k]),
            ratios: (short / long, middle / long),
            orientation: if cross > 0.0 {
                Orientation::CounterClockwise
            } else {
                Orientation::Clockwise
            },
        })
    }

    fn is_similar(&self, other: &Triangle, tolerance: f64) -> bool {
        (self.ratios.0 - other.ratios.0).abs() < tolerance
            && (self.ratios.1 - other.ratios.1).abs() < tolerance
    }
}

/// All non-degenerate triangles over `positions`.
fn form_triangles(positions: &[DVec2]) -> Vec<Triangle> {
    let n = positions.len();
    let mut triangles = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                if let Some(t) =
                    Triangle::from_positions([i, j, k], [positions[i], positions[j], positions[k]])
                {
                    triangles.push(t);
                }
            }
        }
    }
    triangles
}

/// A matched point pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PointMatch {
    pub ref_idx: usize,
    pub moving_idx: usize,
    pub votes: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MatchParams {
    pub ratio_tolerance: f64,
    pub min_votes: usize,
    /// Reflections never occur between exposures of one camera.
    pub check_orientation: bool,
}

/// One-to-one correspondences between `reference` and `moving`, best voted first.
pub(crate) fn match_triangles(
    reference: &[DVec2],
    moving: &[DVec2],
    params: MatchParams,
) -> Vec<PointMatch> {
    if reference.len() < 3 || moving.len() < 3 {
        return Vec::new();
    }

    let ref_triangles = form_triangles(reference);
    let moving_triangles = form_triangles(moving);

    let mut votes: HashMap<(usize, usize), usize> = HashMap::new();
    for mt in &moving_triangles {
        for rt in &ref_triangles {
            if !rt.is_similar(mt, params.ratio_tolerance) {
                continue;
            }
            if params.check_orientation && rt.orientation != mt.orientation {
                continue;
            }
            for (&r, &m) in rt.indices.iter().zip(&mt.indices) {
                *votes.entry((r, m)).or_insert(0) += 1;
            }
        }
    }

    resolve_matches(votes, reference.len(), moving.len(), params.min_votes)
}

/// Greedy one-to-one assignment by descending vote count.
fn resolve_matches(
    votes: HashMap<(usize, usize), usize>,
    n_ref: usize,
    n_moving: usize,
    min_votes: usize,
) -> Vec<PointMatch> {
    let mut candidates: Vec<PointMatch> = votes
        .into_iter()
        .filter(|&(_, v)| v >= min_votes)
        .map(|((ref_idx, moving_idx), votes)| PointMatch {
            ref_idx,
            moving_idx,
            votes,
        })
        .collect();
    // Ties broken by index so the result does not depend on hash order.
    candidates.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then(a.ref_idx.cmp(&b.ref_idx))
            .then(a.moving_idx.cmp(&b.moving_idx))
    });

    let mut used_ref = vec![false; n_ref];
    let mut used_moving = vec![false; n_moving];
    let mut resolved = Vec::new();
    for m in candidates {
        if !used_ref[m.ref_idx] && !used_moving[m.moving_idx] {
            used_ref[m.ref_idx] = true;
            used_moving[m.moving_idx] = true;
            resolved.push(m);
        }
    }
    resolved
}
