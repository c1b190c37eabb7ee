//! NSGA-III environmental selection.
//!
//! Selection works on whatever objective space it is handed: the run
//! passes either the original objective vectors or their clustered
//! projection, together with reference directions of matching dimension.
//!
//! # Algorithm
//!
//! 1. **Non-dominated sorting** of the merged pool (constraint-aware).
//! 2. **Front filling**: whole fronts are accepted while they fit.
//! 3. **Normalization**: translate by the ideal point, scale by the
//!    intercepts of the hyperplane through the extreme points.
//! 4. **Association**: every candidate is attached to the reference
//!    direction with the smallest perpendicular distance.
//! 5. **Niching**: the partially fitting front is filled by repeatedly
//!    taking the reference direction with the fewest associates, breaking
//!    ties by the smallest perpendicular distance of its nearest remaining
//!    candidate and then by lowest index.
//!
//! Selection is fully deterministic.

use nalgebra::{DMatrix, DVector};

use crate::pareto;
use crate::reference::ReferenceDirections;

/// Outcome of one environmental selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    /// Indices of the survivors into the pool, in acceptance order.
    pub survivors: Vec<usize>,
    /// Front index of every pool member (0 = non-dominated).
    pub ranks: Vec<usize>,
    /// Associated reference direction of every pool member.
    pub niches: Vec<usize>,
}

/// Select at most `n_survivors` members of a pool.
///
/// `objectives[i]` must have the dimension of `directions`; `violations`
/// holds one non-negative constraint violation per member.
///
/// Guarantees: no survivor has a worse front index than any rejected
/// member, and `survivors.len() == min(n_survivors, pool size)`.
#[must_use]
pub fn environmental_selection(
    objectives: &[Vec<f64>],
    violations: &[f64],
    directions: &ReferenceDirections,
    n_survivors: usize,
) -> Selection {
    let n = objectives.len();
    let fronts = if violations.iter().any(|&v| v > 0.0) {
        pareto::non_dominated_sort_constrained(objectives, violations)
    } else {
        pareto::non_dominated_sort(objectives)
    };

    let mut ranks = vec![0_usize; n];
    for (rank, front) in fronts.iter().enumerate() {
        for &idx in front {
            ranks[idx] = rank;
        }
    }

    let normalization = Normalization::fit(objectives, directions.dim());
    let normalized: Vec<Vec<f64>> = objectives.iter().map(|v| normalization.apply(v)).collect();
    let associations = associate(&normalized, directions);

    let mut survivors: Vec<usize> = Vec::with_capacity(n_survivors.min(n));
    for front in &fronts {
        if survivors.len() + front.len() <= n_survivors {
            survivors.extend_from_slice(front);
            continue;
        }
        let remaining = n_survivors - survivors.len();
        let chosen = niching_select(&associations, &survivors, front, directions.len(), remaining);
        survivors.extend(chosen);
        break;
    }

    Selection {
        survivors,
        ranks,
        niches: associations.iter().map(|&(niche, _)| niche).collect(),
    }
}

/// Component-wise minimum of the pool.
fn ideal_point(values: &[Vec<f64>], dim: usize) -> Vec<f64> {
    let mut ideal = vec![f64::INFINITY; dim];
    for vals in values {
        for (z, &v) in ideal.iter_mut().zip(vals) {
            if v < *z {
                *z = v;
            }
        }
    }
    ideal
}

/// Translation by the ideal point followed by scaling with the intercepts
/// of the extreme-point hyperplane.
struct Normalization {
    ideal: Vec<f64>,
    intercepts: Vec<f64>,
}

impl Normalization {
    fn fit(values: &[Vec<f64>], dim: usize) -> Self {
        let ideal = ideal_point(values, dim);
        let intercepts = find_intercepts(values, &ideal);
        Self { ideal, intercepts }
    }

    /// Intercepts are always positive, so no axis divides by zero.
    fn apply(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(&self.ideal)
            .zip(&self.intercepts)
            .map(|((&v, &z), &a)| (v - z) / a)
            .collect()
    }
}

/// Pool member minimizing the achievement scalarization along `axis`.
///
/// Every axis except `axis` is weighted up by `1e6`, so the winner is the
/// member that is largest on `axis` relative to how small it is elsewhere.
/// The first of several equal members wins.
fn extreme_point<'a>(values: &'a [Vec<f64>], ideal: &[f64], axis: usize) -> &'a [f64] {
    let scalarized = |v: &[f64]| {
        v.iter()
            .zip(ideal)
            .enumerate()
            .map(|(j, (&x, &z))| if j == axis { x - z } else { (x - z) * 1e6 })
            .fold(f64::NEG_INFINITY, f64::max)
    };
    values
        .iter()
        .map(|v| (scalarized(v), v.as_slice()))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, v)| v)
        .unwrap_or_default()
}

/// Intercepts of the hyperplane through the extreme points.
///
/// Falls back to `max - ideal` per axis when the extreme points are
/// degenerate (singular system, non-positive or non-finite intercepts).
fn find_intercepts(values: &[Vec<f64>], ideal: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![1.0; ideal.len()];
    }
    let extremes: Vec<&[f64]> = (0..ideal.len())
        .map(|axis| extreme_point(values, ideal, axis))
        .collect();
    hyperplane_intercepts(&extremes, ideal).unwrap_or_else(|| nadir_intercepts(values, ideal))
}

fn hyperplane_intercepts(extremes: &[&[f64]], ideal: &[f64]) -> Option<Vec<f64>> {
    let m = ideal.len();
    let a = DMatrix::from_fn(m, m, |r, c| extremes[r][c] - ideal[c]);
    let b = a.lu().solve(&DVector::from_element(m, 1.0))?;
    let intercepts: Vec<f64> = b.iter().map(|&x| 1.0 / x).collect();
    intercepts
        .iter()
        .all(|&x| x.is_finite() && x > 1e-6)
        .then_some(intercepts)
}

/// Spread of the pool above the ideal point; a collapsed axis keeps scale 1.
fn nadir_intercepts(values: &[Vec<f64>], ideal: &[f64]) -> Vec<f64> {
    ideal
        .iter()
        .enumerate()
        .map(|(axis, &z)| {
            let spread = values
                .iter()
                .map(|v| v[axis])
                .fold(f64::NEG_INFINITY, f64::max)
                - z;
            if spread > 1e-10 { spread } else { 1.0 }
        })
        .collect()
}

/// `(direction index, perpendicular distance)` of the ray every point lies
/// closest to; ties go to the lower index.
fn associate(points: &[Vec<f64>], directions: &ReferenceDirections) -> Vec<(usize, f64)> {
    let units: Vec<Vec<f64>> = directions
        .points()
        .iter()
        .map(|d| {
            let norm = d.iter().map(|x| x * x).sum::<f64>().sqrt();
            d.iter().map(|x| x / norm).collect()
        })
        .collect();

    points
        .iter()
        .map(|p| {
            units
                .iter()
                .enumerate()
                .map(|(j, u)| {
                    let along: f64 = p.iter().zip(u).map(|(a, b)| a * b).sum();
                    let residual: f64 = p.iter().zip(u).map(|(a, b)| (a - along * b).powi(2)).sum();
                    (j, residual.sqrt())
                })
                .fold((0, f64::INFINITY), |best, cand| if cand.1 < best.1 { cand } else { best })
        })
        .collect()
}

/// Pick `remaining` members of `last_front` by niche count.
fn niching_select(
    associations: &[(usize, f64)],
    already_selected: &[usize],
    last_front: &[usize],
    n_reference_points: usize,
    remaining: usize,
) -> Vec<usize> {
    let mut niche_count = vec![0_usize; n_reference_points];
    for &idx in already_selected {
        niche_count[associations[idx].0] += 1;
    }

    // Candidates per reference direction, nearest first.
    let mut ref_candidates: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_reference_points];
    for &idx in last_front {
        let (ref_idx, dist) = associations[idx];
        ref_candidates[ref_idx].push((idx, dist));
    }
    for list in &mut ref_candidates {
        list.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    }
    let mut cursor = vec![0_usize; n_reference_points];

    let mut selected = Vec::with_capacity(remaining);
    while selected.len() < remaining {
        let best = (0..n_reference_points)
            .filter(|&j| cursor[j] < ref_candidates[j].len())
            .min_by(|&a, &b| {
                niche_count[a]
                    .cmp(&niche_count[b])
                    .then_with(|| {
                        ref_candidates[a][cursor[a]]
                            .1
                            .total_cmp(&ref_candidates[b][cursor[b]].1)
                    })
                    .then(a.cmp(&b))
            });
        let Some(j) = best else {
            break;
        };
        selected.push(ref_candidates[j][cursor[j]].0);
        cursor[j] += 1;
        niche_count[j] += 1;
    }

    selected
}
