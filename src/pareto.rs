//! Pareto dominance, non-dominated sorting and the hypervolume indicator.
//!
//! All functions work in minimize-space: every objective is minimized.
//!
//! | Function | Purpose |
//! |---|---|
//! | [`dominates`] | Pareto dominance between two objective vectors |
//! | [`non_dominated_sort`] | Rank solutions into successive fronts (front 0, 1, …) |
//! | [`hypervolume`] | Volume dominated by a set, bounded by a reference point |
//!
//! ```
//! use online_cluster_nsga3::pareto::{hypervolume, non_dominated_sort};
//!
//! let solutions = vec![
//!     vec![1.0, 5.0], // Pareto-optimal
//!     vec![5.0, 1.0], // Pareto-optimal
//!     vec![3.0, 3.0], // Pareto-optimal
//!     vec![4.0, 4.0], // Dominated by (3, 3)
//! ];
//! let fronts = non_dominated_sort(&solutions);
//! assert_eq!(fronts.len(), 2);
//!
//! let hv = hypervolume(&solutions, &[6.0, 6.0]);
//! assert!(hv > 0.0);
//! ```

/// Returns `true` if `a` Pareto-dominates `b`: no worse in every
/// objective and strictly better in at least one.
#[must_use]
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    debug_assert_eq!(a.len(), b.len());

    let mut strictly_better = false;
    for (&av, &bv) in a.iter().zip(b) {
        if av > bv {
            return false;
        }
        if av < bv {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Constrained dominance: feasible beats infeasible, among infeasible
/// prefer lower violation, among feasible use Pareto dominance.
pub(crate) fn constrained_dominates(a: &[f64], b: &[f64], a_cv: f64, b_cv: f64) -> bool {
    let a_feasible = a_cv <= 0.0;
    let b_feasible = b_cv <= 0.0;

    match (a_feasible, b_feasible) {
        (true, false) => true,
        (false, true) => false,
        (false, false) => a_cv < b_cv,
        (true, true) => dominates(a, b),
    }
}

/// Fast non-dominated sorting (Deb et al., 2002).
///
/// Returns `Vec<Vec<usize>>` where `fronts[0]` is the Pareto front and
/// each inner vec contains indices into `values`.
///
/// Complexity: O(M * N^2) where M = objectives, N = solutions.
#[must_use]
pub fn non_dominated_sort(values: &[Vec<f64>]) -> Vec<Vec<usize>> {
    non_dominated_sort_constrained(values, &[])
}

/// Fast non-dominated sorting with a scalar constraint violation per
/// solution.
///
/// `violations` is either empty (no constraints) or has the same length
/// as `values`; entries `<= 0.0` are feasible.
#[must_use]
pub fn non_dominated_sort_constrained(values: &[Vec<f64>], violations: &[f64]) -> Vec<Vec<usize>> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let has_constraints = !violations.is_empty();
    debug_assert!(!has_constraints || violations.len() == n);

    // S_p: set of solutions dominated by p
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    // n_p: domination count for p
    let mut domination_count: Vec<usize> = vec![0; n];

    for i in 0..n {
        for j in (i + 1)..n {
            let (i_dom_j, j_dom_i) = if has_constraints {
                (
                    constrained_dominates(&values[i], &values[j], violations[i], violations[j]),
                    constrained_dominates(&values[j], &values[i], violations[j], violations[i]),
                )
            } else {
                (
                    dominates(&values[i], &values[j]),
                    dominates(&values[j], &values[i]),
                )
            };

            if i_dom_j {
                dominated_by[i].push(j);
                domination_count[j] += 1;
            } else if j_dom_i {
                dominated_by[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current_front: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();

    while !current_front.is_empty() {
        let mut next_front: Vec<usize> = Vec::new();
        for &p in &current_front {
            for &q in &dominated_by[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next_front.push(q);
                }
            }
        }
        fronts.push(current_front);
        current_front = next_front;
    }

    fronts
}

/// Compute the hypervolume indicator of a point set.
///
/// The hypervolume is the volume of objective space dominated by `points`
/// and bounded by `reference_point`. A **higher** hypervolume indicates a
/// better front. Points that do not strictly dominate the reference point
/// are ignored; dominated points contribute nothing.
///
/// Uses slicing on the last objective with an incrementally maintained
/// non-dominated set per slice, and a sweep for the two-dimensional base
/// case.
#[must_use]
pub fn hypervolume(points: &[Vec<f64>], reference_point: &[f64]) -> f64 {
    let d = reference_point.len();
    if points.is_empty() || d == 0 {
        return 0.0;
    }
    debug_assert!(points.iter().all(|p| p.len() == d));

    // Keep only points strictly dominated by the reference point.
    let filtered: Vec<Vec<f64>> = points
        .iter()
        .filter(|p| p.iter().zip(reference_point).all(|(&pv, &rv)| pv < rv))
        .cloned()
        .collect();

    if filtered.is_empty() {
        return 0.0;
    }

    hv_recursive(&non_dominated_subset(filtered), reference_point)
}

/// Recursive hypervolume via slicing on the last objective.
///
/// All points are non-dominated and strictly dominated by `reference`.
fn hv_recursive(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let d = reference.len();

    if d == 1 {
        let min_val = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return (reference[0] - min_val).max(0.0);
    }

    if points.len() == 1 {
        return points[0]
            .iter()
            .zip(reference)
            .map(|(&p, &r)| (r - p).max(0.0))
            .product();
    }

    if d == 2 {
        return hv_2d(points, reference);
    }

    // Sort by last objective ascending.
    let mut sorted: Vec<&Vec<f64>> = points.iter().collect();
    sorted.sort_by(|a, b| a[d - 1].total_cmp(&b[d - 1]));

    let sub_ref = &reference[..d - 1];
    let mut slice_front: Vec<Vec<f64>> = Vec::with_capacity(sorted.len());
    let mut result = 0.0;

    for i in 0..sorted.len() {
        insert_non_dominated(&mut slice_front, sorted[i][..d - 1].to_vec());

        let height = if i + 1 < sorted.len() {
            sorted[i + 1][d - 1] - sorted[i][d - 1]
        } else {
            reference[d - 1] - sorted[i][d - 1]
        };
        if height <= 0.0 {
            continue;
        }

        result += height * hv_recursive(&slice_front, sub_ref);
    }

    result
}

/// Exact 2-D hypervolume by sweeping over the first objective.
fn hv_2d(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let mut sorted: Vec<&Vec<f64>> = points.iter().collect();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));

    let mut area = 0.0;
    let mut best_y = reference[1];
    for p in sorted {
        if p[1] < best_y {
            area += (reference[0] - p[0]) * (best_y - p[1]);
            best_y = p[1];
        }
    }
    area
}

/// Add `candidate` to a non-dominated set, evicting the members it
/// dominates. Dominated or duplicate candidates are dropped.
fn insert_non_dominated(front: &mut Vec<Vec<f64>>, candidate: Vec<f64>) {
    if front
        .iter()
        .any(|q| q.iter().zip(&candidate).all(|(&qv, &cv)| qv <= cv))
    {
        return;
    }
    front.retain(|q| !dominates(&candidate, q));
    front.push(candidate);
}

/// Return the non-dominated subset of `points`, dropping duplicates.
fn non_dominated_subset(points: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let mut front = Vec::with_capacity(points.len());
    for p in points {
        insert_non_dominated(&mut front, p);
    }
    front
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominates_basic() {
        assert!(dominates(&[1.0, 1.0], &[2.0, 2.0]));
        assert!(!dominates(&[2.0, 2.0], &[1.0, 1.0]));
        // Equal does not dominate
        assert!(!dominates(&[1.0, 1.0], &[1.0, 1.0]));
    }

    #[test]
    fn test_dominates_incomparable() {
        assert!(!dominates(&[1.0, 3.0], &[3.0, 1.0]));
        assert!(!dominates(&[3.0, 1.0], &[1.0, 3.0]));
    }

    #[test]
    fn test_constrained_dominance() {
        // Feasible beats infeasible regardless of objectives.
        assert!(constrained_dominates(&[9.0, 9.0], &[1.0, 1.0], 0.0, 0.5));
        // Lower violation wins among infeasible.
        assert!(constrained_dominates(&[9.0, 9.0], &[1.0, 1.0], 0.1, 0.5));
        assert!(!constrained_dominates(&[1.0, 1.0], &[9.0, 9.0], 0.5, 0.1));
    }

    #[test]
    fn test_nds_known() {
        let values = vec![
            vec![1.0, 5.0], // front 0
            vec![5.0, 1.0], // front 0
            vec![3.0, 3.0], // front 0 (non-dominated)
            vec![4.0, 4.0], // front 1 (dominated by #2)
            vec![6.0, 6.0], // front 2
        ];
        let fronts = non_dominated_sort(&values);

        assert_eq!(fronts.len(), 3);
        let mut f0 = fronts[0].clone();
        f0.sort_unstable();
        assert_eq!(f0, vec![0, 1, 2]);
        assert_eq!(fronts[1], vec![3]);
        assert_eq!(fronts[2], vec![4]);
    }

    #[test]
    fn test_nds_constrained_puts_infeasible_last() {
        let values = vec![vec![1.0, 1.0], vec![2.0, 2.0]];
        let fronts = non_dominated_sort_constrained(&values, &[1.0, 0.0]);
        assert_eq!(fronts, vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_hypervolume_2d() {
        // Front: (1,3), (2,2), (3,1) with ref (4,4)
        let front = vec![vec![1.0, 3.0], vec![2.0, 2.0], vec![3.0, 1.0]];
        let hv = hypervolume(&front, &[4.0, 4.0]);
        // Strips of area 1, 2 and 3
        assert!((hv - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_hypervolume_ignores_dominated_and_duplicates() {
        let front = vec![
            vec![1.0, 3.0],
            vec![2.0, 2.0],
            vec![3.0, 1.0],
            vec![3.0, 3.0],
            vec![2.0, 2.0],
        ];
        assert!((hypervolume(&front, &[4.0, 4.0]) - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_hypervolume_single_point() {
        let hv = hypervolume(&[vec![1.0, 1.0]], &[3.0, 3.0]);
        assert!((hv - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_hypervolume_point_at_ref() {
        let hv = hypervolume(&[vec![5.0, 5.0]], &[5.0, 5.0]);
        assert!(hv.abs() < f64::EPSILON);
    }

    #[test]
    fn test_hypervolume_3d_union_of_boxes() {
        // Two boxes of volume 1*2*2 = 4 each overlapping in 1*1*... :
        // a = (0,1,1), b = (1,0,1), ref = (2,2,2)
        // vol(a) = 2*1*1 = 2, vol(b) = 1*2*1 = 2, overlap = 1*1*1 = 1
        let front = vec![vec![0.0, 1.0, 1.0], vec![1.0, 0.0, 1.0]];
        let hv = hypervolume(&front, &[2.0, 2.0, 2.0]);
        assert!((hv - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_hypervolume_4d_single_point() {
        let hv = hypervolume(&[vec![0.5; 4]], &[1.0; 4]);
        assert!((hv - 0.0625).abs() < 1e-12);
    }
}
