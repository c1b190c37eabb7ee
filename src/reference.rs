//! Reference directions on the unit simplex.
//!
//! NSGA-III niches the population around a fixed set of directions in
//! objective space. The directions are the Das-Dennis (simplex-lattice)
//! points: every vector is non-negative and sums to one.
//!
//! A [`ReferenceDirections`] value is immutable. The experiment builds the
//! [`Original`](DirectionKind::Original) set once and shares it read-only
//! between runs; each run creates [`Reduced`](DirectionKind::Reduced) sets
//! of its own whenever the objective space is clustered.
//!
//! ```
//! use online_cluster_nsga3::reference::ReferenceDirections;
//!
//! let dirs = ReferenceDirections::das_dennis(3, 4).unwrap();
//! assert_eq!(dirs.len(), 15);
//! assert_eq!(dirs.dim(), 3);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Whether a direction set spans the original or a reduced objective space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionKind {
    /// Directions in the problem's own objective space.
    Original,
    /// Directions in a clustered, lower-dimensional objective space.
    Reduced,
}

/// An immutable set of unit-simplex points.
///
/// Cloning is cheap: the points live behind an [`Arc`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceDirections {
    kind: DirectionKind,
    dim: usize,
    partitions: usize,
    points: Arc<[Vec<f64>]>,
}

impl ReferenceDirections {
    /// Generate the original Das-Dennis set for `dim` objectives with
    /// `partitions` divisions per axis.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `dim` or `partitions`
    /// is zero.
    pub fn das_dennis(dim: usize, partitions: usize) -> Result<Self> {
        Self::generate(DirectionKind::Original, dim, partitions)
    }

    /// Generate a reduced set for `dim` clustered axes, choosing the
    /// smallest partition count that yields at least `target` points.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `dim` is zero.
    pub fn reduced(dim: usize, target: usize) -> Result<Self> {
        let partitions = auto_partitions(dim, target);
        Self::generate(DirectionKind::Reduced, dim, partitions)
    }

    fn generate(kind: DirectionKind, dim: usize, partitions: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::config("dim", "must be at least 1"));
        }
        if partitions == 0 {
            return Err(Error::config("n_partitions", "must be at least 1"));
        }
        Ok(Self {
            kind,
            dim,
            partitions,
            points: das_dennis(dim, partitions).into(),
        })
    }

    /// Original or reduced.
    #[must_use]
    pub fn kind(&self) -> DirectionKind {
        self.kind
    }

    /// Dimension of every direction.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of divisions per axis used to build the lattice.
    #[must_use]
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// The directions themselves.
    #[must_use]
    pub fn points(&self) -> &[Vec<f64>] {
        &self.points
    }

    /// Number of directions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// `true` if the set holds no directions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Generate Das-Dennis (simplex-lattice) reference points.
///
/// Returns `C(H + M - 1, M - 1)` uniformly spaced points on the
/// `M`-dimensional unit simplex, where `M = n_objectives` and
/// `H = divisions`.
#[must_use]
pub fn das_dennis(n_objectives: usize, divisions: usize) -> Vec<Vec<f64>> {
    if n_objectives == 0 {
        return Vec::new();
    }
    if n_objectives == 1 {
        return vec![vec![1.0]];
    }
    let mut points = Vec::new();
    let mut point = vec![0.0_f64; n_objectives];
    das_dennis_recursive(
        n_objectives,
        divisions,
        0,
        divisions,
        &mut point,
        &mut points,
    );
    points
}

#[allow(clippy::cast_precision_loss)]
fn das_dennis_recursive(
    n_objectives: usize,
    divisions: usize,
    depth: usize,
    remaining: usize,
    current: &mut Vec<f64>,
    result: &mut Vec<Vec<f64>>,
) {
    if depth == n_objectives - 1 {
        current[depth] = remaining as f64 / divisions as f64;
        result.push(current.clone());
        return;
    }

    for i in 0..=remaining {
        current[depth] = i as f64 / divisions as f64;
        das_dennis_recursive(
            n_objectives,
            divisions,
            depth + 1,
            remaining - i,
            current,
            result,
        );
    }
}

/// Choose the number of divisions for Das-Dennis to reach a target
/// number of points.
///
/// The number of reference points is `C(H + M - 1, M - 1)`. This function
/// finds the smallest `H` such that the number of points >= `target`.
#[must_use]
pub fn auto_partitions(n_objectives: usize, target: usize) -> usize {
    let m = n_objectives.max(1);
    if m == 1 {
        return 1;
    }
    for h in 1..1000 {
        if n_combinations(h + m - 1, m - 1) >= target {
            return h;
        }
    }
    12
}

/// Compute `C(n, k)` = n! / (k! * (n-k)!).
#[must_use]
pub fn n_combinations(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: usize = 1;
    for i in 0..k {
        result = result.saturating_mul(n - i) / (i + 1);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_das_dennis_2d() {
        let points = das_dennis(2, 4);
        // C(4+1, 1) = 5 points
        assert_eq!(points.len(), 5);
        for p in &points {
            let sum: f64 = p.iter().sum();
            assert!((sum - 1.0).abs() < 1e-10, "point {p:?} doesn't sum to 1");
        }
    }

    #[test]
    fn test_das_dennis_five_objectives_twelve_partitions() {
        let dirs = ReferenceDirections::das_dennis(5, 12).unwrap();
        // C(16, 4)
        assert_eq!(dirs.len(), 1820);
        assert_eq!(dirs.kind(), DirectionKind::Original);
        assert!(
            dirs.points()
                .iter()
                .all(|p| p.iter().all(|&v| v >= 0.0) && (p.iter().sum::<f64>() - 1.0).abs() < 1e-10)
        );
    }

    #[test]
    fn test_reduced_reaches_target() {
        let dirs = ReferenceDirections::reduced(2, 92).unwrap();
        assert_eq!(dirs.kind(), DirectionKind::Reduced);
        assert_eq!(dirs.dim(), 2);
        assert_eq!(dirs.len(), 92);
    }

    #[test]
    fn test_single_axis() {
        let dirs = ReferenceDirections::reduced(1, 92).unwrap();
        assert_eq!(dirs.points(), &[vec![1.0]]);
    }

    #[test]
    fn test_rejects_zero() {
        assert!(ReferenceDirections::das_dennis(0, 12).is_err());
        assert!(ReferenceDirections::das_dennis(3, 0).is_err());
    }

    #[test]
    fn test_auto_partitions() {
        let h3 = auto_partitions(3, 91);
        assert_eq!(h3, 12);
        assert!(n_combinations(h3 + 2, 2) >= 91);
    }

    #[test]
    fn test_n_combinations() {
        assert_eq!(n_combinations(5, 2), 10);
        assert_eq!(n_combinations(4, 0), 1);
        assert_eq!(n_combinations(6, 3), 20);
    }
}
