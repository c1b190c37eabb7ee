//! Clustering of objective axes.
//!
//! An [`ObjectiveClusterer`] looks at the objective vectors of a sampled
//! population (an `N x D` matrix) and partitions the `D` objective **axes**
//! into `k` disjoint, non-empty groups, producing a [`ClusterAssignment`].
//! Each group then becomes one axis of a reduced objective space, whose
//! value is an [`AxisAggregation`] of the member axes.
//!
//! The clusterer is a strategy: experiments hold an
//! `Arc<dyn ObjectiveClusterer>` and default to
//! [`AgglomerativeClusterer`].
//!
//! ```
//! use online_cluster_nsga3::cluster::{AgglomerativeClusterer, ObjectiveClusterer};
//!
//! // Axes 0 and 1 move together, axis 2 moves against them.
//! let objectives = vec![
//!     vec![0.0, 0.1, 1.0],
//!     vec![0.5, 0.6, 0.5],
//!     vec![1.0, 1.1, 0.0],
//! ];
//! let assignment = AgglomerativeClusterer::default()
//!     .reduce(&objectives, 2)
//!     .unwrap();
//! assert_eq!(assignment.labels(), &[0, 0, 1]);
//! ```

mod agglomerative;

pub use agglomerative::{AgglomerativeClusterer, Linkage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Partitions the objective axes of a sampled population.
///
/// Implementations must be pure and must not depend on a random seed, so
/// that re-clustering an unchanged matrix yields the same partition.
pub trait ObjectiveClusterer: Send + Sync {
    /// Group the columns of `objectives` (`N` rows of length `D`) into
    /// `n_clusters` disjoint non-empty groups.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if `n_clusters > D`,
    /// `N < n_clusters`, or fewer than `n_clusters` axes are
    /// distinguishable. Returns [`Error::DimensionMismatch`] if rows have
    /// different lengths.
    fn reduce(&self, objectives: &[Vec<f64>], n_clusters: usize) -> Result<ClusterAssignment>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Maps every original objective axis to exactly one cluster label.
///
/// Labels are canonical: clusters are numbered in order of their
/// lowest-index member axis, so two equal partitions compare equal
/// regardless of how the clusterer numbered them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    labels: Vec<usize>,
    n_clusters: usize,
}

impl ClusterAssignment {
    /// Build an assignment from raw labels, relabelling canonically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if a label is `>= n_clusters`
    /// or a cluster is left empty.
    pub fn new(labels: &[usize], n_clusters: usize) -> Result<Self> {
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_clusters) {
            return Err(Error::config(
                "labels",
                format!("label {bad} out of range for {n_clusters} clusters"),
            ));
        }
        let mut mapping = vec![None; n_clusters];
        let mut next = 0;
        let canonical = labels
            .iter()
            .map(|&l| {
                *mapping[l].get_or_insert_with(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
        if next != n_clusters {
            return Err(Error::config(
                "labels",
                format!("{} of {n_clusters} clusters are empty", n_clusters - next),
            ));
        }
        Ok(Self {
            labels: canonical,
            n_clusters,
        })
    }

    /// Every axis in its own cluster.
    #[must_use]
    pub fn identity(n_axes: usize) -> Self {
        Self {
            labels: (0..n_axes).collect(),
            n_clusters: n_axes,
        }
    }

    /// Cluster label of every original axis.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of original axes.
    #[must_use]
    pub fn n_axes(&self) -> usize {
        self.labels.len()
    }

    /// Number of clusters (the reduced dimension).
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Member axes of every cluster, in label order.
    #[must_use]
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.n_clusters];
        for (axis, &label) in self.labels.iter().enumerate() {
            groups[label].push(axis);
        }
        groups
    }

    /// `true` if axes `a` and `b` share a cluster.
    #[must_use]
    pub fn same_cluster(&self, a: usize, b: usize) -> bool {
        self.labels[a] == self.labels[b]
    }

    /// `true` if every axis is alone in its cluster.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.n_clusters == self.labels.len()
    }

    /// Project one original objective vector onto the reduced axes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn project(&self, objectives: &[f64], aggregation: AxisAggregation) -> Vec<f64> {
        debug_assert_eq!(objectives.len(), self.labels.len());
        let mut acc = vec![
            match aggregation {
                AxisAggregation::Max => f64::NEG_INFINITY,
                AxisAggregation::Mean | AxisAggregation::Sum => 0.0,
            };
            self.n_clusters
        ];
        let mut counts = vec![0_usize; self.n_clusters];
        for (&v, &label) in objectives.iter().zip(&self.labels) {
            counts[label] += 1;
            match aggregation {
                AxisAggregation::Max => acc[label] = acc[label].max(v),
                AxisAggregation::Mean | AxisAggregation::Sum => acc[label] += v,
            }
        }
        if aggregation == AxisAggregation::Mean {
            for (a, &c) in acc.iter_mut().zip(&counts) {
                *a /= c as f64;
            }
        }
        acc
    }
}

/// How member axes are combined into one reduced axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisAggregation {
    /// Arithmetic mean of the member axes.
    #[default]
    Mean,
    /// Sum of the member axes.
    Sum,
    /// Worst (largest) member axis.
    Max,
}

/// Validate the shape of an objective matrix and return `(N, D)`.
pub(crate) fn matrix_shape(objectives: &[Vec<f64>]) -> Result<(usize, usize)> {
    let n = objectives.len();
    let d = objectives.first().map_or(0, Vec::len);
    if let Some(row) = objectives.iter().find(|r| r.len() != d) {
        return Err(Error::DimensionMismatch {
            expected: d,
            got: row.len(),
        });
    }
    Ok((n, d))
}
