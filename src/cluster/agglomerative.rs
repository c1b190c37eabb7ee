//! Bottom-up hierarchical clustering of objective axes.
//!
//! Every axis starts as its own cluster, described by its column of
//! values across the sampled population. The two closest clusters are
//! merged until `k` remain. Inter-cluster distances are updated with the
//! Lance-Williams recurrence for the chosen [`Linkage`].
//!
//! Ties are broken deterministically: among equally close pairs the one
//! with the lowest `(a, b)` index wins, so results never depend on a seed.

use serde::{Deserialize, Serialize};

use super::{ClusterAssignment, ObjectiveClusterer, matrix_shape};
use crate::error::{Error, Result};

/// Columns closer than this (squared Euclidean) count as the same axis.
const DISTINCT_EPS: f64 = 1e-12;

/// Distance between two clusters of axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// Minimum increase of within-cluster variance.
    #[default]
    Ward,
    /// Mean pairwise distance.
    Average,
    /// Largest pairwise distance.
    Complete,
    /// Smallest pairwise distance.
    Single,
}

/// Agglomerative clustering over objective axes.
///
/// # Examples
///
/// ```
/// use online_cluster_nsga3::cluster::{AgglomerativeClusterer, Linkage, ObjectiveClusterer};
///
/// let clusterer = AgglomerativeClusterer::new(Linkage::Average).standardize(true);
/// let objectives = vec![vec![1.0, 2.0, 0.0], vec![2.0, 4.0, 1.0], vec![3.0, 6.0, 0.0]];
/// let assignment = clusterer.reduce(&objectives, 2).unwrap();
/// assert!(assignment.same_cluster(0, 1));
/// ```
#[derive(Clone, Debug, Default)]
pub struct AgglomerativeClusterer {
    linkage: Linkage,
    standardize: bool,
}

impl AgglomerativeClusterer {
    /// Create a clusterer with the given linkage.
    #[must_use]
    pub fn new(linkage: Linkage) -> Self {
        Self {
            linkage,
            standardize: false,
        }
    }

    /// Scale every axis to zero mean and unit variance before clustering,
    /// so axes are grouped by correlation rather than by magnitude.
    #[must_use]
    pub fn standardize(mut self, enabled: bool) -> Self {
        self.standardize = enabled;
        self
    }

    /// The configured linkage.
    #[must_use]
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Columns of the matrix, optionally standardized.
    #[allow(clippy::cast_precision_loss)]
    fn axis_features(&self, objectives: &[Vec<f64>], d: usize) -> Vec<Vec<f64>> {
        let n = objectives.len() as f64;
        (0..d)
            .map(|axis| {
                let column: Vec<f64> = objectives.iter().map(|row| row[axis]).collect();
                if !self.standardize {
                    return column;
                }
                let mean = column.iter().sum::<f64>() / n;
                let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                let scale = if std > 1e-12 { std } else { 1.0 };
                column.iter().map(|v| (v - mean) / scale).collect()
            })
            .collect()
    }

    /// Lance-Williams update for the distance from `k` to the union `i ∪ j`.
    #[allow(clippy::cast_precision_loss, clippy::too_many_arguments)]
    fn merged_distance(
        &self,
        d_ki: f64,
        d_kj: f64,
        d_ij: f64,
        n_i: usize,
        n_j: usize,
        n_k: usize,
    ) -> f64 {
        let (ni, nj, nk) = (n_i as f64, n_j as f64, n_k as f64);
        match self.linkage {
            Linkage::Ward => ((ni + nk) * d_ki + (nj + nk) * d_kj - nk * d_ij) / (ni + nj + nk),
            Linkage::Average => (ni * d_ki + nj * d_kj) / (ni + nj),
            Linkage::Complete => d_ki.max(d_kj),
            Linkage::Single => d_ki.min(d_kj),
        }
    }
}

impl ObjectiveClusterer for AgglomerativeClusterer {
    fn reduce(&self, objectives: &[Vec<f64>], n_clusters: usize) -> Result<ClusterAssignment> {
        if n_clusters == 0 {
            return Err(Error::config("number_of_clusters", "must be at least 1"));
        }
        let (n, d) = matrix_shape(objectives)?;
        let features = self.axis_features(objectives, d);

        let squared = |a: &[f64], b: &[f64]| -> f64 {
            a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
        };

        let distinguishable = count_distinct(&features, &squared);
        if n_clusters > d || n < n_clusters || distinguishable < n_clusters {
            return Err(Error::InsufficientData {
                samples: n,
                axes: d,
                distinguishable,
                clusters: n_clusters,
            });
        }

        // Ward works on squared Euclidean distances, the others on plain ones.
        let mut dist = vec![vec![0.0_f64; d]; d];
        for a in 0..d {
            for b in (a + 1)..d {
                let sq = squared(&features[a], &features[b]);
                let v = if self.linkage == Linkage::Ward { sq } else { sq.sqrt() };
                dist[a][b] = v;
                dist[b][a] = v;
            }
        }

        // label[axis] = representative cluster index (lowest member axis).
        let mut label: Vec<usize> = (0..d).collect();
        let mut size = vec![1_usize; d];
        let mut active: Vec<usize> = (0..d).collect();

        while active.len() > n_clusters {
            let mut best = (0, 1);
            let mut best_dist = f64::INFINITY;
            for (pos, &a) in active.iter().enumerate() {
                for &b in &active[pos + 1..] {
                    if dist[a][b] < best_dist {
                        best_dist = dist[a][b];
                        best = (a, b);
                    }
                }
            }
            let (keep, absorb) = best;

            for &k in &active {
                if k == keep || k == absorb {
                    continue;
                }
                let v = self.merged_distance(
                    dist[k][keep],
                    dist[k][absorb],
                    dist[keep][absorb],
                    size[keep],
                    size[absorb],
                    size[k],
                );
                dist[k][keep] = v;
                dist[keep][k] = v;
            }

            size[keep] += size[absorb];
            for l in &mut label {
                if *l == absorb {
                    *l = keep;
                }
            }
            active.retain(|&c| c != absorb);
        }

        let raw: Vec<usize> = label
            .iter()
            .map(|l| active.iter().position(|c| c == l).unwrap_or(0))
            .collect();
        ClusterAssignment::new(&raw, n_clusters)
    }

    fn name(&self) -> &str {
        match self.linkage {
            Linkage::Ward => "agglomerative-ward",
            Linkage::Average => "agglomerative-average",
            Linkage::Complete => "agglomerative-complete",
            Linkage::Single => "agglomerative-single",
        }
    }
}

/// Number of pairwise-distinct feature columns.
fn count_distinct(features: &[Vec<f64>], squared: &impl Fn(&[f64], &[f64]) -> f64) -> usize {
    let mut representatives: Vec<&[f64]> = Vec::new();
    for f in features {
        if !representatives.iter().any(|r| squared(r, f) <= DISTINCT_EPS) {
            representatives.push(f);
        }
    }
    representatives.len()
}
