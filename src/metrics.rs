//! Convergence metrics tracked once per generation.
//!
//! Both metrics are always computed on the **original** objective
//! vectors, never on the clustered projection used for selection.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pareto;
use crate::population::{Individual, objective_matrix};

/// A tracked convergence metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Hypervolume against a fixed reference point (higher is better).
    Hypervolume,
    /// Inverted generational distance to a sampled true front (lower is better).
    Igd,
}

impl Metric {
    /// Both metrics, in persistence order.
    pub const ALL: [Metric; 2] = [Metric::Hypervolume, Metric::Igd];

    /// Name of the persisted curve file for this metric.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Metric::Hypervolume => "hv_convergence.txt",
            Metric::Igd => "igd_convergence.txt",
        }
    }

    /// Short label used in reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Metric::Hypervolume => "HV",
            Metric::Igd => "IGD",
        }
    }
}

impl core::fmt::Display for Metric {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Metric values of one generation of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceRecord {
    /// Generation index, starting at 0 for the initial population.
    pub generation: usize,
    /// Number of fitness evaluations spent so far.
    pub n_evals: usize,
    /// Hypervolume of the population.
    pub hypervolume: f64,
    /// IGD of the population, `None` when the true front is unknown.
    pub igd: Option<f64>,
}

impl ConvergenceRecord {
    /// Value of `metric` in this record, if tracked.
    #[must_use]
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Hypervolume => Some(self.hypervolume),
            Metric::Igd => self.igd,
        }
    }
}

/// Inverted generational distance: mean Euclidean distance from every
/// point of `front` to its nearest point in `points`.
///
/// Returns `f64::INFINITY` if `points` is empty and `0.0` if `front` is.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn igd(points: &[Vec<f64>], front: &[Vec<f64>]) -> f64 {
    if front.is_empty() {
        return 0.0;
    }
    if points.is_empty() {
        return f64::INFINITY;
    }
    let total: f64 = front
        .iter()
        .map(|z| {
            points
                .iter()
                .map(|p| {
                    p.iter()
                        .zip(z)
                        .map(|(a, b)| (a - b).powi(2))
                        .sum::<f64>()
                })
                .fold(f64::INFINITY, f64::min)
                .sqrt()
        })
        .sum();
    total / front.len() as f64
}

/// Computes [`ConvergenceRecord`]s for a fixed reference point and front.
///
/// Shared read-only between runs.
#[derive(Clone, Debug)]
pub struct MetricTracker {
    reference_point: Vec<f64>,
    pareto_front: Option<Vec<Vec<f64>>>,
}

impl MetricTracker {
    /// Create a tracker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if a front point's dimension
    /// differs from the reference point's.
    pub fn new(reference_point: Vec<f64>, pareto_front: Option<Vec<Vec<f64>>>) -> Result<Self> {
        if let Some(front) = &pareto_front
            && let Some(bad) = front.iter().find(|p| p.len() != reference_point.len())
        {
            return Err(Error::DimensionMismatch {
                expected: reference_point.len(),
                got: bad.len(),
            });
        }
        Ok(Self {
            reference_point,
            pareto_front,
        })
    }

    /// The hypervolume reference point.
    #[must_use]
    pub fn reference_point(&self) -> &[f64] {
        &self.reference_point
    }

    /// Whether IGD is tracked.
    #[must_use]
    pub fn tracks_igd(&self) -> bool {
        self.pareto_front.is_some()
    }

    /// Measure the valid members of a population.
    ///
    /// A population without valid members scores zero hypervolume and the
    /// IGD of the reference point alone, so every record stays finite.
    #[must_use]
    pub fn record(&self, generation: usize, n_evals: usize, population: &[Individual]) -> ConvergenceRecord {
        let mut objectives = objective_matrix(population);
        let hypervolume = pareto::hypervolume(&objectives, &self.reference_point);
        if objectives.is_empty() {
            objectives.push(self.reference_point.clone());
        }

        ConvergenceRecord {
            generation,
            n_evals,
            hypervolume,
            igd: self.pareto_front.as_ref().map(|front| igd(&objectives, front)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_igd_zero_on_front() {
        let front = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        assert!(igd(&front, &front).abs() < 1e-12);
    }

    #[test]
    fn test_igd_known_value() {
        let front = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let points = vec![vec![0.0, 2.0]];
        // distances: 1 and sqrt(1 + 4)
        let expected = (1.0 + 5.0_f64.sqrt()) / 2.0;
        assert!((igd(&points, &front) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_igd_empty_population() {
        assert!(igd(&[], &[vec![0.0]]).is_infinite());
    }

    #[test]
    fn test_record_of_invalid_population_is_finite() {
        let tracker = MetricTracker::new(vec![2.0, 2.0], Some(vec![vec![0.0, 1.0], vec![1.0, 0.0]])).unwrap();
        let mut dead = Individual::new(vec![0.5], 0);
        dead.mark_invalid(&crate::error::EvaluationError::Failed("diverged".into()));
        let record = tracker.record(0, 1, &[dead]);

        assert!(record.hypervolume.abs() < f64::EPSILON);
        let igd = record.igd.unwrap();
        assert!((igd - 5.0_f64.sqrt()).abs() < 1e-12);

        let json = serde_json::to_string(&record).unwrap();
        let back: ConvergenceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_tracker_rejects_mismatched_front() {
        let err = MetricTracker::new(vec![1.1, 1.1], Some(vec![vec![1.0, 0.0, 0.0]]));
        assert!(matches!(err, Err(Error::DimensionMismatch { expected: 2, got: 3 })));
    }

    #[test]
    fn test_metric_file_names() {
        assert_eq!(Metric::Hypervolume.file_name(), "hv_convergence.txt");
        assert_eq!(Metric::Igd.file_name(), "igd_convergence.txt");
    }
}
