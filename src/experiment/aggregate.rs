//! Cross-run aggregation: convergence curves and axis co-association.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::Metric;
use crate::run::RunResult;

/// Statistics of one metric at one generation, across runs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatePoint {
    /// Generation index.
    pub generation: usize,
    /// Mean over runs.
    pub mean: f64,
    /// Population standard deviation over runs.
    pub std: f64,
    /// Smallest value over runs.
    pub min: f64,
    /// Largest value over runs.
    pub max: f64,
}

/// A metric aggregated over all runs, one point per generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateCurve {
    /// The aggregated metric.
    pub metric: Metric,
    /// One point per generation, generation 0 first.
    pub points: Vec<AggregatePoint>,
}

impl AggregateCurve {
    /// Number of generations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// `true` if no generation was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Mean value of every generation.
    #[must_use]
    pub fn means(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean).collect()
    }

    /// The last point.
    #[must_use]
    pub fn last(&self) -> Option<&AggregatePoint> {
        self.points.last()
    }
}

/// Aggregate `metric` over `runs`, aligned by generation index.
///
/// Returns `Ok(None)` when at least one run did not track the metric.
///
/// # Errors
///
/// Returns [`Error::NoResults`] for an empty slice and
/// [`Error::AggregationMismatch`] if runs recorded different numbers of
/// generations.
#[allow(clippy::cast_precision_loss)]
pub fn aggregate(runs: &[RunResult], metric: Metric) -> Result<Option<AggregateCurve>> {
    let Some(first) = runs.first() else {
        return Err(Error::NoResults);
    };
    let expected = first.convergence.len();
    if let Some(bad) = runs.iter().find(|r| r.convergence.len() != expected) {
        return Err(Error::AggregationMismatch {
            run: bad.index,
            expected,
            got: bad.convergence.len(),
        });
    }

    let Some(curves) = runs
        .iter()
        .map(|r| r.curve(metric))
        .collect::<Option<Vec<_>>>()
    else {
        return Ok(None);
    };

    let n = runs.len() as f64;
    let points = (0..expected)
        .map(|g| {
            let generation = first.convergence[g].generation;
            let values: Vec<f64> = curves.iter().map(|c| c[g].1).collect();
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            AggregatePoint {
                generation,
                mean,
                std: var.sqrt(),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect();

    Ok(Some(AggregateCurve { metric, points }))
}

/// How often pairs of objective axes were clustered together.
///
/// `frames[i][a][b]` is the fraction of reductions at `generations[i]`
/// (across all runs) that put axes `a` and `b` in the same cluster;
/// `overall` is the same fraction over every reduction of the experiment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatMap {
    /// Number of original objective axes.
    pub n_axes: usize,
    /// Generations at which at least one run applied a reduction.
    pub generations: Vec<usize>,
    /// One `n_axes x n_axes` co-association matrix per generation.
    pub frames: Vec<Vec<Vec<f64>>>,
    /// Co-association over all reductions.
    pub overall: Vec<Vec<f64>>,
    /// Total number of reductions observed.
    pub n_reductions: usize,
}

impl HeatMap {
    /// Build the heat map from the reduction histories of `runs`.
    #[must_use]
    pub fn from_runs(runs: &[RunResult], n_axes: usize) -> Self {
        let mut by_generation: BTreeMap<usize, Vec<_>> = BTreeMap::new();
        for record in runs.iter().flat_map(|r| &r.reductions) {
            if record.assignment.n_axes() == n_axes {
                by_generation
                    .entry(record.generation)
                    .or_default()
                    .push(&record.assignment);
            }
        }

        let all: Vec<_> = by_generation.values().flatten().copied().collect();
        Self {
            n_axes,
            generations: by_generation.keys().copied().collect(),
            frames: by_generation
                .values()
                .map(|assignments| co_association(assignments, n_axes))
                .collect(),
            overall: co_association(&all, n_axes),
            n_reductions: all.len(),
        }
    }

    /// `true` if no run ever reduced its objective space.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_reductions == 0
    }
}

#[allow(clippy::cast_precision_loss)]
fn co_association(assignments: &[&crate::cluster::ClusterAssignment], n_axes: usize) -> Vec<Vec<f64>> {
    let mut matrix = vec![vec![0.0; n_axes]; n_axes];
    if assignments.is_empty() {
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        return matrix;
    }
    for a in assignments {
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                if a.same_cluster(i, j) {
                    *cell += 1.0;
                }
            }
        }
    }
    let n = assignments.len() as f64;
    for cell in matrix.iter_mut().flatten() {
        *cell /= n;
    }
    matrix
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use super::*;
    use crate::cluster::ClusterAssignment;
    use crate::metrics::ConvergenceRecord;
    use crate::reducer::ReductionRecord;

    fn run(index: usize, hv: &[f64], igd: bool) -> RunResult {
        RunResult {
            index,
            seed: index as u64,
            population: Vec::new(),
            history: None,
            convergence: hv
                .iter()
                .enumerate()
                .map(|(g, &v)| ConvergenceRecord {
                    generation: g,
                    n_evals: 10 * (g + 1),
                    hypervolume: v,
                    igd: igd.then_some(1.0 - v),
                })
                .collect(),
            reductions: Vec::new(),
            n_evals: 10 * hv.len(),
            n_invalid: 0,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_mean_and_spread() {
        let runs = vec![run(0, &[0.1, 0.4], true), run(1, &[0.3, 0.6], true)];
        let curve = aggregate(&runs, Metric::Hypervolume).unwrap().unwrap();
        assert_eq!(curve.len(), 2);
        assert!((curve.points[0].mean - 0.2).abs() < 1e-12);
        assert!((curve.points[0].std - 0.1).abs() < 1e-12);
        assert!((curve.points[1].min - 0.4).abs() < 1e-12);
        assert!((curve.points[1].max - 0.6).abs() < 1e-12);
        let igd = aggregate(&runs, Metric::Igd).unwrap().unwrap();
        assert!((igd.points[1].mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let runs = vec![run(0, &[0.1, 0.2, 0.3], true), run(1, &[0.1, 0.2], true)];
        let err = aggregate(&runs, Metric::Hypervolume);
        assert!(matches!(
            err,
            Err(Error::AggregationMismatch {
                run: 1,
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn test_untracked_igd_is_none() {
        let runs = vec![run(0, &[0.1], true), run(1, &[0.2], false)];
        assert!(aggregate(&runs, Metric::Igd).unwrap().is_none());
    }

    #[test]
    fn test_empty_runs() {
        assert!(matches!(aggregate(&[], Metric::Hypervolume), Err(Error::NoResults)));
    }

    #[test]
    fn test_heat_map_fractions() {
        let mut a = run(0, &[0.1], false);
        let mut b = run(1, &[0.1], false);
        a.reductions.push(ReductionRecord {
            generation: 0,
            assignment: ClusterAssignment::new(&[0, 0, 1], 2).unwrap(),
        });
        b.reductions.push(ReductionRecord {
            generation: 0,
            assignment: ClusterAssignment::new(&[0, 1, 1], 2).unwrap(),
        });
        let map = HeatMap::from_runs(&[a, b], 3);
        assert_eq!(map.generations, vec![0]);
        assert_eq!(map.n_reductions, 2);
        assert!((map.frames[0][0][1] - 0.5).abs() < 1e-12);
        assert!((map.frames[0][1][2] - 0.5).abs() < 1e-12);
        assert!((map.frames[0][0][2]).abs() < 1e-12);
        assert!((map.overall[1][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_heat_map_without_reductions() {
        let map = HeatMap::from_runs(&[run(0, &[0.1], false)], 2);
        assert!(map.is_empty());
        assert_eq!(map.overall, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
