use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::Experiment;
use crate::cluster::{AgglomerativeClusterer, AxisAggregation, ObjectiveClusterer};
use crate::error::{Error, Result};
use crate::metrics::MetricTracker;
use crate::operators::Variation;
use crate::problem::Problem;
use crate::reference::ReferenceDirections;
use crate::run::RunContext;
use crate::termination::Termination;

/// Hypervolume reference point = nadir point scaled by this factor.
const NADIR_MARGIN: f64 = 1.1;

/// The serializable configuration of an [`Experiment`].
///
/// Written to `experiment.json` in the save directory.
///
/// # Defaults
///
/// | Option | Default |
/// |--------|---------|
/// | `pop_size` | 92 |
/// | `n_partitions` | 12 |
/// | `number_of_clusters` | original dimension (no reduction) |
/// | `interval_of_aggregations` | 0 (clustering disabled) |
/// | `aggregation` | [`AxisAggregation::Mean`] |
/// | `number_of_executions` | 1 |
/// | `use_different_seeds` | `true` |
/// | `base_seed` | 1 |
/// | `termination` | `MaxGenerations(100)` |
/// | `save_data`, `save_history`, `resume` | `false` |
/// | `save_dir` | `experiment_results` |
/// | `hv_reference_point` | problem nadir point x 1.1 |
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentSettings {
    /// Population size of every run.
    pub pop_size: usize,
    /// Das-Dennis partitions of the original reference directions.
    pub n_partitions: usize,
    /// Target reduced dimension `k`; `None` keeps the original dimension.
    pub number_of_clusters: Option<usize>,
    /// Generations between reductions; zero or negative disables clustering.
    pub interval_of_aggregations: i64,
    /// How clustered axes are combined.
    pub aggregation: AxisAggregation,
    /// Number of independent runs.
    pub number_of_executions: usize,
    /// Give run `i` the seed `base_seed + i` instead of `base_seed`.
    pub use_different_seeds: bool,
    /// Seed of run 0.
    pub base_seed: u64,
    /// Stopping criterion of every run.
    pub termination: Termination,
    /// Crossover and mutation settings.
    pub variation: Variation,
    /// Persist per-run results and aggregates.
    pub save_data: bool,
    /// Keep a post-selection snapshot of every generation.
    pub save_history: bool,
    /// Parent directory of the experiment directory.
    pub save_dir: PathBuf,
    /// Reuse runs already present in the run journal.
    pub resume: bool,
    /// Hypervolume reference point; defaults to the problem's nadir x 1.1.
    pub hv_reference_point: Option<Vec<f64>>,
    /// Partitions used to sample the true front for IGD; defaults to `n_partitions`.
    pub igd_partitions: Option<usize>,
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        Self {
            pop_size: 92,
            n_partitions: 12,
            number_of_clusters: None,
            interval_of_aggregations: 0,
            aggregation: AxisAggregation::Mean,
            number_of_executions: 1,
            use_different_seeds: true,
            base_seed: 1,
            termination: Termination::default(),
            variation: Variation::default(),
            save_data: false,
            save_history: false,
            save_dir: PathBuf::from("experiment_results"),
            resume: false,
            hv_reference_point: None,
            igd_partitions: None,
        }
    }
}

impl ExperimentSettings {
    /// Load settings from a JSON file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::persistence(None, "reading settings", path, e))?;
        serde_json::from_str(&text).map_err(|e| Error::persistence(None, "parsing settings", path, e))
    }

    /// `true` if runs will cluster their objective space.
    #[must_use]
    pub fn clustering_enabled(&self, n_obj: usize) -> bool {
        self.interval_of_aggregations > 0 && self.number_of_clusters.is_some_and(|k| k < n_obj)
    }

    /// Seed of run `index`.
    #[must_use]
    pub fn seed_for(&self, index: usize) -> u64 {
        if self.use_different_seeds {
            self.base_seed
                .wrapping_add(u64::try_from(index).unwrap_or(u64::MAX))
        } else {
            self.base_seed
        }
    }

    /// Deterministic name of the experiment directory.
    ///
    /// `OnlineClusterNSGA3_{problem}_{D}_{k}_{interval}` when clustering is
    /// enabled, `NSGA3_{problem}_{D}` otherwise.
    #[must_use]
    pub fn directory_name(&self, problem: &str, n_obj: usize) -> String {
        match self.number_of_clusters {
            Some(k) if self.clustering_enabled(n_obj) => format!(
                "OnlineClusterNSGA3_{problem}_{n_obj}_{k}_{}",
                self.interval_of_aggregations
            ),
            _ => format!("NSGA3_{problem}_{n_obj}"),
        }
    }

    /// `true` if runs under `other` produce the same results as runs under
    /// `self`. The run count, the seed policy and where or whether results
    /// are saved do not matter; seeds are checked per run.
    #[must_use]
    pub fn same_run_configuration(&self, other: &Self) -> bool {
        let run_relevant = |s: &Self| Self {
            number_of_executions: 0,
            use_different_seeds: false,
            base_seed: 0,
            save_data: false,
            save_dir: PathBuf::new(),
            resume: false,
            ..s.clone()
        };
        run_relevant(self) == run_relevant(other)
    }

    /// `true` if a stored run with `index` and `seed` is run `index` of
    /// these settings.
    #[must_use]
    pub fn owns_run(&self, index: usize, seed: u64) -> bool {
        index < self.number_of_executions && seed == self.seed_for(index)
    }

    pub(crate) fn validate(&self, n_obj: usize) -> Result<()> {
        if n_obj < 2 {
            return Err(Error::config("n_obj", "the problem needs at least 2 objectives"));
        }
        if self.pop_size == 0 {
            return Err(Error::config("pop_size", "must be at least 1"));
        }
        if self.n_partitions == 0 {
            return Err(Error::config("n_partitions", "must be at least 1"));
        }
        if self.number_of_executions == 0 {
            return Err(Error::config("number_of_executions", "must be at least 1"));
        }
        if let Some(k) = self.number_of_clusters
            && (k == 0 || k > n_obj)
        {
            return Err(Error::config(
                "number_of_clusters",
                format!("must be in 1..={n_obj}, got {k}"),
            ));
        }
        if let Some(point) = &self.hv_reference_point {
            if point.len() != n_obj {
                return Err(Error::DimensionMismatch {
                    expected: n_obj,
                    got: point.len(),
                });
            }
            if point.iter().any(|v| !v.is_finite()) {
                return Err(Error::config("hv_reference_point", "must be finite"));
            }
        }
        if self.igd_partitions == Some(0) {
            return Err(Error::config("igd_partitions", "must be at least 1"));
        }
        self.termination.validate()?;
        self.variation.validate()
    }
}

/// A builder for constructing [`Experiment`] instances with a fluent API.
///
/// Created via [`Experiment::builder()`]. Every option of
/// [`ExperimentSettings`] has a setter; the clustering strategy and the
/// original reference directions can be replaced too.
///
/// # Examples
///
/// ```
/// use online_cluster_nsga3::prelude::*;
///
/// let experiment = Experiment::builder(Dtlz2::new(5))
///     .pop_size(20)
///     .n_partitions(3)
///     .number_of_clusters(2)
///     .interval_of_aggregations(1)
///     .termination(Termination::MaxGenerations(5))
///     .build()
///     .unwrap();
///
/// assert_eq!(experiment.settings().pop_size, 20);
/// ```
pub struct ExperimentBuilder {
    problem: Arc<dyn Problem>,
    settings: ExperimentSettings,
    clusterer: Option<Arc<dyn ObjectiveClusterer>>,
    directions: Option<ReferenceDirections>,
}

impl ExperimentBuilder {
    pub(super) fn new(problem: Arc<dyn Problem>) -> Self {
        Self {
            problem,
            settings: ExperimentSettings::default(),
            clusterer: None,
            directions: None,
        }
    }

    /// Replace every setting at once.
    #[must_use]
    pub fn settings(mut self, settings: ExperimentSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the population size. Default: 92.
    #[must_use]
    pub fn pop_size(mut self, pop_size: usize) -> Self {
        self.settings.pop_size = pop_size;
        self
    }

    /// Set the Das-Dennis partitions of the original directions. Default: 12.
    #[must_use]
    pub fn n_partitions(mut self, n_partitions: usize) -> Self {
        self.settings.n_partitions = n_partitions;
        self
    }

    /// Use a custom original reference-direction set instead of
    /// generating one from `n_partitions`.
    #[must_use]
    pub fn reference_directions(mut self, directions: ReferenceDirections) -> Self {
        self.directions = Some(directions);
        self
    }

    /// Set the target reduced dimension `k`.
    #[must_use]
    pub fn number_of_clusters(mut self, k: usize) -> Self {
        self.settings.number_of_clusters = Some(k);
        self
    }

    /// Set the generations between reductions; zero or negative disables
    /// clustering. Default: 0.
    #[must_use]
    pub fn interval_of_aggregations(mut self, interval: i64) -> Self {
        self.settings.interval_of_aggregations = interval;
        self
    }

    /// Set how clustered axes are combined. Default: mean.
    #[must_use]
    pub fn aggregation(mut self, aggregation: AxisAggregation) -> Self {
        self.settings.aggregation = aggregation;
        self
    }

    /// Set the clustering strategy. Default: [`AgglomerativeClusterer`].
    #[must_use]
    pub fn clusterer(mut self, clusterer: impl ObjectiveClusterer + 'static) -> Self {
        self.clusterer = Some(Arc::new(clusterer));
        self
    }

    /// Set the number of independent runs. Default: 1.
    #[must_use]
    pub fn number_of_executions(mut self, n: usize) -> Self {
        self.settings.number_of_executions = n;
        self
    }

    /// Give every run its own seed. Default: `true`.
    #[must_use]
    pub fn use_different_seeds(mut self, enabled: bool) -> Self {
        self.settings.use_different_seeds = enabled;
        self
    }

    /// Set the seed of run 0. Default: 1.
    #[must_use]
    pub fn base_seed(mut self, seed: u64) -> Self {
        self.settings.base_seed = seed;
        self
    }

    /// Set the stopping criterion. Default: 100 generations.
    #[must_use]
    pub fn termination(mut self, termination: Termination) -> Self {
        self.settings.termination = termination;
        self
    }

    /// Set crossover and mutation parameters.
    #[must_use]
    pub fn variation(mut self, variation: Variation) -> Self {
        self.settings.variation = variation;
        self
    }

    /// Persist results under the save directory. Default: `false`.
    #[must_use]
    pub fn save_data(mut self, enabled: bool) -> Self {
        self.settings.save_data = enabled;
        self
    }

    /// Keep per-generation population snapshots. Default: `false`.
    #[must_use]
    pub fn save_history(mut self, enabled: bool) -> Self {
        self.settings.save_history = enabled;
        self
    }

    /// Set the parent directory of the experiment directory.
    #[must_use]
    pub fn save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.save_dir = dir.into();
        self
    }

    /// Reuse runs already stored in the run journal. Default: `false`.
    #[must_use]
    pub fn resume(mut self, enabled: bool) -> Self {
        self.settings.resume = enabled;
        self
    }

    /// Set the hypervolume reference point.
    #[must_use]
    pub fn hv_reference_point(mut self, point: Vec<f64>) -> Self {
        self.settings.hv_reference_point = Some(point);
        self
    }

    /// Build the [`Experiment`], validating every option.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for out-of-range options,
    /// when no hypervolume reference point is set and the problem has no
    /// nadir point, or when custom directions do not match the problem's
    /// objective count.
    pub fn build(self) -> Result<Experiment> {
        let n_obj = self.problem.n_obj();
        self.settings.validate(n_obj)?;

        let directions = match self.directions {
            Some(d) if d.dim() != n_obj => {
                return Err(Error::DimensionMismatch {
                    expected: n_obj,
                    got: d.dim(),
                });
            }
            Some(d) => d,
            None => ReferenceDirections::das_dennis(n_obj, self.settings.n_partitions)?,
        };

        let reference_point = match &self.settings.hv_reference_point {
            Some(point) => point.clone(),
            None => self
                .problem
                .nadir_point()
                .filter(|nadir| nadir.len() == n_obj)
                .map(|nadir| nadir.iter().map(|v| v * NADIR_MARGIN).collect())
                .ok_or_else(|| {
                    Error::config(
                        "hv_reference_point",
                        "must be set when the problem has no nadir point",
                    )
                })?,
        };
        let front = self.problem.pareto_front(
            self.settings
                .igd_partitions
                .unwrap_or(self.settings.n_partitions),
        );
        let tracker = MetricTracker::new(reference_point, front)?;

        let save_dir = self.settings.save_data.then(|| {
            self.settings
                .save_dir
                .join(self.settings.directory_name(self.problem.name(), n_obj))
        });

        let context = RunContext {
            problem: self.problem,
            directions,
            clusterer: self
                .clusterer
                .unwrap_or_else(|| Arc::new(AgglomerativeClusterer::default())),
            tracker,
            pop_size: self.settings.pop_size,
            number_of_clusters: self.settings.number_of_clusters.unwrap_or(n_obj),
            interval_of_aggregations: self.settings.interval_of_aggregations,
            aggregation: self.settings.aggregation,
            termination: self.settings.termination,
            variation: self.settings.variation.clone(),
            save_history: self.settings.save_history,
        };

        Ok(Experiment {
            settings: self.settings,
            context: Arc::new(context),
            save_dir,
            runs: Arc::new(RwLock::new(Vec::new())),
            result: RwLock::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Dtlz2;

    #[test]
    fn test_directory_names() {
        let mut s = ExperimentSettings::default();
        assert_eq!(s.directory_name("DTLZ2", 5), "NSGA3_DTLZ2_5");
        s.number_of_clusters = Some(2);
        s.interval_of_aggregations = 1;
        assert_eq!(s.directory_name("DTLZ2", 5), "OnlineClusterNSGA3_DTLZ2_5_2_1");
        s.number_of_clusters = Some(5);
        assert_eq!(s.directory_name("DTLZ2", 5), "NSGA3_DTLZ2_5");
    }

    #[test]
    fn test_seed_policy() {
        let mut s = ExperimentSettings {
            base_seed: 10,
            ..ExperimentSettings::default()
        };
        assert_eq!(s.seed_for(3), 13);
        s.use_different_seeds = false;
        assert_eq!(s.seed_for(3), 10);
    }

    #[test]
    fn test_same_run_configuration() {
        let base = ExperimentSettings::default();
        let more_runs = ExperimentSettings {
            number_of_executions: 5,
            base_seed: 7,
            save_data: true,
            resume: true,
            save_dir: PathBuf::from("elsewhere"),
            ..base.clone()
        };
        assert!(base.same_run_configuration(&more_runs));

        let smaller = ExperimentSettings {
            pop_size: 12,
            ..base.clone()
        };
        assert!(!base.same_run_configuration(&smaller));
        let longer = ExperimentSettings {
            termination: Termination::MaxGenerations(200),
            ..base.clone()
        };
        assert!(!base.same_run_configuration(&longer));
    }

    #[test]
    fn test_owns_run() {
        let s = ExperimentSettings {
            number_of_executions: 2,
            base_seed: 5,
            ..ExperimentSettings::default()
        };
        assert!(s.owns_run(1, 6));
        assert!(!s.owns_run(1, 5));
        assert!(!s.owns_run(2, 7));
    }

    #[test]
    fn test_rejects_invalid_options() {
        let cases: Vec<ExperimentBuilder> = vec![
            Experiment::builder(Dtlz2::new(5)).pop_size(0),
            Experiment::builder(Dtlz2::new(5)).number_of_executions(0),
            Experiment::builder(Dtlz2::new(5)).number_of_clusters(0),
            Experiment::builder(Dtlz2::new(5)).number_of_clusters(6),
            Experiment::builder(Dtlz2::new(5)).termination(Termination::MaxGenerations(0)),
            Experiment::builder(Dtlz2::new(5)).n_partitions(0),
        ];
        for builder in cases {
            assert!(matches!(builder.build(), Err(Error::InvalidConfiguration { .. })));
        }
    }

    #[test]
    fn test_reference_point_from_nadir() {
        let e = Experiment::builder(Dtlz2::new(3)).n_partitions(4).build().unwrap();
        assert_eq!(e.context.tracker.reference_point(), &[1.1, 1.1, 1.1]);
    }

    #[test]
    fn test_mismatched_directions() {
        let err = Experiment::builder(Dtlz2::new(3))
            .reference_directions(ReferenceDirections::das_dennis(4, 2).unwrap())
            .build();
        assert!(matches!(err, Err(Error::DimensionMismatch { expected: 3, got: 4 })));
    }

    #[test]
    fn test_settings_json_fills_defaults() {
        let settings: ExperimentSettings =
            serde_json::from_str(r#"{ "pop_size": 40, "interval_of_aggregations": 2 }"#).unwrap();
        assert_eq!(settings.pop_size, 40);
        assert_eq!(settings.interval_of_aggregations, 2);
        assert_eq!(settings.n_partitions, 12);
        assert_eq!(settings.termination, Termination::MaxGenerations(100));
    }
}
