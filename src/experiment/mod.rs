//! Multi-run experiment harness.
//!
//! An [`Experiment`] runs `number_of_executions` independent
//! [`Run`]s of the same configuration, aggregates their convergence
//! curves generation by generation and, when `save_data` is set, persists
//! every run and the aggregates under a deterministic directory.
//!
//! Runs share only read-only state: the problem, the original reference
//! directions, the clusterer and the metric tracker. Each run owns its
//! population, seed and reducer.
//!
//! # Examples
//!
//! ```
//! use online_cluster_nsga3::prelude::*;
//!
//! let experiment = Experiment::builder(Dtlz2::new(4))
//!     .pop_size(16)
//!     .n_partitions(3)
//!     .number_of_clusters(2)
//!     .interval_of_aggregations(1)
//!     .number_of_executions(2)
//!     .termination(Termination::MaxGenerations(4))
//!     .build()
//!     .unwrap();
//!
//! let result = experiment.run().unwrap();
//! assert_eq!(result.runs.len(), 2);
//! assert_eq!(result.hypervolume.len(), 4);
//! ```

mod aggregate;
#[cfg(feature = "async")]
mod async_impl;
mod builder;
mod journal;
mod persistence;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use aggregate::{AggregateCurve, AggregatePoint, HeatMap, aggregate};
pub use builder::{ExperimentBuilder, ExperimentSettings};
use parking_lot::RwLock;
pub use persistence::ExperimentSnapshot;
use persistence::{ExperimentStore, HEAT_MAP_FILE, REPORT_FILE};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::Metric;
use crate::problem::Problem;
use crate::run::{Run, RunContext, RunResult};

/// Everything an experiment produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Problem name.
    pub problem: String,
    /// Original objective dimension.
    pub n_obj: usize,
    /// One result per run, ordered by run index.
    pub runs: Vec<RunResult>,
    /// Hypervolume aggregated over runs.
    pub hypervolume: AggregateCurve,
    /// IGD aggregated over runs, when every run tracked it.
    pub igd: Option<AggregateCurve>,
}

impl ExperimentResult {
    /// Aggregate a set of finished runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoResults`] for an empty set and
    /// [`Error::AggregationMismatch`] if runs recorded different numbers
    /// of generations.
    pub fn from_runs(problem: String, n_obj: usize, mut runs: Vec<RunResult>) -> Result<Self> {
        runs.sort_by_key(|r| r.index);
        let hypervolume = aggregate(&runs, Metric::Hypervolume)?.ok_or(Error::Internal(
            "hypervolume is recorded for every generation",
        ))?;
        let igd = aggregate(&runs, Metric::Igd)?;
        Ok(Self {
            problem,
            n_obj,
            runs,
            hypervolume,
            igd,
        })
    }

    /// The aggregate curve of `metric`, if tracked.
    #[must_use]
    pub fn mean_convergence(&self, metric: Metric) -> Option<&AggregateCurve> {
        match metric {
            Metric::Hypervolume => Some(&self.hypervolume),
            Metric::Igd => self.igd.as_ref(),
        }
    }

    /// Axis co-association over every reduction of every run.
    #[must_use]
    pub fn heat_map(&self) -> HeatMap {
        HeatMap::from_runs(&self.runs, self.n_obj)
    }

    /// Seed of every run, by run index.
    #[must_use]
    pub fn seeds(&self) -> Vec<u64> {
        self.runs.iter().map(|r| r.seed).collect()
    }
}

/// A configured multi-run experiment.
///
/// Created via [`Experiment::builder()`].
pub struct Experiment {
    settings: ExperimentSettings,
    context: Arc<RunContext>,
    save_dir: Option<PathBuf>,
    runs: Arc<RwLock<Vec<RunResult>>>,
    result: RwLock<Option<ExperimentResult>>,
}

impl Experiment {
    /// Create a builder for an experiment on `problem`.
    #[must_use]
    pub fn builder(problem: impl Problem + 'static) -> ExperimentBuilder {
        ExperimentBuilder::new(Arc::new(problem))
    }

    /// Rebuild the result of a saved experiment from its directory.
    ///
    /// The latest journal entry of every run the stored settings own
    /// (index below `number_of_executions`, matching seed) is used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if `experiment.json` or the journal
    /// cannot be read, [`Error::NoResults`] if the journal is empty, and
    /// aggregation errors as in [`ExperimentResult::from_runs`].
    pub fn load(dir: impl AsRef<Path>) -> Result<ExperimentResult> {
        let dir = dir.as_ref();
        let snapshot = persistence::read_snapshot(dir)?;
        let journal = journal::RunJournal::new(dir.join(persistence::JOURNAL_FILE));
        let runs = owned_runs(&journal, &snapshot.settings)?;
        ExperimentResult::from_runs(snapshot.problem, snapshot.n_obj, runs)
    }

    /// The validated settings.
    #[must_use]
    pub fn settings(&self) -> &ExperimentSettings {
        &self.settings
    }

    /// Directory the experiment persists to, when `save_data` is set.
    #[must_use]
    pub fn save_dir(&self) -> Option<&Path> {
        self.save_dir.as_deref()
    }

    /// Name of the problem under study.
    #[must_use]
    pub fn problem_name(&self) -> &str {
        self.context.problem.name()
    }

    /// Original reference directions, shared by every run.
    #[must_use]
    pub fn reference_directions(&self) -> &crate::reference::ReferenceDirections {
        &self.context.directions
    }

    /// Create run `index` without executing it, for step-by-step control.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Run`] if the run's reducer cannot be configured.
    pub fn start_run(&self, index: usize) -> Result<Run> {
        Run::new(Arc::clone(&self.context), index, self.settings.seed_for(index)).map_err(|e| Error::Run {
            run: index,
            source: Box::new(e),
        })
    }

    /// Runs finished by the last call to [`run`](Self::run), ordered by
    /// completion. Available even when aggregation or persistence failed.
    #[must_use]
    pub fn completed_runs(&self) -> Vec<RunResult> {
        self.runs.read().clone()
    }

    /// The result of the last successful [`run`](Self::run).
    #[must_use]
    pub fn result(&self) -> Option<ExperimentResult> {
        self.result.read().clone()
    }

    /// Execute every run sequentially, aggregate and persist.
    ///
    /// A persistence failure of one run does not stop the others; the
    /// first such failure is returned after all runs finished. Completed
    /// runs stay available through [`completed_runs`](Self::completed_runs).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Run`] if a run cannot start,
    /// [`Error::AggregationMismatch`] if runs disagree on their number of
    /// generations, and [`Error::Persistence`] if writing results fails.
    pub fn run(&self) -> Result<ExperimentResult> {
        let n = self.settings.number_of_executions;
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("experiment", problem = self.problem_name(), n_runs = n).entered();

        self.runs.write().clear();
        let (store, mut resumed) = self.prepare_store()?;
        let mut persist_error = None;

        for index in 0..n {
            if let Some(done) = resumed.remove(&index) {
                trace_info!(run = index, "run resumed from journal");
                self.runs.write().push(done);
                continue;
            }
            let result = self.start_run(index)?.execute();
            self.collect(store.as_ref(), result, &mut persist_error);
        }

        self.finish(store.as_ref(), persist_error)
    }

    /// Persist a finished run and keep it; the first persistence error is
    /// remembered.
    fn collect(&self, store: Option<&ExperimentStore>, result: RunResult, persist_error: &mut Option<Error>) {
        if let Some(store) = store
            && let Err(e) = store.persist_run(&result)
        {
            trace_info!(run = result.index, error = %e, "run persistence failed");
            persist_error.get_or_insert(e);
        }
        self.runs.write().push(result);
    }

    /// Aggregate the finished runs and persist the aggregates.
    fn finish(&self, store: Option<&ExperimentStore>, persist_error: Option<Error>) -> Result<ExperimentResult> {
        let runs = self.completed_runs();
        let result = ExperimentResult::from_runs(
            self.problem_name().to_string(),
            self.context.problem.n_obj(),
            runs,
        )?;
        trace_info!(
            runs = result.runs.len(),
            generations = result.hypervolume.len(),
            final_hv = result.hypervolume.last().map_or(f64::NAN, |p| p.mean),
            "experiment aggregated"
        );
        *self.result.write() = Some(result.clone());

        if let Some(store) = store {
            store.persist_aggregates(&result)?;
        }
        match persist_error {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }

    /// The aggregate curve of `metric` from the last run; written to
    /// `<metric>_convergence.txt` when saving.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoResults`] before a successful run or when the
    /// metric was not tracked, and [`Error::Persistence`] if writing fails.
    pub fn show_mean_convergence(&self, metric: Metric) -> Result<AggregateCurve> {
        let curve = self
            .result
            .read()
            .as_ref()
            .and_then(|r| r.mean_convergence(metric).cloned())
            .ok_or(Error::NoResults)?;
        if let Some(store) = self.open_store()? {
            store.write_curve(&curve)?;
        }
        Ok(curve)
    }

    /// Axis co-association of the last run; written to `heat_map.html`
    /// when saving.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoResults`] before a successful run and
    /// [`Error::Persistence`] if writing fails.
    pub fn show_heat_map(&self) -> Result<HeatMap> {
        let heat_map = self
            .result
            .read()
            .as_ref()
            .map(ExperimentResult::heat_map)
            .ok_or(Error::NoResults)?;
        if let Some(store) = self.open_store()? {
            let title = self.settings.directory_name(self.problem_name(), heat_map.n_axes);
            store.write_file(HEAT_MAP_FILE, &crate::visualization::heat_map_html(&heat_map, &title))?;
        }
        Ok(heat_map)
    }

    /// Write the convergence report of the last run to `path`, or to
    /// `convergence.html` in the save directory when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoResults`] before a successful run or when no
    /// destination is available, and [`Error::Persistence`] if writing fails.
    pub fn export_html(&self, path: Option<&Path>) -> Result<PathBuf> {
        let result = self.result().ok_or(Error::NoResults)?;
        let path = match (path, &self.save_dir) {
            (Some(p), _) => p.to_path_buf(),
            (None, Some(dir)) => dir.join(REPORT_FILE),
            (None, None) => return Err(Error::NoResults),
        };
        crate::visualization::write_convergence_report(&result, &path)
            .map_err(|e| Error::persistence(None, "writing convergence report", &path, e))?;
        Ok(path)
    }

    fn open_store(&self) -> Result<Option<ExperimentStore>> {
        self.save_dir.as_deref().map(ExperimentStore::open).transpose()
    }

    fn snapshot(&self) -> ExperimentSnapshot {
        ExperimentSnapshot {
            version: 1,
            problem: self.problem_name().to_string(),
            n_obj: self.context.problem.n_obj(),
            n_var: self.context.problem.n_var(),
            settings: self.settings.clone(),
            clusterer: self.context.clusterer.name().to_string(),
            n_directions: self.context.directions.len(),
        }
    }

    /// Open the experiment directory for a new execution and collect the
    /// journal entries that can stand in for runs.
    ///
    /// The journal survives only when resuming under a snapshot that
    /// produces the same runs as the stored one; otherwise it is cleared,
    /// so a directory never mixes configurations.
    fn prepare_store(&self) -> Result<(Option<ExperimentStore>, HashMap<usize, RunResult>)> {
        let Some(store) = self.open_store()? else {
            return Ok((None, HashMap::new()));
        };
        let snapshot = self.snapshot();

        let reusable = self.settings.resume
            && store
                .stored_snapshot()?
                .is_some_and(|previous| previous.same_runs_as(&snapshot));
        let resumed = if reusable {
            owned_runs(store.journal(), &self.settings)?
                .into_iter()
                .map(|r| (r.index, r))
                .collect()
        } else {
            store.journal().clear()?;
            HashMap::new()
        };

        store.write_snapshot(&snapshot)?;
        Ok((Some(store), resumed))
    }
}

/// Latest journal entry of every run `settings` owns, by index.
fn owned_runs(journal: &journal::RunJournal, settings: &ExperimentSettings) -> Result<Vec<RunResult>> {
    Ok(journal
        .load_latest()?
        .into_iter()
        .filter(|r| settings.owns_run(r.index, r.seed) && !r.convergence.is_empty())
        .collect())
}
