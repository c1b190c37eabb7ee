use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{Experiment, ExperimentResult};
use crate::error::{Error, Result};
use crate::run::RunResult;

impl Experiment {
    /// Execute the runs concurrently, at most `concurrency` at a time.
    ///
    /// Each run is moved onto [`spawn_blocking`](tokio::task::spawn_blocking)
    /// and owns all of its mutable state, so the results are identical to
    /// [`run`](Self::run) for the same settings. Runs are persisted as they
    /// finish; the aggregate is built in run-index order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `concurrency` is zero,
    /// [`Error::TaskError`] if a spawned run panics, and otherwise the same
    /// errors as [`run`](Self::run).
    ///
    /// # Examples
    ///
    /// ```
    /// use online_cluster_nsga3::prelude::*;
    ///
    /// # #[cfg(feature = "async")]
    /// # async fn example() -> online_cluster_nsga3::Result<()> {
    /// let experiment = Experiment::builder(Dtlz2::new(3))
    ///     .pop_size(12)
    ///     .n_partitions(3)
    ///     .number_of_executions(4)
    ///     .termination(Termination::MaxGenerations(5))
    ///     .build()?;
    ///
    /// let result = experiment.run_parallel(2).await?;
    /// assert_eq!(result.runs.len(), 4);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_parallel(&self, concurrency: usize) -> Result<ExperimentResult> {
        if concurrency == 0 {
            return Err(Error::config("concurrency", "must be at least 1"));
        }
        let n = self.settings.number_of_executions;
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("experiment_parallel", problem = self.problem_name(), n_runs = n, concurrency).entered();

        self.runs.write().clear();
        let (store, mut resumed) = self.prepare_store()?;
        let mut persist_error = None;

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut join_set: JoinSet<RunResult> = JoinSet::new();

        for index in 0..n {
            if let Some(done) = resumed.remove(&index) {
                trace_info!(run = index, "run resumed from journal");
                self.runs.write().push(done);
                continue;
            }
            let run = self.start_run(index)?;
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::TaskError(e.to_string()))?;
            join_set.spawn_blocking(move || {
                let result = run.execute();
                drop(permit);
                result
            });

            // Persist whatever already finished without waiting.
            while let Some(joined) = join_set.try_join_next() {
                let result = joined.map_err(|e| Error::TaskError(e.to_string()))?;
                self.collect(store.as_ref(), result, &mut persist_error);
            }
        }

        while let Some(joined) = join_set.join_next().await {
            let result = joined.map_err(|e| Error::TaskError(e.to_string()))?;
            self.collect(store.as_ref(), result, &mut persist_error);
        }

        self.finish(store.as_ref(), persist_error)
    }
}
