//! One independent evolutionary run.
//!
//! A [`Run`] owns its population, random stream and
//! [`OnlineClusterReducer`]; everything it shares with other runs
//! (problem, original reference directions, clusterer, metric tracker)
//! lives in a read-only [`RunContext`].
//!
//! The run is a state machine:
//!
//! ```text
//! Initialized -> Evaluating -> Selecting -> Advancing -> Evaluating -> ...
//!                                  |
//!                                  +-> Terminated
//! ```
//!
//! Generation 0 is the evaluated initial population. Every selection is
//! followed by one [`ConvergenceRecord`], so a run stopped by
//! `MaxGenerations(n)` reports exactly `n` records.

use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cluster::{AxisAggregation, ObjectiveClusterer};
use crate::error::Result;
use crate::metrics::{ConvergenceRecord, Metric, MetricTracker};
use crate::operators::Variation;
use crate::population::{EvaluationState, GenerationSnapshot, Individual};
use crate::problem::{self, Problem};
use crate::reducer::{OnlineClusterReducer, ReductionEvent, ReductionRecord};
use crate::reference::ReferenceDirections;
use crate::rng_util;
use crate::selection::environmental_selection;
use crate::termination::Termination;

/// Read-only configuration shared by every run of an experiment.
pub(crate) struct RunContext {
    pub(crate) problem: Arc<dyn Problem>,
    pub(crate) directions: ReferenceDirections,
    pub(crate) clusterer: Arc<dyn ObjectiveClusterer>,
    pub(crate) tracker: MetricTracker,
    pub(crate) pop_size: usize,
    pub(crate) number_of_clusters: usize,
    pub(crate) interval_of_aggregations: i64,
    pub(crate) aggregation: AxisAggregation,
    pub(crate) termination: Termination,
    pub(crate) variation: Variation,
    pub(crate) save_history: bool,
}

/// Lifecycle state of a [`Run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Created, nothing sampled yet.
    Initialized,
    /// Pending individuals are about to be evaluated.
    Evaluating,
    /// The merged pool is about to be reduced to the next population.
    Selecting,
    /// Offspring are about to be bred.
    Advancing,
    /// The termination criterion was met.
    Terminated,
}

/// Everything a finished run produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Position of the run within its experiment.
    pub index: usize,
    /// Seed of the run's random stream.
    pub seed: u64,
    /// Population after the last selection.
    pub population: Vec<Individual>,
    /// Post-selection snapshot of every generation, if requested.
    pub history: Option<Vec<GenerationSnapshot>>,
    /// One record per generation, generation 0 first.
    pub convergence: Vec<ConvergenceRecord>,
    /// Every reduction applied during the run.
    pub reductions: Vec<ReductionRecord>,
    /// Fitness evaluations spent.
    pub n_evals: usize,
    /// Evaluations that failed and were excluded from selection.
    pub n_invalid: usize,
    /// Wall-clock duration.
    pub duration: Duration,
}

impl RunResult {
    /// Number of generations recorded.
    #[must_use]
    pub fn generations(&self) -> usize {
        self.convergence.len()
    }

    /// The last convergence record.
    #[must_use]
    pub fn final_record(&self) -> Option<&ConvergenceRecord> {
        self.convergence.last()
    }

    /// `(generation, value)` pairs of one metric; `None` if the metric
    /// was not tracked for every generation.
    #[must_use]
    pub fn curve(&self, metric: Metric) -> Option<Vec<(usize, f64)>> {
        self.convergence
            .iter()
            .map(|r| r.value(metric).map(|v| (r.generation, v)))
            .collect()
    }
}

/// A single run of the clustered NSGA-III loop.
pub struct Run {
    ctx: Arc<RunContext>,
    index: usize,
    seed: u64,
    rng: fastrand::Rng,
    bounds: Vec<(f64, f64)>,
    reducer: OnlineClusterReducer,
    state: RunState,
    generation: usize,
    n_evals: usize,
    n_invalid: usize,
    population: Vec<Individual>,
    offspring: Vec<Individual>,
    convergence: Vec<ConvergenceRecord>,
    history: Option<Vec<GenerationSnapshot>>,
    started: Instant,
}

impl Run {
    pub(crate) fn new(ctx: Arc<RunContext>, index: usize, seed: u64) -> Result<Self> {
        let reducer = OnlineClusterReducer::builder()
            .original_directions(ctx.directions.clone())
            .interval_of_aggregations(ctx.interval_of_aggregations)
            .number_of_clusters(ctx.number_of_clusters)
            .aggregation(ctx.aggregation)
            .reduced_target(ctx.pop_size)
            .clusterer(Arc::clone(&ctx.clusterer))
            .build()?;
        let bounds = ctx.problem.bounds();
        let history = ctx.save_history.then(Vec::new);
        Ok(Self {
            ctx,
            index,
            seed,
            rng: fastrand::Rng::with_seed(seed),
            bounds,
            reducer,
            state: RunState::Initialized,
            generation: 0,
            n_evals: 0,
            n_invalid: 0,
            population: Vec::new(),
            offspring: Vec::new(),
            convergence: Vec::new(),
            history,
            started: Instant::now(),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Index of the current generation.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Seed of this run.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current population (post-selection once past the first selection).
    #[must_use]
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Reference directions selection currently uses.
    #[must_use]
    pub fn active_directions(&self) -> &ReferenceDirections {
        self.reducer.active_directions()
    }

    /// Convergence records so far.
    #[must_use]
    pub fn convergence(&self) -> &[ConvergenceRecord] {
        &self.convergence
    }

    /// Perform one state transition and return the new state.
    ///
    /// Calling this on a terminated run does nothing.
    pub fn step(&mut self) -> RunState {
        self.state = match self.state {
            RunState::Initialized => {
                self.offspring = (0..self.ctx.pop_size)
                    .map(|_| Individual::new(rng_util::uniform_in(&mut self.rng, &self.bounds), 0))
                    .collect();
                RunState::Evaluating
            }
            RunState::Evaluating => {
                self.evaluate_offspring();
                RunState::Selecting
            }
            RunState::Selecting => {
                self.select();
                self.record();
                if self.ctx.termination.is_met(self.generation, self.n_evals) {
                    RunState::Terminated
                } else {
                    RunState::Advancing
                }
            }
            RunState::Advancing => {
                self.advance();
                RunState::Evaluating
            }
            RunState::Terminated => RunState::Terminated,
        };
        self.state
    }

    /// Step until terminated and return the result.
    #[must_use]
    pub fn execute(mut self) -> RunResult {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("run", index = self.index, seed = self.seed).entered();

        trace_info!(index = self.index, seed = self.seed, "run started");
        while self.step() != RunState::Terminated {}
        self.into_result()
    }

    /// Package the current state as a [`RunResult`].
    #[must_use]
    pub fn into_result(self) -> RunResult {
        let duration = self.started.elapsed();
        trace_info!(
            index = self.index,
            generations = self.convergence.len(),
            n_evals = self.n_evals,
            reductions = self.reducer.history().len(),
            ?duration,
            "run finished"
        );
        RunResult {
            index: self.index,
            seed: self.seed,
            population: self.population,
            history: self.history,
            convergence: self.convergence,
            reductions: self.reducer.into_history(),
            n_evals: self.n_evals,
            n_invalid: self.n_invalid,
            duration,
        }
    }

    fn evaluate_offspring(&mut self) {
        let n_obj = self.ctx.problem.n_obj();
        for ind in self.offspring.iter_mut().filter(|ind| ind.is_pending()) {
            self.n_evals += 1;
            let outcome = self.ctx.problem.evaluate(&ind.decision).and_then(|eval| {
                problem::validate(&eval, n_obj)?;
                Ok(eval)
            });
            match outcome {
                Ok(eval) => {
                    ind.objectives = eval.objectives;
                    ind.constraint_violation = eval.constraint_violation;
                    ind.state = EvaluationState::Evaluated;
                }
                Err(e) => {
                    trace_debug!(generation = self.generation, error = %e, "evaluation failed");
                    ind.mark_invalid(&e);
                    self.n_invalid += 1;
                }
            }
        }
    }

    fn select(&mut self) {
        let pool: Vec<Individual> = self
            .population
            .drain(..)
            .chain(self.offspring.drain(..))
            .filter(Individual::is_valid)
            .collect();

        let projected: Vec<Vec<f64>> = pool
            .iter()
            .map(|ind| self.reducer.project(&ind.objectives))
            .collect();
        let violations: Vec<f64> = pool.iter().map(Individual::violation).collect();
        let selection = environmental_selection(
            &projected,
            &violations,
            self.reducer.active_directions(),
            self.ctx.pop_size,
        );

        let mut slots: Vec<Option<Individual>> = pool.into_iter().map(Some).collect();
        self.population = selection
            .survivors
            .iter()
            .filter_map(|&i| {
                let mut ind = slots[i].take()?;
                ind.rank = Some(selection.ranks[i]);
                ind.niche = Some(selection.niches[i]);
                Some(ind)
            })
            .collect();
    }

    fn record(&mut self) {
        let record = self
            .ctx
            .tracker
            .record(self.generation, self.n_evals, &self.population);
        self.convergence.push(record);
        if let Some(history) = &mut self.history {
            history.push(GenerationSnapshot::new(
                self.generation,
                self.reducer.selection_dim(),
                &self.population,
            ));
        }
    }

    fn advance(&mut self) {
        self.offspring = self.ctx.variation.offspring(
            &mut self.rng,
            &self.population,
            &self.bounds,
            self.ctx.pop_size,
            self.generation + 1,
        );

        #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
        match self.reducer.on_generation(self.generation, &self.population) {
            ReductionEvent::Applied(assignment) => {
                trace_debug!(
                    index = self.index,
                    generation = self.generation,
                    labels = ?assignment.labels(),
                    "reduction applied"
                );
            }
            ReductionEvent::Failed(e) => {
                trace_info!(
                    index = self.index,
                    generation = self.generation,
                    error = %e,
                    "reduction skipped"
                );
            }
            ReductionEvent::Disabled | ReductionEvent::NotDue => {}
        }

        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::AgglomerativeClusterer;
    use crate::problem::Dtlz2;

    fn context(pop_size: usize, n_gen: usize, interval: i64) -> Arc<RunContext> {
        let problem = Dtlz2::new(4);
        let tracker = MetricTracker::new(vec![1.1; 4], problem.pareto_front(4)).unwrap();
        Arc::new(RunContext {
            problem: Arc::new(problem),
            directions: ReferenceDirections::das_dennis(4, 4).unwrap(),
            clusterer: Arc::new(AgglomerativeClusterer::default()),
            tracker,
            pop_size,
            number_of_clusters: 2,
            interval_of_aggregations: interval,
            aggregation: AxisAggregation::Mean,
            termination: Termination::MaxGenerations(n_gen),
            variation: Variation::default(),
            save_history: true,
        })
    }

    #[test]
    fn test_state_machine_order() {
        let mut run = Run::new(context(8, 2, 0), 0, 1).unwrap();
        assert_eq!(run.state(), RunState::Initialized);
        assert_eq!(run.step(), RunState::Evaluating);
        assert_eq!(run.step(), RunState::Selecting);
        assert_eq!(run.step(), RunState::Advancing);
        assert_eq!(run.generation(), 0);
        assert_eq!(run.step(), RunState::Evaluating);
        assert_eq!(run.generation(), 1);
        assert_eq!(run.step(), RunState::Selecting);
        assert_eq!(run.step(), RunState::Terminated);
        assert_eq!(run.step(), RunState::Terminated);
    }

    #[test]
    fn test_record_per_generation() {
        let result = Run::new(context(12, 5, 1), 0, 3).unwrap().execute();
        assert_eq!(result.generations(), 5);
        assert_eq!(result.n_evals, 60);
        let gens: Vec<usize> = result.convergence.iter().map(|r| r.generation).collect();
        assert_eq!(gens, vec![0, 1, 2, 3, 4]);
        assert_eq!(result.history.as_ref().map(Vec::len), Some(5));
        assert!(result.population.len() <= 12);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = Run::new(context(10, 4, 1), 0, 9).unwrap().execute();
        let b = Run::new(context(10, 4, 1), 0, 9).unwrap().execute();
        assert_eq!(a.population, b.population);
        assert_eq!(a.convergence, b.convergence);
        assert_eq!(a.reductions, b.reductions);
    }

    #[test]
    fn test_reduction_switches_selection_space() {
        let mut run = Run::new(context(12, 10, 1), 0, 5).unwrap();
        while run.generation() < 2 && run.step() != RunState::Terminated {}
        assert_eq!(run.active_directions().dim(), 2);
        let result = run.execute();
        assert!(!result.reductions.is_empty());
        let history = result.history.unwrap();
        assert_eq!(history[0].selection_dim, 4);
        assert_eq!(history.last().unwrap().selection_dim, 2);
    }
}
