//! Individuals, populations and generation snapshots.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;

/// Evaluation status of an [`Individual`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EvaluationState {
    /// Created by sampling or variation, not evaluated yet.
    Pending,
    /// Evaluated successfully.
    Evaluated,
    /// The problem failed to evaluate it; excluded from selection.
    Invalid(String),
}

/// One candidate solution.
///
/// `decision` and `objectives` never change after evaluation; only the
/// bookkeeping fields (`rank`, `niche`) are rewritten by selection.
/// `objectives` always holds the original, unreduced vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// Decision vector, one gene per problem variable.
    pub decision: Vec<f64>,
    /// Original objective vector (empty until evaluated).
    pub objectives: Vec<f64>,
    /// Aggregated constraint violation, if the problem is constrained.
    pub constraint_violation: Option<f64>,
    /// Evaluation status.
    pub state: EvaluationState,
    /// Generation in which the individual was created.
    pub born: usize,
    /// Front index assigned by the last selection.
    pub rank: Option<usize>,
    /// Reference direction assigned by the last selection.
    pub niche: Option<usize>,
}

impl Individual {
    /// A fresh, unevaluated individual.
    #[must_use]
    pub fn new(decision: Vec<f64>, born: usize) -> Self {
        Self {
            decision,
            objectives: Vec::new(),
            constraint_violation: None,
            state: EvaluationState::Pending,
            born,
            rank: None,
            niche: None,
        }
    }

    /// `true` once evaluated successfully.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state == EvaluationState::Evaluated
    }

    /// `true` if not yet evaluated.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == EvaluationState::Pending
    }

    /// Violation used for constrained dominance (0.0 when unconstrained).
    #[must_use]
    pub fn violation(&self) -> f64 {
        self.constraint_violation.unwrap_or(0.0).max(0.0)
    }

    pub(crate) fn mark_invalid(&mut self, err: &EvaluationError) {
        self.state = EvaluationState::Invalid(err.to_string());
    }
}

/// An immutable snapshot of the population after selection.
///
/// Snapshots are appended to a run's history and never mutated; cloning
/// shares the individuals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationSnapshot {
    /// Generation index.
    pub generation: usize,
    /// Dimension of the objective space selection ran in.
    pub selection_dim: usize,
    /// The surviving population.
    pub individuals: Arc<[Individual]>,
}

impl GenerationSnapshot {
    pub(crate) fn new(generation: usize, selection_dim: usize, individuals: &[Individual]) -> Self {
        Self {
            generation,
            selection_dim,
            individuals: individuals.into(),
        }
    }
}

/// Objective vectors of the valid members of `population`.
#[must_use]
pub fn objective_matrix(population: &[Individual]) -> Vec<Vec<f64>> {
    population
        .iter()
        .filter(|ind| ind.is_valid())
        .map(|ind| ind.objectives.clone())
        .collect()
}
