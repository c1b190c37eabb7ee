//! When a run stops.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stopping criterion of a run.
///
/// Checked after every selection, so the generation that meets the
/// criterion is still recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Stop after this many generations (generation 0 included).
    MaxGenerations(usize),
    /// Stop once this many evaluations have been spent.
    MaxEvaluations(usize),
}

impl Default for Termination {
    fn default() -> Self {
        Self::MaxGenerations(100)
    }
}

impl Termination {
    /// `true` once `generation` (0-based, just selected) with `n_evals`
    /// evaluations spent satisfies the criterion.
    #[must_use]
    pub fn is_met(&self, generation: usize, n_evals: usize) -> bool {
        match *self {
            Self::MaxGenerations(n) => generation + 1 >= n,
            Self::MaxEvaluations(n) => n_evals >= n,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match *self {
            Self::MaxGenerations(0) => Err(Error::config("termination", "n_gen must be at least 1")),
            Self::MaxEvaluations(0) => {
                Err(Error::config("termination", "n_evals must be at least 1"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_generations_counts_generation_zero() {
        let t = Termination::MaxGenerations(3);
        assert!(!t.is_met(0, 10));
        assert!(!t.is_met(1, 20));
        assert!(t.is_met(2, 30));
    }

    #[test]
    fn test_max_evaluations() {
        let t = Termination::MaxEvaluations(50);
        assert!(!t.is_met(4, 49));
        assert!(t.is_met(4, 50));
    }

    #[test]
    fn test_zero_budget_rejected() {
        assert!(Termination::MaxGenerations(0).validate().is_err());
        assert!(Termination::default().validate().is_ok());
    }
}
