//! Problem definitions evaluated as black-box fitness functions.
//!
//! The optimizer only sees a [`Problem`] through its bounds and its
//! [`evaluate`](Problem::evaluate) call. Two scalable many-objective
//! benchmarks are built in: [`Dtlz1`] and [`Dtlz2`].
//!
//! # Implementing a problem
//!
//! ```
//! use online_cluster_nsga3::error::EvaluationError;
//! use online_cluster_nsga3::problem::{Evaluation, Problem};
//!
//! struct Schaffer;
//!
//! impl Problem for Schaffer {
//!     fn name(&self) -> &str {
//!         "schaffer"
//!     }
//!     fn n_var(&self) -> usize {
//!         1
//!     }
//!     fn n_obj(&self) -> usize {
//!         2
//!     }
//!     fn bounds(&self) -> Vec<(f64, f64)> {
//!         vec![(-10.0, 10.0)]
//!     }
//!     fn evaluate(&self, x: &[f64]) -> Result<Evaluation, EvaluationError> {
//!         Ok(vec![x[0].powi(2), (x[0] - 2.0).powi(2)].into())
//!     }
//! }
//!
//! let eval = Schaffer.evaluate(&[1.0]).unwrap();
//! assert_eq!(eval.objectives, vec![1.0, 1.0]);
//! ```

mod dtlz;

pub use dtlz::{Dtlz1, Dtlz2};

use crate::error::EvaluationError;

/// The outcome of a successful evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// One value per objective, all minimized.
    pub objectives: Vec<f64>,
    /// Aggregated constraint violation; `None` or `<= 0.0` is feasible.
    pub constraint_violation: Option<f64>,
}

impl From<Vec<f64>> for Evaluation {
    fn from(objectives: Vec<f64>) -> Self {
        Self {
            objectives,
            constraint_violation: None,
        }
    }
}

/// A many-objective minimization problem.
///
/// Implementations must be pure: the same decision vector always yields
/// the same evaluation. `Send + Sync` lets runs share one problem across
/// threads.
pub trait Problem: Send + Sync {
    /// Short identifier used in save-directory names.
    fn name(&self) -> &str;

    /// Number of decision variables.
    fn n_var(&self) -> usize;

    /// Number of objectives (the original objective dimension).
    fn n_obj(&self) -> usize;

    /// Lower and upper bound of every decision variable.
    fn bounds(&self) -> Vec<(f64, f64)>;

    /// Evaluate one decision vector.
    ///
    /// # Errors
    ///
    /// Any [`EvaluationError`]. The individual is excluded from selection
    /// for that generation; the run continues.
    fn evaluate(&self, x: &[f64]) -> Result<Evaluation, EvaluationError>;

    /// Sample `n_points`-ish points of the true Pareto front, used for IGD.
    ///
    /// Default: unknown (`None`), which disables IGD tracking.
    fn pareto_front(&self, _n_partitions: usize) -> Option<Vec<Vec<f64>>> {
        None
    }

    /// Worst objective values on the Pareto front, used to derive the
    /// default hypervolume reference point.
    fn nadir_point(&self) -> Option<Vec<f64>> {
        None
    }
}

impl<P: Problem + ?Sized> Problem for std::sync::Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn n_var(&self) -> usize {
        (**self).n_var()
    }
    fn n_obj(&self) -> usize {
        (**self).n_obj()
    }
    fn bounds(&self) -> Vec<(f64, f64)> {
        (**self).bounds()
    }
    fn evaluate(&self, x: &[f64]) -> Result<Evaluation, EvaluationError> {
        (**self).evaluate(x)
    }
    fn pareto_front(&self, n_partitions: usize) -> Option<Vec<Vec<f64>>> {
        (**self).pareto_front(n_partitions)
    }
    fn nadir_point(&self) -> Option<Vec<f64>> {
        (**self).nadir_point()
    }
}

/// Check an evaluation against the declared objective count.
pub(crate) fn validate(eval: &Evaluation, n_obj: usize) -> Result<(), EvaluationError> {
    if eval.objectives.len() != n_obj {
        return Err(EvaluationError::DimensionMismatch {
            expected: n_obj,
            got: eval.objectives.len(),
        });
    }
    if let Some(index) = eval.objectives.iter().position(|v| !v.is_finite()) {
        return Err(EvaluationError::NonFinite { index });
    }
    Ok(())
}
