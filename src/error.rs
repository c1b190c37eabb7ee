use std::path::PathBuf;

/// Errors produced by the optimizer, the clustering step and the
/// experiment harness.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned by builders when a configuration value is out of range.
    /// Raised before any run starts.
    #[error("invalid configuration for '{field}': {reason}")]
    InvalidConfiguration {
        /// The offending option.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Returned when the objective matrix cannot be split into the
    /// requested number of non-empty axis groups.
    #[error(
        "insufficient data: cannot form {clusters} clusters from {axes} axes \
         ({distinguishable} distinguishable) over {samples} samples"
    )]
    InsufficientData {
        /// Number of sampled individuals (rows).
        samples: usize,
        /// Number of objective axes (columns).
        axes: usize,
        /// Number of pairwise-distinct axes.
        distinguishable: usize,
        /// Requested number of clusters.
        clusters: usize,
    },

    /// Returned when a single individual could not be evaluated.
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Returned when runs report convergence records of different lengths.
    #[error("aggregation mismatch: run {run} has {got} generations, expected {expected}")]
    AggregationMismatch {
        /// Index of the first run whose record length differs.
        run: usize,
        /// Length of the first run's record.
        expected: usize,
        /// Length of the mismatching record.
        got: usize,
    },

    /// Returned when a run stops with an error; identifies the run.
    #[error("run {run} failed: {source}")]
    Run {
        /// Index of the failing run.
        run: usize,
        /// What went wrong.
        #[source]
        source: Box<Error>,
    },

    /// Returned when results are requested before any experiment completed.
    #[error("no completed experiment results available")]
    NoResults,

    /// Returned when vectors of different dimensions are combined.
    #[error("dimension mismatch: expected {expected} values, got {got}")]
    DimensionMismatch {
        /// The expected dimension.
        expected: usize,
        /// The actual dimension.
        got: usize,
    },

    /// Returned when writing or reading experiment artifacts fails.
    #[error("persistence error{} while {stage} at {}: {message}", run_label(.run), .path.display())]
    Persistence {
        /// The run whose artifacts failed, if the failure is run-specific.
        run: Option<usize>,
        /// What was being done (e.g. "writing run journal").
        stage: &'static str,
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying error message.
        message: String,
    },

    /// Returned when an async task fails.
    #[cfg(feature = "async")]
    #[error("async task error: {0}")]
    TaskError(String),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

#[allow(clippy::ref_option)]
fn run_label(run: &Option<usize>) -> String {
    run.map_or_else(String::new, |r| format!(" in run {r}"))
}

impl Error {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(
        run: Option<usize>,
        stage: &'static str,
        path: impl Into<PathBuf>,
        err: impl ToString,
    ) -> Self {
        Self::Persistence {
            run,
            stage,
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Convenience alias for results carrying an [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Failure of a single fitness evaluation.
///
/// Returned by [`Problem::evaluate`](crate::problem::Problem::evaluate).
/// The run marks the individual invalid and keeps going.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// The problem reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The objective vector contains NaN or an infinity.
    #[error("objective {index} is not finite")]
    NonFinite {
        /// Position of the offending objective.
        index: usize,
    },

    /// The problem returned the wrong number of objectives.
    #[error("expected {expected} objectives, got {got}")]
    DimensionMismatch {
        /// The expected number of objectives.
        expected: usize,
        /// The actual number returned.
        got: usize,
    },
}
