#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Many-objective NSGA-III with online objective clustering.
//!
//! Every `interval_of_aggregations` generations a run clusters its
//! objective axes by how they behave across the current population,
//! collapses each cluster into one aggregated axis and continues
//! NSGA-III selection in the reduced space, while convergence is always
//! measured on the original objectives. An [`Experiment`] repeats a
//! configuration over several seeded runs, aggregates their convergence
//! curves and optionally persists everything to disk.
//!
//! # Getting Started
//!
//! ```
//! use online_cluster_nsga3::prelude::*;
//!
//! let experiment = Experiment::builder(Dtlz2::new(5))
//!     .pop_size(20)
//!     .n_partitions(3)
//!     .number_of_clusters(2)
//!     .interval_of_aggregations(2)
//!     .number_of_executions(2)
//!     .termination(Termination::MaxGenerations(6))
//!     .build()
//!     .unwrap();
//!
//! let result = experiment.run().unwrap();
//! let hv = result.hypervolume.last().unwrap();
//! println!("final HV = {:.4} ± {:.4}", hv.mean, hv.std);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Problem`](problem::Problem) | Black-box many-objective fitness function with box bounds. |
//! | [`ReferenceDirections`](reference::ReferenceDirections) | Das-Dennis directions NSGA-III niches around. |
//! | [`ObjectiveClusterer`](cluster::ObjectiveClusterer) | Groups objective axes; [`AgglomerativeClusterer`](cluster::AgglomerativeClusterer) by default. |
//! | [`OnlineClusterReducer`](reducer::OnlineClusterReducer) | Decides when to re-cluster and projects objectives into the active space. |
//! | [`Run`](run::Run) | One seeded evolutionary run, steppable state by state. |
//! | [`Experiment`] | Multi-run harness: seeds, aggregation, persistence, reports. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `async` | [`Experiment::run_parallel`] via tokio | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at run and experiment boundaries | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod cluster;
pub mod error;
pub mod experiment;
pub mod metrics;
mod operators;
pub mod pareto;
pub mod population;
pub mod problem;
pub mod reducer;
pub mod reference;
mod rng_util;
pub mod run;
pub mod selection;
pub mod termination;
mod visualization;

pub use error::{Error, EvaluationError, Result};
pub use experiment::{Experiment, ExperimentBuilder, ExperimentResult, ExperimentSettings};
pub use operators::Variation;
pub use visualization::{write_convergence_report, write_heat_map};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use online_cluster_nsga3::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cluster::{
        AgglomerativeClusterer, AxisAggregation, ClusterAssignment, Linkage, ObjectiveClusterer,
    };
    pub use crate::error::{Error, EvaluationError, Result};
    pub use crate::experiment::{
        AggregateCurve, Experiment, ExperimentBuilder, ExperimentResult, ExperimentSettings,
        HeatMap,
    };
    pub use crate::metrics::Metric;
    pub use crate::operators::Variation;
    pub use crate::population::Individual;
    pub use crate::problem::{Dtlz1, Dtlz2, Evaluation, Problem};
    pub use crate::reducer::OnlineClusterReducer;
    pub use crate::reference::ReferenceDirections;
    pub use crate::run::{Run, RunResult, RunState};
    pub use crate::termination::Termination;
}
