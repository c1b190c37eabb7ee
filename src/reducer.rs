//! Online clustering of the objective space.
//!
//! An [`OnlineClusterReducer`] belongs to exactly one run. Every
//! `interval_of_aggregations` generations it clusters the objective axes
//! of the current (post-selection) population, derives a reduced
//! reference-direction set of dimension `k`, and swaps the active
//! directions and projection used by environmental selection until the
//! next boundary.
//!
//! Clustering always starts from the original objective vectors, never
//! from a previously reduced space. Stored objective vectors are never
//! touched; only the selection-time view changes.
//!
//! ```
//! use online_cluster_nsga3::reducer::OnlineClusterReducer;
//! use online_cluster_nsga3::reference::ReferenceDirections;
//!
//! let original = ReferenceDirections::das_dennis(5, 4).unwrap();
//! let reducer = OnlineClusterReducer::builder()
//!     .original_directions(original)
//!     .number_of_clusters(2)
//!     .interval_of_aggregations(1)
//!     .build()
//!     .unwrap();
//! assert!(reducer.is_enabled());
//! assert_eq!(reducer.selection_dim(), 5);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cluster::{AgglomerativeClusterer, AxisAggregation, ClusterAssignment, ObjectiveClusterer};
use crate::error::{Error, Result};
use crate::population::{Individual, objective_matrix};
use crate::reference::ReferenceDirections;

/// One applied reduction of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionRecord {
    /// Generation whose population was clustered.
    pub generation: usize,
    /// The resulting axis partition.
    pub assignment: ClusterAssignment,
}

/// What [`OnlineClusterReducer::on_generation`] did.
#[derive(Debug)]
pub enum ReductionEvent {
    /// Clustering is disabled or `k` equals the original dimension.
    Disabled,
    /// Not an interval boundary, or the boundary was already handled.
    NotDue,
    /// A new reduced space is active.
    Applied(ClusterAssignment),
    /// Clustering failed; the previously active space is kept.
    Failed(Error),
}

/// The objective space selection currently runs in.
#[derive(Clone, Debug)]
enum ActiveSpace {
    Original,
    Reduced {
        assignment: ClusterAssignment,
        directions: ReferenceDirections,
    },
}

/// Per-run reducer holding the active reference directions.
#[derive(Clone)]
pub struct OnlineClusterReducer {
    interval: Option<usize>,
    n_clusters: usize,
    aggregation: AxisAggregation,
    reduced_target: usize,
    clusterer: Arc<dyn ObjectiveClusterer>,
    original: ReferenceDirections,
    active: ActiveSpace,
    last_boundary: Option<usize>,
    history: Vec<ReductionRecord>,
}

impl core::fmt::Debug for OnlineClusterReducer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OnlineClusterReducer")
            .field("interval", &self.interval)
            .field("n_clusters", &self.n_clusters)
            .field("aggregation", &self.aggregation)
            .field("clusterer", &self.clusterer.name())
            .field("selection_dim", &self.selection_dim())
            .field("reductions", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl OnlineClusterReducer {
    /// Creates a builder for configuring an `OnlineClusterReducer`.
    #[must_use]
    pub fn builder() -> OnlineClusterReducerBuilder {
        OnlineClusterReducerBuilder::default()
    }

    /// `true` if this reducer can ever change the active directions.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.interval.is_some() && self.n_clusters < self.original.dim()
    }

    /// Generations between reductions, `None` when disabled.
    #[must_use]
    pub fn interval(&self) -> Option<usize> {
        self.interval
    }

    /// Target reduced dimension.
    #[must_use]
    pub fn number_of_clusters(&self) -> usize {
        self.n_clusters
    }

    /// The directions selection uses right now.
    #[must_use]
    pub fn active_directions(&self) -> &ReferenceDirections {
        match &self.active {
            ActiveSpace::Original => &self.original,
            ActiveSpace::Reduced { directions, .. } => directions,
        }
    }

    /// The active axis partition, `None` while in the original space.
    #[must_use]
    pub fn active_assignment(&self) -> Option<&ClusterAssignment> {
        match &self.active {
            ActiveSpace::Original => None,
            ActiveSpace::Reduced { assignment, .. } => Some(assignment),
        }
    }

    /// Dimension of the space selection runs in.
    #[must_use]
    pub fn selection_dim(&self) -> usize {
        self.active_directions().dim()
    }

    /// Project one original objective vector into the active space.
    #[must_use]
    pub fn project(&self, objectives: &[f64]) -> Vec<f64> {
        match &self.active {
            ActiveSpace::Original => objectives.to_vec(),
            ActiveSpace::Reduced { assignment, .. } => assignment.project(objectives, self.aggregation),
        }
    }

    /// Reductions applied so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[ReductionRecord] {
        &self.history
    }

    /// Consume the reducer, returning its reduction history.
    #[must_use]
    pub fn into_history(self) -> Vec<ReductionRecord> {
        self.history
    }

    /// Per-generation check, called with the post-selection population
    /// of `generation`.
    ///
    /// Clusters when `generation` is a multiple of the interval and that
    /// boundary has not been handled yet. A failed clustering leaves the
    /// active space untouched.
    pub fn on_generation(&mut self, generation: usize, population: &[Individual]) -> ReductionEvent {
        let Some(interval) = self.interval.filter(|_| self.is_enabled()) else {
            return ReductionEvent::Disabled;
        };
        if generation % interval != 0 || self.last_boundary == Some(generation) {
            return ReductionEvent::NotDue;
        }
        self.last_boundary = Some(generation);

        let objectives = objective_matrix(population);
        let assignment = match self.clusterer.reduce(&objectives, self.n_clusters) {
            Ok(a) => a,
            Err(e) => {
                trace_debug!(generation, error = %e, "objective clustering failed, keeping active directions");
                return ReductionEvent::Failed(e);
            }
        };
        let directions = match ReferenceDirections::reduced(assignment.n_clusters(), self.reduced_target) {
            Ok(d) => d,
            Err(e) => return ReductionEvent::Failed(e),
        };

        trace_debug!(
            generation,
            clusters = assignment.n_clusters(),
            directions = directions.len(),
            "objective space reduced"
        );
        self.history.push(ReductionRecord {
            generation,
            assignment: assignment.clone(),
        });
        self.active = ActiveSpace::Reduced {
            assignment: assignment.clone(),
            directions,
        };
        ReductionEvent::Applied(assignment)
    }
}

/// Builder for [`OnlineClusterReducer`].
#[derive(Clone, Default)]
pub struct OnlineClusterReducerBuilder {
    original: Option<ReferenceDirections>,
    interval_of_aggregations: Option<i64>,
    number_of_clusters: Option<usize>,
    aggregation: Option<AxisAggregation>,
    reduced_target: Option<usize>,
    clusterer: Option<Arc<dyn ObjectiveClusterer>>,
}

impl OnlineClusterReducerBuilder {
    /// Sets the original reference directions. Required.
    #[must_use]
    pub fn original_directions(mut self, directions: ReferenceDirections) -> Self {
        self.original = Some(directions);
        self
    }

    /// Sets the generations between reductions. Zero or negative disables
    /// clustering. Default: 0.
    #[must_use]
    pub fn interval_of_aggregations(mut self, interval: i64) -> Self {
        self.interval_of_aggregations = Some(interval);
        self
    }

    /// Sets the target reduced dimension `k`. Default: the original
    /// dimension (no reduction).
    #[must_use]
    pub fn number_of_clusters(mut self, k: usize) -> Self {
        self.number_of_clusters = Some(k);
        self
    }

    /// Sets how member axes are combined. Default: [`AxisAggregation::Mean`].
    #[must_use]
    pub fn aggregation(mut self, aggregation: AxisAggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    /// Sets the minimum number of reduced directions to generate.
    /// Default: the number of original directions.
    #[must_use]
    pub fn reduced_target(mut self, target: usize) -> Self {
        self.reduced_target = Some(target);
        self
    }

    /// Sets the clustering strategy. Default: [`AgglomerativeClusterer`]
    /// with Ward linkage.
    #[must_use]
    pub fn clusterer(mut self, clusterer: Arc<dyn ObjectiveClusterer>) -> Self {
        self.clusterer = Some(clusterer);
        self
    }

    /// Builds the configured [`OnlineClusterReducer`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the original directions
    /// are missing or `k` is outside `1..=D`.
    pub fn build(self) -> Result<OnlineClusterReducer> {
        let original = self
            .original
            .ok_or_else(|| Error::config("original_directions", "must be set"))?;
        let dim = original.dim();
        let n_clusters = self.number_of_clusters.unwrap_or(dim);
        if n_clusters == 0 || n_clusters > dim {
            return Err(Error::config(
                "number_of_clusters",
                format!("must be in 1..={dim}, got {n_clusters}"),
            ));
        }
        let interval = self
            .interval_of_aggregations
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i > 0);
        let reduced_target = self.reduced_target.unwrap_or(original.len()).max(1);

        Ok(OnlineClusterReducer {
            interval,
            n_clusters,
            aggregation: self.aggregation.unwrap_or_default(),
            reduced_target,
            clusterer: self
                .clusterer
                .unwrap_or_else(|| Arc::new(AgglomerativeClusterer::default())),
            original,
            active: ActiveSpace::Original,
            last_boundary: None,
            history: Vec::new(),
        })
    }
}
