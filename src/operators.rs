//! Variation operators: rank tournament, SBX crossover and polynomial
//! mutation over bounded real-valued decision vectors.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::population::Individual;
use crate::rng_util;

/// Settings of the variation step.
///
/// | Field | Default |
/// |-------|---------|
/// | `crossover_prob` | 1.0 |
/// | `crossover_eta` | 30.0 |
/// | `mutation_eta` | 20.0 |
/// | `mutation_prob` | `1 / n_var` |
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    /// Probability that a parent pair is recombined at all.
    pub crossover_prob: f64,
    /// SBX distribution index; larger keeps children closer to parents.
    pub crossover_eta: f64,
    /// Polynomial mutation distribution index.
    pub mutation_eta: f64,
    /// Per-gene mutation probability; `None` means `1 / n_var`.
    pub mutation_prob: Option<f64>,
}

impl Default for Variation {
    fn default() -> Self {
        Self {
            crossover_prob: 1.0,
            crossover_eta: 30.0,
            mutation_eta: 20.0,
            mutation_prob: None,
        }
    }
}

impl Variation {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.crossover_prob) {
            return Err(Error::config("crossover_prob", "must be in [0, 1]"));
        }
        if !(self.crossover_eta > 0.0 && self.crossover_eta.is_finite()) {
            return Err(Error::config("crossover_eta", "must be positive and finite"));
        }
        if !(self.mutation_eta > 0.0 && self.mutation_eta.is_finite()) {
            return Err(Error::config("mutation_eta", "must be positive and finite"));
        }
        if let Some(p) = self.mutation_prob
            && !(0.0..=1.0).contains(&p)
        {
            return Err(Error::config("mutation_prob", "must be in [0, 1]"));
        }
        Ok(())
    }

    /// Breed `n` pending offspring from `parents`.
    ///
    /// Parents are picked by binary tournament on their front rank.
    /// With fewer than two parents the offspring are sampled uniformly
    /// inside `bounds` instead.
    pub(crate) fn offspring(
        &self,
        rng: &mut fastrand::Rng,
        parents: &[Individual],
        bounds: &[(f64, f64)],
        n: usize,
        generation: usize,
    ) -> Vec<Individual> {
        if parents.len() < 2 {
            return (0..n)
                .map(|_| Individual::new(rng_util::uniform_in(rng, bounds), generation))
                .collect();
        }

        let ranks: Vec<usize> = parents.iter().map(|p| p.rank.unwrap_or(0)).collect();
        let mut offspring = Vec::with_capacity(n);
        while offspring.len() < n {
            let p1 = tournament_select_rank(rng, &ranks);
            let p2 = tournament_select_rank(rng, &ranks);

            let (mut child1, mut child2) = crossover(
                rng,
                &parents[p1].decision,
                &parents[p2].decision,
                bounds,
                self.crossover_prob,
                self.crossover_eta,
            );
            mutate(rng, &mut child1, bounds, self.mutation_eta, self.mutation_prob);
            mutate(rng, &mut child2, bounds, self.mutation_eta, self.mutation_prob);

            offspring.push(Individual::new(child1, generation));
            if offspring.len() < n {
                offspring.push(Individual::new(child2, generation));
            }
        }
        offspring
    }
}

/// Binary tournament on front rank; lower rank wins, ties go to the first pick.
fn tournament_select_rank(rng: &mut fastrand::Rng, ranks: &[usize]) -> usize {
    let a = rng.usize(0..ranks.len());
    let b = rng.usize(0..ranks.len());
    if ranks[a] <= ranks[b] { a } else { b }
}

/// SBX crossover over every gene of two parents.
pub(crate) fn crossover(
    rng: &mut fastrand::Rng,
    parent1: &[f64],
    parent2: &[f64],
    bounds: &[(f64, f64)],
    crossover_prob: f64,
    eta: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut child1 = parent1.to_vec();
    let mut child2 = parent2.to_vec();

    if rng_util::f64_range(rng, 0.0, 1.0) > crossover_prob {
        return (child1, child2);
    }

    for (i, &(low, high)) in bounds.iter().enumerate() {
        let (p1, p2) = (parent1[i], parent2[i]);
        if (p1 - p2).abs() < 1e-14 {
            continue;
        }
        let (c1, c2) = sbx_crossover_f64(rng, p1, p2, low, high, eta);
        // Exchange the gene between children with probability 0.5.
        if rng.bool() {
            child1[i] = c1;
            child2[i] = c2;
        } else {
            child1[i] = c2;
            child2[i] = c1;
        }
    }

    (child1, child2)
}

/// SBX crossover for a single gene.
pub(crate) fn sbx_crossover_f64(
    rng: &mut fastrand::Rng,
    p1: f64,
    p2: f64,
    low: f64,
    high: f64,
    eta: f64,
) -> (f64, f64) {
    let u: f64 = rng_util::f64_range(rng, 0.0, 1.0);

    let beta = if u <= 0.5 {
        (2.0 * u).powf(1.0 / (eta + 1.0))
    } else {
        (1.0 / (2.0 * (1.0 - u))).powf(1.0 / (eta + 1.0))
    };

    let c1 = 0.5 * ((1.0 + beta) * p1 + (1.0 - beta) * p2);
    let c2 = 0.5 * ((1.0 - beta) * p1 + (1.0 + beta) * p2);

    (c1.clamp(low, high), c2.clamp(low, high))
}

/// Polynomial mutation, gene by gene.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mutate(
    rng: &mut fastrand::Rng,
    genes: &mut [f64],
    bounds: &[(f64, f64)],
    eta: f64,
    mutation_prob: Option<f64>,
) {
    let n = genes.len();
    if n == 0 {
        return;
    }
    let prob = mutation_prob.unwrap_or(1.0 / n as f64);

    for (x, &(low, high)) in genes.iter_mut().zip(bounds) {
        if rng_util::f64_range(rng, 0.0, 1.0) >= prob {
            continue;
        }
        *x = polynomial_mutation_f64(rng, *x, low, high, eta);
    }
}

/// Polynomial mutation for a single gene.
pub(crate) fn polynomial_mutation_f64(
    rng: &mut fastrand::Rng,
    x: f64,
    low: f64,
    high: f64,
    eta: f64,
) -> f64 {
    let u: f64 = rng_util::f64_range(rng, 0.0, 1.0);
    let range = high - low;
    if range <= 0.0 {
        return x;
    }

    let delta1 = (x - low) / range;
    let delta2 = (high - x) / range;

    let delta_q = if u < 0.5 {
        let xy = 1.0 - delta1;
        let val = 2.0 * u + (1.0 - 2.0 * u) * xy.powf(eta + 1.0);
        val.powf(1.0 / (eta + 1.0)) - 1.0
    } else {
        let xy = 1.0 - delta2;
        let val = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * xy.powf(eta + 1.0);
        1.0 - val.powf(1.0 / (eta + 1.0))
    };

    (x + delta_q * range).clamp(low, high)
}
