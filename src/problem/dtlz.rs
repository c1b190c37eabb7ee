//! DTLZ1 and DTLZ2 (Deb, Thiele, Laumanns, Zitzler 2002).

use core::f64::consts::PI;

use super::{Evaluation, Problem};
use crate::error::EvaluationError;
use crate::reference::das_dennis;

/// DTLZ1: linear Pareto front `sum(f) = 0.5` with a multimodal distance
/// function.
#[derive(Clone, Debug)]
pub struct Dtlz1 {
    n_var: usize,
    n_obj: usize,
}

impl Dtlz1 {
    /// `n_obj` objectives and the customary `n_obj + 4` variables.
    #[must_use]
    pub fn new(n_obj: usize) -> Self {
        Self::with_n_var(n_obj, n_obj + 4)
    }

    /// Explicit variable count; clamped to at least `n_obj`.
    #[must_use]
    pub fn with_n_var(n_obj: usize, n_var: usize) -> Self {
        Self {
            n_var: n_var.max(n_obj),
            n_obj,
        }
    }
}

impl Problem for Dtlz1 {
    fn name(&self) -> &str {
        "DTLZ1"
    }

    fn n_var(&self) -> usize {
        self.n_var
    }

    fn n_obj(&self) -> usize {
        self.n_obj
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        vec![(0.0, 1.0); self.n_var]
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate(&self, x: &[f64]) -> Result<Evaluation, EvaluationError> {
        check_len(x, self.n_var)?;
        let (head, tail) = x.split_at(self.n_obj - 1);
        let g = 100.0
            * (tail.len() as f64
                + tail
                    .iter()
                    .map(|&xi| (xi - 0.5).powi(2) - (20.0 * PI * (xi - 0.5)).cos())
                    .sum::<f64>());

        let objectives = (0..self.n_obj)
            .map(|i| {
                let m = self.n_obj - 1 - i;
                let mut f = 0.5 * (1.0 + g);
                f *= head[..m].iter().product::<f64>();
                if i > 0 {
                    f *= 1.0 - head[m];
                }
                f
            })
            .collect::<Vec<_>>();
        Ok(objectives.into())
    }

    fn pareto_front(&self, n_partitions: usize) -> Option<Vec<Vec<f64>>> {
        Some(
            das_dennis(self.n_obj, n_partitions)
                .into_iter()
                .map(|p| p.into_iter().map(|v| 0.5 * v).collect())
                .collect(),
        )
    }

    fn nadir_point(&self) -> Option<Vec<f64>> {
        Some(vec![0.5; self.n_obj])
    }
}

/// DTLZ2: spherical Pareto front `sum(f^2) = 1`.
#[derive(Clone, Debug)]
pub struct Dtlz2 {
    n_var: usize,
    n_obj: usize,
}

impl Dtlz2 {
    /// `n_obj` objectives and the customary `n_obj + 9` variables.
    #[must_use]
    pub fn new(n_obj: usize) -> Self {
        Self::with_n_var(n_obj, n_obj + 9)
    }

    /// Explicit variable count; clamped to at least `n_obj`.
    #[must_use]
    pub fn with_n_var(n_obj: usize, n_var: usize) -> Self {
        Self {
            n_var: n_var.max(n_obj),
            n_obj,
        }
    }
}

impl Problem for Dtlz2 {
    fn name(&self) -> &str {
        "DTLZ2"
    }

    fn n_var(&self) -> usize {
        self.n_var
    }

    fn n_obj(&self) -> usize {
        self.n_obj
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        vec![(0.0, 1.0); self.n_var]
    }

    fn evaluate(&self, x: &[f64]) -> Result<Evaluation, EvaluationError> {
        check_len(x, self.n_var)?;
        let (head, tail) = x.split_at(self.n_obj - 1);
        let g: f64 = tail.iter().map(|&xi| (xi - 0.5).powi(2)).sum();

        let objectives = (0..self.n_obj)
            .map(|i| {
                let m = self.n_obj - 1 - i;
                let mut f = 1.0 + g;
                for &xi in &head[..m] {
                    f *= (xi * PI / 2.0).cos();
                }
                if i > 0 {
                    f *= (head[m] * PI / 2.0).sin();
                }
                f
            })
            .collect::<Vec<_>>();
        Ok(objectives.into())
    }

    fn pareto_front(&self, n_partitions: usize) -> Option<Vec<Vec<f64>>> {
        Some(
            das_dennis(self.n_obj, n_partitions)
                .into_iter()
                .map(|p| {
                    let norm = p.iter().map(|v| v * v).sum::<f64>().sqrt();
                    p.into_iter().map(|v| v / norm).collect()
                })
                .collect(),
        )
    }

    fn nadir_point(&self) -> Option<Vec<f64>> {
        Some(vec![1.0; self.n_obj])
    }
}

fn check_len(x: &[f64], n_var: usize) -> Result<(), EvaluationError> {
    if x.len() == n_var {
        Ok(())
    } else {
        Err(EvaluationError::Failed(format!(
            "expected {n_var} decision variables, got {}",
            x.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtlz2_optimum_lies_on_unit_sphere() {
        let p = Dtlz2::new(5);
        let mut x = vec![0.5; p.n_var()];
        x[0] = 0.3;
        x[1] = 0.8;
        let f = p.evaluate(&x).unwrap().objectives;
        assert_eq!(f.len(), 5);
        let r: f64 = f.iter().map(|v| v * v).sum();
        assert!((r - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_dtlz1_optimum_lies_on_hyperplane() {
        let p = Dtlz1::new(3);
        let mut x = vec![0.5; p.n_var()];
        x[0] = 0.2;
        let f = p.evaluate(&x).unwrap().objectives;
        assert!((f.iter().sum::<f64>() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_pareto_front_samples() {
        let front = Dtlz2::new(3).pareto_front(4).unwrap();
        assert_eq!(front.len(), 15);
        for p in &front {
            let r: f64 = p.iter().map(|v| v * v).sum();
            assert!((r - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_wrong_length_is_an_evaluation_error() {
        assert!(Dtlz2::new(3).evaluate(&[0.5; 3]).is_err());
    }
}
