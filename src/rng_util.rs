/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Sample a point uniformly inside axis-aligned `bounds`.
pub(crate) fn uniform_in(rng: &mut fastrand::Rng, bounds: &[(f64, f64)]) -> Vec<f64> {
    bounds
        .iter()
        .map(|&(low, high)| f64_range(rng, low, high))
        .collect()
}
