//! Miscellaneous utilities shared across the crate.
//!
//! This module holds the seedable index generator used by the samplers, the
//! least-squares solver behind the linear estimators and a few small numeric
//! helpers.

use nalgebra::SVD;
use rand::distributions::Uniform;
use rand::prelude::*;

use crate::error::{NumericalError, Result};
use crate::types::{DataMatrix, DataVector};

/// Uniform index generator drawing from an inclusive range.
///
/// By default this uses an entropy-seeded RNG, but test code can construct
/// it from a fixed seed for reproducible behavior.
pub struct UniformRandomGenerator {
    rng: StdRng,
    dist: Uniform<usize>,
}

impl Default for UniformRandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformRandomGenerator {
    /// Construct with a random seed (suitable for production use).
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            dist: Uniform::new_inclusive(0, 0),
        }
    }

    /// Construct with a fixed seed (useful for tests).
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            dist: Uniform::new_inclusive(0, 0),
        }
    }

    /// Construct from an optional seed, falling back to entropy.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::from_seed)
    }

    /// Reset the distribution range to `[min, max]`.
    pub fn reset(&mut self, min: usize, max: usize) {
        self.dist = Uniform::new_inclusive(min, max);
    }

    /// Draw a single random value using the current distribution.
    pub fn next(&mut self) -> usize {
        self.rng.sample(&self.dist)
    }

    /// Generate a set of unique random indices in `[min, max]` into `out`.
    ///
    /// Rejection sampling; suitable for the small sample sizes of minimal
    /// subsets. `out.len()` must not exceed `max - min + 1`.
    pub fn gen_unique(&mut self, out: &mut [usize], min: usize, max: usize) {
        debug_assert!(out.len() <= max - min + 1);
        self.reset(min, max);
        for i in 0..out.len() {
            loop {
                let candidate = self.next();
                if out[..i].iter().all(|&v| v != candidate) {
                    out[i] = candidate;
                    break;
                }
            }
        }
    }
}

/// Solve `a * x = b` in the least-squares sense.
///
/// The system must have full column rank; a rank-deficient design matrix is
/// reported as [`NumericalError::SingularSystem`].
pub fn solve_least_squares(a: DataMatrix, b: &DataVector) -> Result<DataVector> {
    let unknowns = a.ncols();
    let scale = a.nrows().max(unknowns) as f64;
    let svd = SVD::new(a, true, true);

    let max_singular = svd.singular_values.max();
    let eps = (f64::EPSILON * scale * max_singular).max(f64::MIN_POSITIVE);
    let rank = svd.rank(eps);
    if rank < unknowns {
        return Err(NumericalError::SingularSystem { rank, unknowns }.into());
    }

    svd.solve(b, eps)
        .map_err(|e| NumericalError::Solver(e).into())
}

/// `n (n-1) ... (n-k+1)`; 1 when `k` is zero.
pub fn falling_factorial(n: usize, k: usize) -> f64 {
    (0..k).map(|t| (n - t) as f64).product()
}

/// `start (start+1) ... (start+count-1)`; 1 when `count` is zero.
pub fn ascending_factorial(start: usize, count: usize) -> f64 {
    (0..count).map(|t| (start + t) as f64).product()
}

/// `n!`
pub fn factorial(n: usize) -> f64 {
    ascending_factorial(1, n)
}

/// Upper median (element at `len / 2` once sorted) of `values`.
///
/// The slice is partially reordered. Returns `None` for an empty slice.
pub fn upper_median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mid = values.len() / 2;
    let (_, median, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    Some(*median)
}
