//! High-level Rust API.
//!
//! One-call helpers wrapping [`RobustPolynomialEstimator`] and the linear
//! estimators for callers that do not need listeners or reuse.

use crate::error::Result;
use crate::estimators::{LinearPolynomialEstimator, PolynomialEstimator};
use crate::evaluation::PolynomialEvaluation;
use crate::polynomial::Polynomial;
use crate::robust::RobustPolynomialEstimator;
use crate::scoring::Score;
use crate::settings::{RobustEstimatorMethod, RobustSettings};

/// Result of a robust estimation.
#[derive(Debug, Clone)]
pub struct EstimationResult {
    /// The estimated polynomial.
    pub model: Polynomial,
    /// Indices of inlier evaluations.
    pub inliers: Vec<usize>,
    /// Score of the best candidate.
    pub score: Score,
    /// Number of iterations performed.
    pub iterations: usize,
}

/// Robustly fit a polynomial of `degree` to `evaluations`.
///
/// # Arguments
/// * `method` - Robust method to use
/// * `degree` - Degree of the polynomial, at least 1
/// * `evaluations` - At least `degree + 1` evaluations
/// * `quality_scores` - One score per evaluation; required by PROSAC and PROMedS
/// * `settings_opt` - Optional settings (uses defaults if None)
/// * `seed` - Optional seed for reproducible results
///
/// # Returns
/// `EstimationResult` containing the polynomial, inliers, score, and iterations.
pub fn estimate_polynomial(
    method: RobustEstimatorMethod,
    degree: usize,
    evaluations: Vec<PolynomialEvaluation>,
    quality_scores: Option<Vec<f64>>,
    settings_opt: Option<RobustSettings>,
    seed: Option<u64>,
) -> Result<EstimationResult> {
    let mut estimator = RobustPolynomialEstimator::new(method)
        .with_degree(degree)?
        .with_evaluations(evaluations)?
        .with_settings(settings_opt.unwrap_or_default())?;
    if let Some(scores) = quality_scores {
        estimator.set_quality_scores(scores)?;
    }
    estimator.set_seed(seed)?;

    let model = estimator.estimate()?;
    let data = estimator
        .inliers_data()
        .cloned()
        .ok_or(crate::error::Error::NotReady("no consensus data available"))?;

    Ok(EstimationResult {
        model,
        inliers: data.inliers,
        score: data.score,
        iterations: data.iterations,
    })
}

/// Least-squares fit of all `evaluations` (no outlier rejection).
pub fn fit_polynomial(degree: usize, evaluations: Vec<PolynomialEvaluation>) -> Result<Polynomial> {
    let mut estimator =
        LinearPolynomialEstimator::with_degree_and_evaluations(degree, evaluations)?;
    estimator.set_lmse_solution_allowed(true)?;
    estimator.estimate()
}
