//! Polynomial estimators.
//!
//! - [`LinearPolynomialEstimator`]: least-squares fit of all (or the first
//!   `degree + 1`) evaluations.
//! - [`WeightedPolynomialEstimator`]: least-squares fit of the best weighted
//!   evaluations, each row scaled by its weight.
//! - [`PolynomialFitter`]: adapter plugging the linear fit into the
//!   consensus engine.

pub mod linear;
pub mod weighted;

pub use linear::LinearPolynomialEstimator;
pub use weighted::WeightedPolynomialEstimator;

use crate::core::Estimator;
use crate::distance::DistanceMetric;
use crate::error::{invalid_argument, Result};
use crate::evaluation::{has_anchor, PolynomialEvaluation};
use crate::polynomial::Polynomial;

/// Degree used by estimators built without one.
pub const DEFAULT_DEGREE: usize = 1;

/// Kind of non-robust polynomial estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolynomialEstimatorType {
    #[default]
    Lmse,
    Weighted,
}

/// Common interface of the non-robust polynomial estimators.
pub trait PolynomialEstimator {
    fn degree(&self) -> usize;

    /// # Errors
    /// [`crate::Error::Locked`] while estimating, [`crate::Error::InvalidArgument`]
    /// for a zero degree.
    fn set_degree(&mut self, degree: usize) -> Result<()>;

    fn evaluations(&self) -> &[PolynomialEvaluation];

    /// # Errors
    /// [`crate::Error::Locked`] while estimating, [`crate::Error::InvalidArgument`]
    /// when fewer than `degree + 1` evaluations are given.
    fn set_evaluations(&mut self, evaluations: Vec<PolynomialEvaluation>) -> Result<()>;

    fn is_locked(&self) -> bool;

    fn is_ready(&self) -> bool;

    fn min_number_of_evaluations(&self) -> usize {
        self.degree() + 1
    }

    /// Fit a polynomial of the configured degree.
    ///
    /// # Errors
    /// [`crate::Error::Locked`], [`crate::Error::NotReady`], or
    /// [`crate::Error::Estimation`] when the system is singular.
    fn estimate(&mut self) -> Result<Polynomial>;

    fn estimator_type(&self) -> PolynomialEstimatorType;
}

/// Build an empty estimator of the requested kind.
pub fn create_polynomial_estimator(kind: PolynomialEstimatorType) -> Box<dyn PolynomialEstimator> {
    match kind {
        PolynomialEstimatorType::Lmse => Box::new(LinearPolynomialEstimator::new()),
        PolynomialEstimatorType::Weighted => Box::new(WeightedPolynomialEstimator::new()),
    }
}

pub(crate) fn check_degree(degree: usize) -> Result<()> {
    if degree < 1 {
        return Err(invalid_argument("degree must be at least 1"));
    }
    Ok(())
}

pub(crate) fn check_evaluations(degree: usize, evaluations: &[PolynomialEvaluation]) -> Result<()> {
    if evaluations.len() < degree + 1 {
        return Err(invalid_argument(format!(
            "at least {} evaluations are required for degree {degree}, got {}",
            degree + 1,
            evaluations.len()
        )));
    }
    Ok(())
}

/// Consensus-engine estimator for polynomials of a fixed degree.
#[derive(Debug, Clone, Copy)]
pub struct PolynomialFitter {
    degree: usize,
    metric: DistanceMetric,
}

impl PolynomialFitter {
    pub fn new(degree: usize, metric: DistanceMetric) -> Self {
        Self { degree, metric }
    }
}

impl Estimator for PolynomialFitter {
    type Model = Polynomial;

    fn sample_size(&self) -> usize {
        self.degree + 1
    }

    /// A subset without any direct or integral evaluation leaves the
    /// constant term undetermined.
    fn is_valid_sample(&self, data: &[PolynomialEvaluation], sample: &[usize]) -> bool {
        has_anchor(sample.iter().map(|&i| &data[i]))
    }

    fn estimate_model(
        &self,
        data: &[PolynomialEvaluation],
        sample: &[usize],
    ) -> Result<Polynomial> {
        linear::fit_polynomial(self.degree, sample.iter().map(|&i| &data[i]), false)
    }

    fn estimate_model_nonminimal(
        &self,
        data: &[PolynomialEvaluation],
        sample: &[usize],
    ) -> Result<Polynomial> {
        linear::fit_polynomial(self.degree, sample.iter().map(|&i| &data[i]), true)
    }

    fn residual(&self, model: &Polynomial, evaluation: &PolynomialEvaluation) -> f64 {
        self.metric.distance(evaluation, model)
    }
}
