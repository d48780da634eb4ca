//! Weighted polynomial estimator.
//!
//! Only the `max_evaluations` evaluations with the largest weights take part
//! in the fit (never fewer than `degree + 1`). Each normalized row is scaled
//! by `weight / max_weight`, so heavier evaluations dominate the
//! least-squares solution.

use tracing::debug;

use super::linear::{fill_row, normalize_row};
use super::{check_degree, check_evaluations, PolynomialEstimator, PolynomialEstimatorType};
use crate::error::{invalid_argument, Error, Result};
use crate::evaluation::{has_anchor, PolynomialEvaluation};
use crate::listener::{dispatch, EstimationEvent, EstimatorListener};
use crate::polynomial::Polynomial;
use crate::types::{DataMatrix, DataVector};
use crate::utils::solve_least_squares;

/// Least-squares polynomial estimator weighting each evaluation.
pub struct WeightedPolynomialEstimator {
    degree: usize,
    evaluations: Vec<PolynomialEvaluation>,
    weights: Vec<f64>,
    max_evaluations: usize,
    sort_weights: bool,
    listener: Option<Box<dyn EstimatorListener<WeightedPolynomialEstimator>>>,
    locked: bool,
}

impl Default for WeightedPolynomialEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightedPolynomialEstimator {
    pub const DEFAULT_MAX_EVALUATIONS: usize = 50;
    pub const DEFAULT_SORT_WEIGHTS: bool = true;

    pub fn new() -> Self {
        Self {
            degree: super::DEFAULT_DEGREE,
            evaluations: Vec::new(),
            weights: Vec::new(),
            max_evaluations: Self::DEFAULT_MAX_EVALUATIONS,
            sort_weights: Self::DEFAULT_SORT_WEIGHTS,
            listener: None,
            locked: false,
        }
    }

    pub fn with_degree(degree: usize) -> Result<Self> {
        let mut estimator = Self::new();
        estimator.set_degree(degree)?;
        Ok(estimator)
    }

    pub fn with_evaluations_and_weights(
        evaluations: Vec<PolynomialEvaluation>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        let mut estimator = Self::new();
        estimator.set_evaluations_and_weights(evaluations, weights)?;
        Ok(estimator)
    }

    pub fn with_degree_evaluations_and_weights(
        degree: usize,
        evaluations: Vec<PolynomialEvaluation>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        let mut estimator = Self::new();
        estimator.set_degree_evaluations_and_weights(degree, evaluations, weights)?;
        Ok(estimator)
    }

    pub fn with_listener<L>(mut self, listener: L) -> Self
    where
        L: EstimatorListener<WeightedPolynomialEstimator> + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// # Errors
    /// [`Error::InvalidArgument`] when the lengths differ or fewer than
    /// `degree + 1` evaluations are given.
    pub fn set_evaluations_and_weights(
        &mut self,
        evaluations: Vec<PolynomialEvaluation>,
        weights: Vec<f64>,
    ) -> Result<()> {
        self.check_unlocked()?;
        check_evaluations(self.degree, &evaluations)?;
        check_weights(&evaluations, &weights)?;
        self.evaluations = evaluations;
        self.weights = weights;
        Ok(())
    }

    pub fn set_degree_evaluations_and_weights(
        &mut self,
        degree: usize,
        evaluations: Vec<PolynomialEvaluation>,
        weights: Vec<f64>,
    ) -> Result<()> {
        self.check_unlocked()?;
        check_degree(degree)?;
        check_evaluations(degree, &evaluations)?;
        check_weights(&evaluations, &weights)?;
        self.degree = degree;
        self.evaluations = evaluations;
        self.weights = weights;
        Ok(())
    }

    pub fn max_evaluations(&self) -> usize {
        self.max_evaluations
    }

    /// # Errors
    /// [`Error::InvalidArgument`] when below `degree + 1`.
    pub fn set_max_evaluations(&mut self, max_evaluations: usize) -> Result<()> {
        self.check_unlocked()?;
        if max_evaluations < self.min_number_of_evaluations() {
            return Err(invalid_argument(format!(
                "max evaluations must be at least {}, got {max_evaluations}",
                self.min_number_of_evaluations()
            )));
        }
        self.max_evaluations = max_evaluations;
        Ok(())
    }

    pub fn is_sorting_enabled(&self) -> bool {
        self.sort_weights
    }

    /// When disabled, the first `max_evaluations` evaluations are used in the
    /// order given.
    pub fn set_sorting_enabled(&mut self, sort_weights: bool) -> Result<()> {
        self.check_unlocked()?;
        self.sort_weights = sort_weights;
        Ok(())
    }

    pub fn set_listener(
        &mut self,
        listener: Option<Box<dyn EstimatorListener<WeightedPolynomialEstimator>>>,
    ) -> Result<()> {
        self.check_unlocked()?;
        self.listener = listener;
        Ok(())
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(Error::Locked);
        }
        Ok(())
    }

    fn notify(&mut self, event: EstimationEvent) {
        if let Some(mut listener) = self.listener.take() {
            dispatch(listener.as_mut(), self, event);
            self.listener = Some(listener);
        }
    }

    /// Indices of the evaluations taking part in the fit.
    fn selected_indices(&self) -> Vec<usize> {
        let count = self
            .max_evaluations
            .max(self.min_number_of_evaluations())
            .min(self.evaluations.len());
        let mut indices: Vec<usize> = (0..self.evaluations.len()).collect();
        if self.sort_weights {
            indices.sort_by(|&a, &b| self.weights[b].total_cmp(&self.weights[a]));
        }
        indices.truncate(count);
        indices
    }

    fn fit(&self) -> Result<Polynomial> {
        let indices = self.selected_indices();
        let max_weight = indices
            .iter()
            .map(|&i| self.weights[i].abs())
            .fold(0.0, f64::max);

        let unknowns = self.degree + 1;
        let mut a = DataMatrix::zeros(indices.len(), unknowns);
        let mut b = DataVector::zeros(indices.len());
        let mut row = vec![0.0; unknowns];
        for (r, &i) in indices.iter().enumerate() {
            let mut rhs = fill_row(&self.evaluations[i], &mut row);
            normalize_row(&mut row, &mut rhs);
            let factor = if max_weight > 0.0 {
                self.weights[i] / max_weight
            } else {
                1.0
            };
            for (c, value) in row.iter().enumerate() {
                a[(r, c)] = value * factor;
            }
            b[r] = rhs * factor;
        }

        let solution = solve_least_squares(a, &b)?;
        Ok(Polynomial::from_coefficients_unchecked(
            solution.iter().copied().collect(),
        ))
    }
}

fn check_weights(evaluations: &[PolynomialEvaluation], weights: &[f64]) -> Result<()> {
    if weights.len() != evaluations.len() {
        return Err(invalid_argument(format!(
            "expected {} weights, got {}",
            evaluations.len(),
            weights.len()
        )));
    }
    Ok(())
}

impl PolynomialEstimator for WeightedPolynomialEstimator {
    fn degree(&self) -> usize {
        self.degree
    }

    fn set_degree(&mut self, degree: usize) -> Result<()> {
        self.check_unlocked()?;
        check_degree(degree)?;
        self.degree = degree;
        Ok(())
    }

    fn evaluations(&self) -> &[PolynomialEvaluation] {
        &self.evaluations
    }

    /// Replaces the evaluations; weights must be set again with
    /// [`WeightedPolynomialEstimator::set_evaluations_and_weights`] unless
    /// the count is unchanged.
    fn set_evaluations(&mut self, evaluations: Vec<PolynomialEvaluation>) -> Result<()> {
        self.check_unlocked()?;
        check_evaluations(self.degree, &evaluations)?;
        self.evaluations = evaluations;
        Ok(())
    }

    fn is_locked(&self) -> bool {
        self.locked
    }

    fn is_ready(&self) -> bool {
        self.evaluations.len() >= self.min_number_of_evaluations()
            && self.weights.len() == self.evaluations.len()
            && has_anchor(&self.evaluations)
    }

    fn estimate(&mut self) -> Result<Polynomial> {
        self.check_unlocked()?;
        if !self.is_ready() {
            return Err(Error::NotReady(
                "needs degree + 1 weighted evaluations including a direct or integral one",
            ));
        }

        self.locked = true;
        self.notify(EstimationEvent::Start);

        let result = self.fit();
        match &result {
            Ok(polynomial) => {
                debug!(
                    degree = self.degree,
                    coefficients = ?polynomial.coefficients(),
                    "weighted polynomial estimated"
                );
                self.notify(EstimationEvent::End);
            }
            Err(err) => debug!(%err, "weighted polynomial estimation failed"),
        }

        self.locked = false;
        result
    }

    fn estimator_type(&self) -> PolynomialEstimatorType {
        PolynomialEstimatorType::Weighted
    }
}
