//! Linear least-squares polynomial estimator.
//!
//! Every evaluation is mapped to one row of a design matrix whose unknowns
//! are the `degree + 1` polynomial coefficients:
//!
//! - direct evaluation at `x`: `[1, x, x^2, ..., x^d]`
//! - derivative of order `k` at `x`: entry `i >= k` is `i!/(i-k)! x^(i-k)`
//! - integral of order `k` at `x`: entry `i` is `x^(i+k) i!/(i+k)!`, with the
//!   contribution of the integration constants moved to the right-hand side
//! - interval integral: same as the integral, differenced between both ends
//!
//! Rows and right-hand sides are normalized jointly so that evaluations of
//! very different magnitude weigh the same, then the system is solved in the
//! least-squares sense.

use tracing::debug;

use super::{check_degree, check_evaluations, PolynomialEstimator, PolynomialEstimatorType};
use crate::error::{Error, Result};
use crate::evaluation::{has_anchor, PolynomialEvaluation};
use crate::listener::{dispatch, EstimationEvent, EstimatorListener};
use crate::polynomial::{integration_constants_contribution, Polynomial};
use crate::types::{DataMatrix, DataVector};
use crate::utils::{ascending_factorial, falling_factorial, solve_least_squares};

/// Fill `row` (length `degree + 1`) for `evaluation` and return the matching
/// right-hand side.
pub(crate) fn fill_row(evaluation: &PolynomialEvaluation, row: &mut [f64]) -> f64 {
    match evaluation {
        PolynomialEvaluation::Direct(e) => {
            let mut power = 1.0;
            for entry in row.iter_mut() {
                *entry = power;
                power *= e.x();
            }
            e.evaluation()
        }
        PolynomialEvaluation::Derivative(e) => {
            let order = e.derivative_order();
            let mut power = 1.0;
            for (i, entry) in row.iter_mut().enumerate() {
                if i < order {
                    *entry = 0.0;
                    continue;
                }
                *entry = falling_factorial(i, order) * power;
                power *= e.x();
            }
            e.evaluation()
        }
        PolynomialEvaluation::Integral(e) => {
            let order = e.integral_order();
            let x = e.x();
            for (i, entry) in row.iter_mut().enumerate() {
                *entry = x.powi((i + order) as i32) / ascending_factorial(i + 1, order);
            }
            e.evaluation()
                - integration_constants_contribution(e.constants(), order, |p| x.powi(p as i32))
        }
        PolynomialEvaluation::IntegralInterval(e) => {
            let order = e.integral_order();
            let (start, end) = (e.start_x(), e.end_x());
            for (i, entry) in row.iter_mut().enumerate() {
                let p = (i + order) as i32;
                *entry = (end.powi(p) - start.powi(p)) / ascending_factorial(i + 1, order);
            }
            e.evaluation()
                - integration_constants_contribution(e.constants(), order, |p| {
                    end.powi(p as i32) - start.powi(p as i32)
                })
        }
    }
}

/// Divide `row` and `rhs` by the norm of `[row, rhs]`; all-zero rows are
/// left untouched.
pub(crate) fn normalize_row(row: &mut [f64], rhs: &mut f64) {
    let norm = (row.iter().map(|v| v * v).sum::<f64>() + *rhs * *rhs).sqrt();
    if norm > 0.0 {
        row.iter_mut().for_each(|v| *v /= norm);
        *rhs /= norm;
    }
}

/// Fit a polynomial of `degree` to `evaluations`.
///
/// Without `allow_lmse` only the first `degree + 1` evaluations are used,
/// which interpolates them exactly.
pub(crate) fn fit_polynomial<'a, I>(
    degree: usize,
    evaluations: I,
    allow_lmse: bool,
) -> Result<Polynomial>
where
    I: IntoIterator<Item = &'a PolynomialEvaluation>,
{
    let unknowns = degree + 1;
    let selected: Vec<&PolynomialEvaluation> = if allow_lmse {
        evaluations.into_iter().collect()
    } else {
        evaluations.into_iter().take(unknowns).collect()
    };
    if selected.len() < unknowns {
        return Err(Error::NotReady("not enough evaluations for the requested degree"));
    }

    let mut a = DataMatrix::zeros(selected.len(), unknowns);
    let mut b = DataVector::zeros(selected.len());
    let mut row = vec![0.0; unknowns];
    for (r, evaluation) in selected.iter().enumerate() {
        let mut rhs = fill_row(evaluation, &mut row);
        normalize_row(&mut row, &mut rhs);
        for (c, value) in row.iter().enumerate() {
            a[(r, c)] = *value;
        }
        b[r] = rhs;
    }

    let solution = solve_least_squares(a, &b)?;
    Ok(Polynomial::from_coefficients_unchecked(
        solution.iter().copied().collect(),
    ))
}

/// Least-squares polynomial estimator over a collection of evaluations.
///
/// By default the LMSE solution is not allowed: exactly `degree + 1`
/// evaluations are used (the first ones supplied) and the result interpolates
/// them. Enable [`set_lmse_solution_allowed`](Self::set_lmse_solution_allowed)
/// to fit all evaluations in the least-squares sense.
pub struct LinearPolynomialEstimator {
    degree: usize,
    evaluations: Vec<PolynomialEvaluation>,
    allow_lmse_solution: bool,
    listener: Option<Box<dyn EstimatorListener<LinearPolynomialEstimator>>>,
    locked: bool,
}

impl Default for LinearPolynomialEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearPolynomialEstimator {
    pub const DEFAULT_ALLOW_LMSE_SOLUTION: bool = false;

    /// Estimator for first-degree polynomials without evaluations.
    pub fn new() -> Self {
        Self {
            degree: super::DEFAULT_DEGREE,
            evaluations: Vec::new(),
            allow_lmse_solution: Self::DEFAULT_ALLOW_LMSE_SOLUTION,
            listener: None,
            locked: false,
        }
    }

    pub fn with_degree(degree: usize) -> Result<Self> {
        let mut estimator = Self::new();
        estimator.set_degree(degree)?;
        Ok(estimator)
    }

    pub fn with_evaluations(evaluations: Vec<PolynomialEvaluation>) -> Result<Self> {
        let mut estimator = Self::new();
        estimator.set_evaluations(evaluations)?;
        Ok(estimator)
    }

    pub fn with_degree_and_evaluations(
        degree: usize,
        evaluations: Vec<PolynomialEvaluation>,
    ) -> Result<Self> {
        let mut estimator = Self::new();
        estimator.set_degree_and_evaluations(degree, evaluations)?;
        Ok(estimator)
    }

    /// Attach a listener, builder style.
    pub fn with_listener<L>(mut self, listener: L) -> Self
    where
        L: EstimatorListener<LinearPolynomialEstimator> + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn set_degree_and_evaluations(
        &mut self,
        degree: usize,
        evaluations: Vec<PolynomialEvaluation>,
    ) -> Result<()> {
        self.check_unlocked()?;
        check_degree(degree)?;
        check_evaluations(degree, &evaluations)?;
        self.degree = degree;
        self.evaluations = evaluations;
        Ok(())
    }

    pub fn is_lmse_solution_allowed(&self) -> bool {
        self.allow_lmse_solution
    }

    pub fn set_lmse_solution_allowed(&mut self, allowed: bool) -> Result<()> {
        self.check_unlocked()?;
        self.allow_lmse_solution = allowed;
        Ok(())
    }

    pub fn set_listener(
        &mut self,
        listener: Option<Box<dyn EstimatorListener<LinearPolynomialEstimator>>>,
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
}

impl PolynomialEstimator for LinearPolynomialEstimator {
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
        self.evaluations.len() >= self.min_number_of_evaluations() && has_anchor(&self.evaluations)
    }

    fn estimate(&mut self) -> Result<Polynomial> {
        self.check_unlocked()?;
        if !self.is_ready() {
            return Err(Error::NotReady(
                "needs degree + 1 evaluations including a direct or integral one",
            ));
        }

        self.locked = true;
        self.notify(EstimationEvent::Start);

        let result = fit_polynomial(self.degree, &self.evaluations, self.allow_lmse_solution);
        match &result {
            Ok(polynomial) => {
                debug!(
                    degree = self.degree,
                    coefficients = ?polynomial.coefficients(),
                    "linear polynomial estimated"
                );
                self.notify(EstimationEvent::End);
            }
            Err(err) => debug!(%err, "linear polynomial estimation failed"),
        }

        self.locked = false;
        result
    }

    fn estimator_type(&self) -> PolynomialEstimatorType {
        PolynomialEstimatorType::Lmse
    }
}
