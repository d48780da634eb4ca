//! Polynomial evaluations: the observations the estimators fit against.
//!
//! An evaluation records a value the unknown polynomial (or one of its
//! derivatives or integrals) takes at a point or over an interval. Each kind
//! contributes one row to the linear system solved by the estimators.

use crate::error::{invalid_argument, Result};
use crate::polynomial::check_integral_order;

/// Tag identifying the kind of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationKind {
    Direct,
    Derivative,
    Integral,
    IntegralInterval,
}

/// Value of the polynomial at `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectEvaluation {
    x: f64,
    evaluation: f64,
}

impl DirectEvaluation {
    pub fn new(x: f64, evaluation: f64) -> Self {
        Self { x, evaluation }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn evaluation(&self) -> f64 {
        self.evaluation
    }
}

/// Value of the derivative of order `derivative_order` at `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeEvaluation {
    x: f64,
    evaluation: f64,
    derivative_order: usize,
}

impl DerivativeEvaluation {
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] when `derivative_order` is zero.
    pub fn new(x: f64, evaluation: f64, derivative_order: usize) -> Result<Self> {
        if derivative_order == 0 {
            return Err(invalid_argument("derivative order must be at least 1"));
        }
        Ok(Self {
            x,
            evaluation,
            derivative_order,
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn evaluation(&self) -> f64 {
        self.evaluation
    }

    pub fn derivative_order(&self) -> usize {
        self.derivative_order
    }
}

/// Value at `x` of the integral of order `integral_order`.
///
/// `constants[j]`, when present, is the constant added by the j-th
/// integration; absent constants are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegralEvaluation {
    x: f64,
    evaluation: f64,
    integral_order: usize,
    constants: Option<Vec<f64>>,
}

impl IntegralEvaluation {
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] when `integral_order` is zero
    /// or `constants` does not hold exactly `integral_order` values.
    pub fn new(
        x: f64,
        evaluation: f64,
        integral_order: usize,
        constants: Option<Vec<f64>>,
    ) -> Result<Self> {
        check_integral_order(integral_order, constants.as_deref())?;
        Ok(Self {
            x,
            evaluation,
            integral_order,
            constants,
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn evaluation(&self) -> f64 {
        self.evaluation
    }

    pub fn integral_order(&self) -> usize {
        self.integral_order
    }

    pub fn constants(&self) -> Option<&[f64]> {
        self.constants.as_deref()
    }
}

/// Integral of order `integral_order` evaluated at `end_x` minus at `start_x`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegralIntervalEvaluation {
    start_x: f64,
    end_x: f64,
    evaluation: f64,
    integral_order: usize,
    constants: Option<Vec<f64>>,
}

impl IntegralIntervalEvaluation {
    /// # Errors
    /// Same as [`IntegralEvaluation::new`].
    pub fn new(
        start_x: f64,
        end_x: f64,
        evaluation: f64,
        integral_order: usize,
        constants: Option<Vec<f64>>,
    ) -> Result<Self> {
        check_integral_order(integral_order, constants.as_deref())?;
        Ok(Self {
            start_x,
            end_x,
            evaluation,
            integral_order,
            constants,
        })
    }

    pub fn start_x(&self) -> f64 {
        self.start_x
    }

    pub fn end_x(&self) -> f64 {
        self.end_x
    }

    pub fn evaluation(&self) -> f64 {
        self.evaluation
    }

    pub fn integral_order(&self) -> usize {
        self.integral_order
    }

    pub fn constants(&self) -> Option<&[f64]> {
        self.constants.as_deref()
    }
}

/// A single observation of a polynomial.
#[derive(Debug, Clone, PartialEq)]
pub enum PolynomialEvaluation {
    Direct(DirectEvaluation),
    Derivative(DerivativeEvaluation),
    Integral(IntegralEvaluation),
    IntegralInterval(IntegralIntervalEvaluation),
}

impl PolynomialEvaluation {
    /// Shorthand for a direct evaluation.
    pub fn direct(x: f64, evaluation: f64) -> Self {
        PolynomialEvaluation::Direct(DirectEvaluation::new(x, evaluation))
    }

    /// Shorthand for a derivative evaluation.
    pub fn derivative(x: f64, evaluation: f64, derivative_order: usize) -> Result<Self> {
        DerivativeEvaluation::new(x, evaluation, derivative_order)
            .map(PolynomialEvaluation::Derivative)
    }

    /// Shorthand for an integral evaluation.
    pub fn integral(
        x: f64,
        evaluation: f64,
        integral_order: usize,
        constants: Option<Vec<f64>>,
    ) -> Result<Self> {
        IntegralEvaluation::new(x, evaluation, integral_order, constants)
            .map(PolynomialEvaluation::Integral)
    }

    /// Shorthand for an interval integral evaluation.
    pub fn integral_interval(
        start_x: f64,
        end_x: f64,
        evaluation: f64,
        integral_order: usize,
        constants: Option<Vec<f64>>,
    ) -> Result<Self> {
        IntegralIntervalEvaluation::new(start_x, end_x, evaluation, integral_order, constants)
            .map(PolynomialEvaluation::IntegralInterval)
    }

    pub fn kind(&self) -> EvaluationKind {
        match self {
            PolynomialEvaluation::Direct(_) => EvaluationKind::Direct,
            PolynomialEvaluation::Derivative(_) => EvaluationKind::Derivative,
            PolynomialEvaluation::Integral(_) => EvaluationKind::Integral,
            PolynomialEvaluation::IntegralInterval(_) => EvaluationKind::IntegralInterval,
        }
    }

    /// Observed value.
    pub fn evaluation(&self) -> f64 {
        match self {
            PolynomialEvaluation::Direct(e) => e.evaluation(),
            PolynomialEvaluation::Derivative(e) => e.evaluation(),
            PolynomialEvaluation::Integral(e) => e.evaluation(),
            PolynomialEvaluation::IntegralInterval(e) => e.evaluation(),
        }
    }

    /// Whether this evaluation pins down the constant term of the polynomial.
    ///
    /// Derivative evaluations never do.
    pub fn is_anchor(&self) -> bool {
        !matches!(self, PolynomialEvaluation::Derivative(_))
    }
}

impl From<DirectEvaluation> for PolynomialEvaluation {
    fn from(value: DirectEvaluation) -> Self {
        PolynomialEvaluation::Direct(value)
    }
}

impl From<DerivativeEvaluation> for PolynomialEvaluation {
    fn from(value: DerivativeEvaluation) -> Self {
        PolynomialEvaluation::Derivative(value)
    }
}

impl From<IntegralEvaluation> for PolynomialEvaluation {
    fn from(value: IntegralEvaluation) -> Self {
        PolynomialEvaluation::Integral(value)
    }
}

impl From<IntegralIntervalEvaluation> for PolynomialEvaluation {
    fn from(value: IntegralIntervalEvaluation) -> Self {
        PolynomialEvaluation::IntegralInterval(value)
    }
}

/// Whether at least one evaluation is an anchor (see
/// [`PolynomialEvaluation::is_anchor`]).
pub fn has_anchor<'a, I>(evaluations: I) -> bool
where
    I: IntoIterator<Item = &'a PolynomialEvaluation>,
{
    evaluations.into_iter().any(PolynomialEvaluation::is_anchor)
}
