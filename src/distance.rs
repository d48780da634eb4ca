//! Residuals between a candidate polynomial and an evaluation.

use crate::evaluation::{DirectEvaluation, PolynomialEvaluation};
use crate::polynomial::{integration_constants_contribution, Polynomial};

/// How the residual of an evaluation is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Absolute difference between observed and predicted values.
    #[default]
    Algebraic,
    /// Euclidean distance from the sample to the tangent line of the
    /// candidate at `x`. Only direct evaluations have a geometric distance;
    /// every other kind falls back to [`DistanceMetric::Algebraic`].
    Geometric,
}

impl DistanceMetric {
    pub fn from_geometric_flag(use_geometric_distance: bool) -> Self {
        if use_geometric_distance {
            DistanceMetric::Geometric
        } else {
            DistanceMetric::Algebraic
        }
    }

    /// Non-negative residual of `evaluation` against `polynomial`.
    pub fn distance(&self, evaluation: &PolynomialEvaluation, polynomial: &Polynomial) -> f64 {
        match (self, evaluation) {
            (DistanceMetric::Geometric, PolynomialEvaluation::Direct(direct)) => {
                geometric_distance(direct, polynomial)
            }
            _ => algebraic_distance(evaluation, polynomial),
        }
    }
}

/// Value the polynomial predicts for the quantity an evaluation observed.
pub fn predicted_value(evaluation: &PolynomialEvaluation, polynomial: &Polynomial) -> f64 {
    match evaluation {
        PolynomialEvaluation::Direct(e) => polynomial.evaluate(e.x()),
        PolynomialEvaluation::Derivative(e) => {
            polynomial.evaluate_nth_derivative(e.x(), e.derivative_order())
        }
        PolynomialEvaluation::Integral(e) => {
            polynomial.evaluate_nth_integral(e.x(), e.integral_order(), e.constants())
        }
        PolynomialEvaluation::IntegralInterval(e) => {
            let order = e.integral_order();
            let (start, end) = (e.start_x(), e.end_x());
            let terms = polynomial.evaluate_nth_integral(end, order, None)
                - polynomial.evaluate_nth_integral(start, order, None);
            terms
                + integration_constants_contribution(e.constants(), order, |p| {
                    end.powi(p as i32) - start.powi(p as i32)
                })
        }
    }
}

pub fn algebraic_distance(evaluation: &PolynomialEvaluation, polynomial: &Polynomial) -> f64 {
    (evaluation.evaluation() - predicted_value(evaluation, polynomial)).abs()
}

/// Distance from `(x, y)` to the tangent line `a x' + b y' + c = 0` of the
/// polynomial at `x`.
pub fn geometric_distance(evaluation: &DirectEvaluation, polynomial: &Polynomial) -> f64 {
    let x = evaluation.x();
    let y = evaluation.evaluation();
    let slope = polynomial.evaluate_derivative(x);
    let y_on_curve = polynomial.evaluate(x);

    // Tangent: slope * x' - y' + (y_on_curve - slope * x) = 0. Steep tangents
    // are divided through by the slope to keep the coefficients bounded.
    let (a, b, c) = if slope.abs() > 1.0 {
        (1.0, -1.0 / slope, y_on_curve / slope - x)
    } else {
        (slope, -1.0, y_on_curve - slope * x)
    };

    (a * x + b * y + c).abs() / (a * a + b * b).sqrt()
}
