//! Polynomial value type.
//!
//! A [`Polynomial`] stores its coefficients in ascending order of power, so
//! `[a0, a1, a2]` represents `a0 + a1 x + a2 x^2`. Besides evaluation this
//! module provides the calculus the estimators rely on (nth derivatives, nth
//! integrals with integration constants, interval integrals), polynomial
//! arithmetic and root finding through the eigenvalues of the companion
//! matrix.

use std::ops::{Add, Mul, Neg, Sub};

use nalgebra::{Complex, DMatrix};

use crate::error::{invalid_argument, Result};
use crate::utils::{ascending_factorial, factorial, falling_factorial};

/// Coefficients with a magnitude at or below this value are treated as zero
/// when computing the degree, trimming or finding roots.
pub const EPSILON: f64 = 1e-10;

/// Imaginary parts at or below this magnitude make a root real.
const REAL_ROOT_TOLERANCE: f64 = 1e-8;

/// A polynomial in the monomial basis.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Default for Polynomial {
    fn default() -> Self {
        Self {
            coefficients: vec![0.0],
        }
    }
}

impl Polynomial {
    /// Creates a polynomial from coefficients in ascending order of power.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] when `coefficients` is empty.
    pub fn new(coefficients: Vec<f64>) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(invalid_argument(
                "a polynomial needs at least one coefficient",
            ));
        }
        Ok(Self { coefficients })
    }

    /// Creates the zero polynomial with `len` coefficients.
    ///
    /// A length of zero is bumped to one.
    pub fn zeros(len: usize) -> Self {
        Self {
            coefficients: vec![0.0; len.max(1)],
        }
    }

    pub(crate) fn from_coefficients_unchecked(coefficients: Vec<f64>) -> Self {
        debug_assert!(!coefficients.is_empty());
        Self { coefficients }
    }

    /// Coefficients in ascending order of power.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Consumes the polynomial and returns its coefficients.
    pub fn into_coefficients(self) -> Vec<f64> {
        self.coefficients
    }

    /// Replaces the coefficients.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] when `coefficients` is empty.
    pub fn set_coefficients(&mut self, coefficients: Vec<f64>) -> Result<()> {
        *self = Self::new(coefficients)?;
        Ok(())
    }

    /// Index of the highest coefficient whose magnitude exceeds [`EPSILON`].
    ///
    /// The zero polynomial has degree 0.
    pub fn degree(&self) -> usize {
        self.coefficients
            .iter()
            .rposition(|c| c.abs() > EPSILON)
            .unwrap_or(0)
    }

    /// Evaluates the polynomial at `x` using Horner's scheme.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    /// First derivative as a new polynomial.
    pub fn derivative(&self) -> Polynomial {
        self.nth_derivative(1)
    }

    /// Derivative of the given order as a new polynomial.
    ///
    /// Differentiating past the degree yields the zero polynomial; order zero
    /// returns a copy.
    pub fn nth_derivative(&self, order: usize) -> Polynomial {
        if order >= self.coefficients.len() {
            return Polynomial::zeros(1);
        }
        let coefficients = self.coefficients[order..]
            .iter()
            .enumerate()
            .map(|(j, &c)| c * falling_factorial(j + order, order))
            .collect();
        Polynomial { coefficients }
    }

    /// Value of the first derivative at `x`.
    pub fn evaluate_derivative(&self, x: f64) -> f64 {
        self.evaluate_nth_derivative(x, 1)
    }

    /// Value of the second derivative at `x`.
    pub fn evaluate_second_derivative(&self, x: f64) -> f64 {
        self.evaluate_nth_derivative(x, 2)
    }

    /// Value of the derivative of the given order at `x`.
    pub fn evaluate_nth_derivative(&self, x: f64, order: usize) -> f64 {
        if order >= self.coefficients.len() {
            return 0.0;
        }
        self.coefficients[order..]
            .iter()
            .enumerate()
            .rev()
            .fold(0.0, |acc, (j, &c)| {
                acc * x + c * falling_factorial(j + order, order)
            })
    }

    /// Indefinite integral with the given integration constant.
    pub fn integration(&self, constant: f64) -> Polynomial {
        let mut coefficients = Vec::with_capacity(self.coefficients.len() + 1);
        coefficients.push(constant);
        coefficients.extend(
            self.coefficients
                .iter()
                .enumerate()
                .map(|(i, &c)| c / (i + 1) as f64),
        );
        Polynomial { coefficients }
    }

    /// Integrates `order` times.
    ///
    /// `constants[j]`, when provided, is the constant added by the j-th
    /// integration; missing constants are zero.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] when `order` is zero or the
    /// number of constants differs from `order`.
    pub fn nth_integration(&self, order: usize, constants: Option<&[f64]>) -> Result<Polynomial> {
        check_integral_order(order, constants)?;
        let mut result = self.clone();
        for step in 0..order {
            let constant = constants.map_or(0.0, |c| c[step]);
            result = result.integration(constant);
        }
        Ok(result)
    }

    /// Definite integral over `[start, end]`.
    pub fn integrate_interval(&self, start: f64, end: f64) -> f64 {
        let primitive = self.integration(0.0);
        primitive.evaluate(end) - primitive.evaluate(start)
    }

    /// Evaluates the nth integral (with constants) at `end` minus at `start`.
    ///
    /// # Errors
    /// Same as [`Polynomial::nth_integration`].
    pub fn nth_order_integrate_interval(
        &self,
        start: f64,
        end: f64,
        order: usize,
        constants: Option<&[f64]>,
    ) -> Result<f64> {
        let primitive = self.nth_integration(order, constants)?;
        Ok(primitive.evaluate(end) - primitive.evaluate(start))
    }

    /// Value at `x` of the nth integral, computed without building it.
    pub(crate) fn evaluate_nth_integral(
        &self,
        x: f64,
        order: usize,
        constants: Option<&[f64]>,
    ) -> f64 {
        let terms: f64 = self
            .coefficients
            .iter()
            .enumerate()
            .map(|(i, &c)| c * x.powi((i + order) as i32) / ascending_factorial(i + 1, order))
            .sum();
        terms + integration_constants_contribution(constants, order, |p| x.powi(p as i32))
    }

    /// Multiplies every coefficient by `factor`.
    pub fn scale(&self, factor: f64) -> Polynomial {
        Polynomial {
            coefficients: self.coefficients.iter().map(|c| c * factor).collect(),
        }
    }

    /// Divides the coefficients by their Euclidean norm.
    ///
    /// The zero polynomial is returned unchanged.
    pub fn normalize(&self) -> Polynomial {
        let norm = self.coefficients.iter().map(|c| c * c).sum::<f64>().sqrt();
        if norm <= EPSILON {
            return self.clone();
        }
        self.scale(1.0 / norm)
    }

    /// Divides the coefficients by the highest-degree non-zero coefficient.
    pub fn normalize_highest_degree_term(&self) -> Polynomial {
        let leading = self.coefficients[self.degree()];
        if leading.abs() <= EPSILON {
            return self.clone();
        }
        self.scale(1.0 / leading)
    }

    /// Drops trailing coefficients that are numerically zero.
    pub fn trim(&self) -> Polynomial {
        Polynomial {
            coefficients: self.coefficients[..=self.degree()].to_vec(),
        }
    }

    /// All complex roots, as eigenvalues of the companion matrix.
    ///
    /// Constant polynomials have no roots.
    pub fn roots(&self) -> Vec<Complex<f64>> {
        let n = self.degree();
        if n == 0 {
            return Vec::new();
        }

        let leading = self.coefficients[n];
        let mut companion = DMatrix::<f64>::zeros(n, n);
        for i in 1..n {
            companion[(i, i - 1)] = 1.0;
        }
        for i in 0..n {
            companion[(i, n - 1)] = -self.coefficients[i] / leading;
        }

        companion.complex_eigenvalues().iter().copied().collect()
    }

    /// Real roots sorted in ascending order.
    pub fn real_roots(&self) -> Vec<f64> {
        let mut roots: Vec<f64> = self
            .roots()
            .into_iter()
            .filter(|z| z.im.abs() <= REAL_ROOT_TOLERANCE)
            .map(|z| z.re)
            .collect();
        roots.sort_by(f64::total_cmp);
        roots
    }

    /// Locations of the local extrema (real roots of the derivative).
    pub fn extrema(&self) -> Vec<f64> {
        self.derivative().real_roots()
    }

    /// Locations of the local minima.
    pub fn minima(&self) -> Vec<f64> {
        self.extrema()
            .into_iter()
            .filter(|&x| self.evaluate_second_derivative(x) > 0.0)
            .collect()
    }

    /// Locations of the local maxima.
    pub fn maxima(&self) -> Vec<f64> {
        self.extrema()
            .into_iter()
            .filter(|&x| self.evaluate_second_derivative(x) < 0.0)
            .collect()
    }
}

pub(crate) fn check_integral_order(order: usize, constants: Option<&[f64]>) -> Result<()> {
    if order == 0 {
        return Err(invalid_argument("integral order must be at least 1"));
    }
    if let Some(constants) = constants {
        if constants.len() != order {
            return Err(invalid_argument(format!(
                "expected {order} integration constants, got {}",
                constants.len()
            )));
        }
    }
    Ok(())
}

/// Sum of `constants[j] * power(p) / p!` with `p = order - 1 - j`.
///
/// `power` is `x^p` for a point integral and `end^p - start^p` for an interval.
pub(crate) fn integration_constants_contribution<F>(
    constants: Option<&[f64]>,
    order: usize,
    power: F,
) -> f64
where
    F: Fn(usize) -> f64,
{
    let Some(constants) = constants else {
        return 0.0;
    };
    constants
        .iter()
        .enumerate()
        .map(|(j, &c)| {
            let p = order - 1 - j;
            c * power(p) / factorial(p)
        })
        .sum()
}

impl Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let len = self.coefficients.len().max(rhs.coefficients.len());
        let coefficients = (0..len)
            .map(|i| {
                self.coefficients.get(i).copied().unwrap_or(0.0)
                    + rhs.coefficients.get(i).copied().unwrap_or(0.0)
            })
            .collect();
        Polynomial { coefficients }
    }
}

impl Sub for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        self + &(-rhs)
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        let mut coefficients = vec![0.0; self.coefficients.len() + rhs.coefficients.len() - 1];
        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in rhs.coefficients.iter().enumerate() {
                coefficients[i + j] += a * b;
            }
        }
        Polynomial { coefficients }
    }
}

impl Mul<f64> for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: f64) -> Polynomial {
        self.scale(rhs)
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        self.scale(-1.0)
    }
}

impl Add for Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: Polynomial) -> Polynomial {
        &self + &rhs
    }
}

impl Sub for Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: Polynomial) -> Polynomial {
        &self - &rhs
    }
}

impl Mul for Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: Polynomial) -> Polynomial {
        &self * &rhs
    }
}

impl Mul<f64> for Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: f64) -> Polynomial {
        self.scale(rhs)
    }
}

impl Neg for Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        -&self
    }
}
