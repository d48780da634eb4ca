//! # Polyconsensus - Robust Polynomial Estimation
//!
//! `polyconsensus` fits polynomials to observations that may contain
//! outliers. Observations are [`PolynomialEvaluation`]s: values of the
//! polynomial, of one of its derivatives, of one of its integrals at a point,
//! or of an integral over an interval.
//!
//! ## Quick Start
//!
//! The easiest way to use `polyconsensus` is through the high-level API:
//!
//! ```rust
//! use polyconsensus::{estimate_polynomial, PolynomialEvaluation, RobustEstimatorMethod};
//!
//! // Samples of 1 + x + x^2 and one gross outlier.
//! let mut evaluations: Vec<_> = (0..7)
//!     .map(|i| {
//!         let x = i as f64;
//!         PolynomialEvaluation::direct(x, 1.0 + x + x * x)
//!     })
//!     .collect();
//! evaluations.push(PolynomialEvaluation::direct(3.0, 100.0));
//!
//! let result =
//!     estimate_polynomial(RobustEstimatorMethod::Ransac, 2, evaluations, None, None, Some(7))
//!         .unwrap();
//! println!("Found {} inliers", result.inliers.len());
//! assert!(!result.inliers.contains(&7));
//! ```
//!
//! ## Methods
//!
//! [`RobustEstimatorMethod`] selects the variant:
//!
//! - **RANSAC**: maximize the number of residuals below a fixed threshold
//! - **MSAC**: minimize the sum of squared residuals truncated at the threshold
//! - **LMedS**: minimize the median residual, no threshold needed
//! - **PROSAC** / **PROMedS**: RANSAC / LMedS drawing subsets from the
//!   evaluations with the best quality scores first
//!
//! ## Extending the Library
//!
//! The consensus loop in [`core`] is generic over the
//! [`Estimator`](core::Estimator), [`Sampler`](core::Sampler),
//! [`Scoring`](core::Scoring), [`TerminationCriterion`](core::TerminationCriterion)
//! and [`LocalOptimizer`](core::LocalOptimizer) traits.
//!
//! ```rust
//! use polyconsensus::core::Sampler;
//!
//! /// Always draws the first evaluations.
//! struct FirstSampler;
//!
//! impl Sampler for FirstSampler {
//!     fn sample(&mut self, point_number: usize, sample_size: usize, out: &mut [usize]) -> bool {
//!         if sample_size > point_number {
//!             return false;
//!         }
//!         for (i, slot) in out.iter_mut().take(sample_size).enumerate() {
//!             *slot = i;
//!         }
//!         true
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - **[`api`]**: High-level functions for one-call estimation
//! - **[`robust`]**: The configurable robust estimator with listeners
//! - **[`estimators`]**: Linear and weighted least-squares estimators
//! - **[`core`]**: Core traits and the consensus engine
//! - **[`samplers`]**, **[`scoring`]**, **[`termination`]**: Built-in components
//! - **[`polynomial`]**: Polynomial arithmetic, calculus and roots
//! - **[`evaluation`]**, **[`distance`]**: Observations and their residuals
//! - **[`settings`]**: Configuration types

pub mod api;
pub mod choices;
pub mod core;
pub mod distance;
pub mod error;
pub mod estimators;
pub mod evaluation;
pub mod listener;
pub mod polynomial;
pub mod robust;
pub mod samplers;
pub mod scoring;
pub mod settings;
pub mod termination;
pub mod types;
pub mod utils;

// Re-export high-level API
pub use api::{estimate_polynomial, fit_polynomial, EstimationResult};

// Re-export core traits for easy access
pub use core::{Estimator, LocalOptimizer, Sampler, Scoring, TerminationCriterion};

pub use distance::DistanceMetric;
pub use error::{Error, NumericalError, Result};
pub use estimators::{
    create_polynomial_estimator, LinearPolynomialEstimator, PolynomialEstimator,
    PolynomialEstimatorType, WeightedPolynomialEstimator,
};
pub use evaluation::{
    DerivativeEvaluation, DirectEvaluation, EvaluationKind, IntegralEvaluation,
    IntegralIntervalEvaluation, PolynomialEvaluation,
};
pub use listener::{EstimationEvent, EstimatorListener, FnListener};
pub use polynomial::Polynomial;
pub use robust::{InliersData, RobustPolynomialEstimator};
pub use scoring::Score;

// Re-export settings for convenience
pub use settings::{RobustEstimatorMethod, RobustSettings};
