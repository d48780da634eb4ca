//! Core shared types.
//!
//! Simple `nalgebra` aliases for the dense linear systems assembled by the
//! polynomial estimators.

use nalgebra::{DMatrix, DVector};

/// Dynamic matrix of `f64` holding one design row per evaluation.
pub type DataMatrix = DMatrix<f64>;

/// Dynamic column vector of `f64` (right-hand sides and solutions).
pub type DataVector = DVector<f64>;
