//! Error types for polynomial estimation.
//!
//! Every failure surfaced by this crate is a distinct variant of [`Error`] so
//! callers can branch on the kind (retry with a relaxed threshold on
//! [`Error::RobustEstimation`], fix inputs on [`Error::InvalidArgument`] or
//! [`Error::NotReady`], and so on).

/// Numeric cause of a failed linear estimation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NumericalError {
    /// The design matrix does not have full column rank.
    ///
    /// Usually the evaluations share the same `x`, or only derivative
    /// evaluations were supplied for the rows that were used.
    #[error("linear system is singular: rank {rank} for {unknowns} unknowns")]
    SingularSystem {
        /// Numerical rank of the design matrix.
        rank: usize,
        /// Number of polynomial coefficients being solved for.
        unknowns: usize,
    },

    /// The decomposition could not produce a solution.
    #[error("failed to solve linear system: {0}")]
    Solver(&'static str),
}

/// Errors that can occur while configuring or running an estimator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A mutating call or `estimate()` was issued while an estimation is in
    /// progress on the same instance.
    #[error("estimator is locked while an estimation is in progress")]
    Locked,

    /// The estimator is missing data required to start an estimation.
    #[error("estimator is not ready: {0}")]
    NotReady(&'static str),

    /// A parameter is outside of its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The linear polynomial estimation failed.
    #[error("polynomial estimation failed")]
    Estimation(#[source] NumericalError),

    /// The consensus loop never produced a valid candidate.
    #[error("robust estimation failed: no consensus reached after {iterations} iterations")]
    RobustEstimation {
        /// Number of iterations executed before giving up.
        iterations: usize,
    },
}

impl From<NumericalError> for Error {
    fn from(value: NumericalError) -> Self {
        Error::Estimation(value)
    }
}

/// Result type for polynomial estimation.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn invalid_argument(message: impl Into<String>) -> Error {
    Error::InvalidArgument(message.into())
}
