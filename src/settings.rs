//! Configuration types for the robust polynomial estimators.
//!
//! [`RobustSettings`] gathers every tunable of the consensus loop with the
//! same defaults for all methods; each method only reads the fields it uses
//! (`threshold` for RANSAC/MSAC/PROSAC, `stop_threshold` and `inlier_factor`
//! for LMedS/PROMedS, the `prosac_*` fields for PROSAC).

use crate::error::{invalid_argument, Result};

/// Robust estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RobustEstimatorMethod {
    /// Maximize the number of inliers under a fixed threshold.
    Ransac,
    /// Minimize the median residual.
    Lmeds,
    /// Minimize the sum of residuals truncated at a fixed threshold.
    Msac,
    /// RANSAC with sampling guided by quality scores.
    Prosac,
    /// LMedS with sampling guided by quality scores.
    #[default]
    Promeds,
}

impl RobustEstimatorMethod {
    /// Whether the method needs one quality score per evaluation.
    pub fn requires_quality_scores(&self) -> bool {
        matches!(
            self,
            RobustEstimatorMethod::Prosac | RobustEstimatorMethod::Promeds
        )
    }

    /// Whether the method uses a median-based threshold instead of a fixed one.
    pub fn is_median_based(&self) -> bool {
        matches!(
            self,
            RobustEstimatorMethod::Lmeds | RobustEstimatorMethod::Promeds
        )
    }
}

/// Main configuration object for the robust estimators.
#[derive(Debug, Clone, PartialEq)]
pub struct RobustSettings {
    /// Probability in \[0, 1\] that the best minimal subset is outlier free.
    pub confidence: f64,
    /// Hard bound on the number of iterations.
    pub max_iterations: usize,
    /// Minimum progress increase, in \[0, 1\], between two progress events.
    pub progress_delta: f32,
    /// Fixed inlier threshold used by RANSAC, MSAC and PROSAC.
    pub threshold: f64,
    /// LMedS/PROMedS stop early once the robust scale falls below this value.
    pub stop_threshold: f64,
    /// LMedS/PROMedS inlier threshold as a multiple of the robust scale.
    pub inlier_factor: f64,
    /// Measure direct evaluations against the tangent line of the candidate.
    pub use_geometric_distance: bool,
    /// Refit the final polynomial over all inliers of the best candidate.
    pub refine_result: bool,
    /// Probability that a wrong model supports an unrelated evaluation.
    pub prosac_beta: f64,
    /// Maximum probability that a PROSAC solution is supported by chance.
    pub prosac_non_randomness: f64,
}

pub const DEFAULT_CONFIDENCE: f64 = 0.99;
pub const DEFAULT_MAX_ITERATIONS: usize = 5000;
pub const DEFAULT_PROGRESS_DELTA: f32 = 0.05;
pub const DEFAULT_THRESHOLD: f64 = 1e-6;
pub const DEFAULT_STOP_THRESHOLD: f64 = 1e-6;
pub const DEFAULT_INLIER_FACTOR: f64 = 1.5;
pub const DEFAULT_PROSAC_BETA: f64 = 0.01;
pub const DEFAULT_PROSAC_NON_RANDOMNESS: f64 = 0.05;

impl Default for RobustSettings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            progress_delta: DEFAULT_PROGRESS_DELTA,
            threshold: DEFAULT_THRESHOLD,
            stop_threshold: DEFAULT_STOP_THRESHOLD,
            inlier_factor: DEFAULT_INLIER_FACTOR,
            use_geometric_distance: false,
            refine_result: true,
            prosac_beta: DEFAULT_PROSAC_BETA,
            prosac_non_randomness: DEFAULT_PROSAC_NON_RANDOMNESS,
        }
    }
}

impl RobustSettings {
    /// Check every field against its domain.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidArgument`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        check_confidence(self.confidence)?;
        check_max_iterations(self.max_iterations)?;
        check_progress_delta(self.progress_delta)?;
        check_positive("threshold", self.threshold)?;
        check_positive("stop threshold", self.stop_threshold)?;
        check_positive("inlier factor", self.inlier_factor)?;
        check_open_probability("PROSAC beta", self.prosac_beta)?;
        check_open_probability("PROSAC non-randomness", self.prosac_non_randomness)?;
        Ok(())
    }
}

pub(crate) fn check_confidence(confidence: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(invalid_argument(format!(
            "confidence must be in [0, 1], got {confidence}"
        )));
    }
    Ok(())
}

pub(crate) fn check_max_iterations(max_iterations: usize) -> Result<()> {
    if max_iterations == 0 {
        return Err(invalid_argument("max iterations must be at least 1"));
    }
    Ok(())
}

pub(crate) fn check_progress_delta(progress_delta: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&progress_delta) {
        return Err(invalid_argument(format!(
            "progress delta must be in [0, 1], got {progress_delta}"
        )));
    }
    Ok(())
}

pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_nan() || value <= 0.0 {
        return Err(invalid_argument(format!(
            "{name} must be greater than 0, got {value}"
        )));
    }
    Ok(())
}

fn check_open_probability(name: &str, value: f64) -> Result<()> {
    if value.is_nan() || value <= 0.0 || value >= 1.0 {
        return Err(invalid_argument(format!(
            "{name} must be in (0, 1), got {value}"
        )));
    }
    Ok(())
}
