//! Consensus scoring policies.
//!
//! A scoring turns the residuals of every evaluation against a candidate into
//! a [`Score`] and the candidate's inlier set. Larger scores are better:
//! inlier counts are used as-is, costs (truncated squared residuals, median
//! residual) are negated.

use std::cmp::Ordering;

use crate::core::Scoring;
use crate::utils::upper_median;

/// Consistency factor of the median absolute deviation for Gaussian noise.
const MEDIAN_SCALE_FACTOR: f64 = 1.4826;

/// Score of a candidate.
///
/// Scores compare by `value` only; ties are not "better".
#[derive(Debug, Clone, Copy)]
pub struct Score {
    pub inlier_count: usize,
    /// Quality to maximize.
    pub value: f64,
    /// Threshold the inliers were selected with.
    pub threshold: f64,
    /// Robust noise scale of the residuals for median-based scorings, the
    /// fixed threshold otherwise.
    pub scale: f64,
}

impl Score {
    pub fn new(inlier_count: usize, value: f64, threshold: f64, scale: f64) -> Self {
        Self {
            inlier_count,
            value,
            threshold,
            scale,
        }
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

/// Collect the indices whose residual passes `is_inlier`.
fn select_inliers<F>(residuals: &[f64], inliers_out: &mut Vec<usize>, is_inlier: F)
where
    F: Fn(f64) -> bool,
{
    inliers_out.clear();
    inliers_out.extend(
        residuals
            .iter()
            .enumerate()
            .filter(|(_, &d)| is_inlier(d))
            .map(|(i, _)| i),
    );
}

/// RANSAC/PROSAC scoring: number of residuals strictly below `threshold`.
#[derive(Debug, Clone)]
pub struct InlierCountScoring {
    threshold: f64,
}

impl InlierCountScoring {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Scoring for InlierCountScoring {
    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(
        &mut self,
        residuals: &[f64],
        _sample_size: usize,
        inliers_out: &mut Vec<usize>,
    ) -> Score {
        let threshold = self.threshold;
        select_inliers(residuals, inliers_out, |d| d < threshold);
        let count = inliers_out.len();
        Score::new(count, count as f64, threshold, threshold)
    }
}

/// MSAC scoring: minus the sum of squared residuals truncated at `threshold`.
#[derive(Debug, Clone)]
pub struct TruncatedQuadraticScoring {
    threshold: f64,
}

impl TruncatedQuadraticScoring {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Scoring for TruncatedQuadraticScoring {
    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(
        &mut self,
        residuals: &[f64],
        _sample_size: usize,
        inliers_out: &mut Vec<usize>,
    ) -> Score {
        let threshold = self.threshold;
        let threshold_sq = threshold * threshold;
        select_inliers(residuals, inliers_out, |d| d < threshold);
        let cost: f64 = residuals.iter().map(|d| (d * d).min(threshold_sq)).sum();
        Score::new(inliers_out.len(), -cost, threshold, threshold)
    }
}

/// LMedS/PROMedS scoring: minus the median residual.
///
/// The inlier threshold adapts to the robust scale
/// `1.4826 (1 + 5 / (n - m)) median` of each candidate and never drops below
/// `stop_threshold`.
#[derive(Debug, Clone)]
pub struct LeastMedianScoring {
    stop_threshold: f64,
    inlier_factor: f64,
    scratch: Vec<f64>,
}

impl LeastMedianScoring {
    pub fn new(stop_threshold: f64, inlier_factor: f64) -> Self {
        Self {
            stop_threshold,
            inlier_factor,
            scratch: Vec::new(),
        }
    }

    /// Robust noise scale given the median residual of `point_number`
    /// residuals fitted from `sample_size` of them.
    pub fn robust_scale(median: f64, point_number: usize, sample_size: usize) -> f64 {
        let dof = point_number.saturating_sub(sample_size).max(1) as f64;
        MEDIAN_SCALE_FACTOR * (1.0 + 5.0 / dof) * median
    }
}

impl Scoring for LeastMedianScoring {
    fn threshold(&self) -> f64 {
        self.stop_threshold
    }

    fn score(
        &mut self,
        residuals: &[f64],
        sample_size: usize,
        inliers_out: &mut Vec<usize>,
    ) -> Score {
        self.scratch.clear();
        self.scratch.extend_from_slice(residuals);
        let Some(median) = upper_median(&mut self.scratch) else {
            inliers_out.clear();
            return Score::new(0, f64::NEG_INFINITY, self.stop_threshold, f64::INFINITY);
        };

        let scale = Self::robust_scale(median, residuals.len(), sample_size);
        let threshold = (self.inlier_factor * scale).max(self.stop_threshold);
        select_inliers(residuals, inliers_out, |d| d <= threshold);
        Score::new(inliers_out.len(), -median, threshold, scale)
    }
}
