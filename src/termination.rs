//! Termination criteria shrinking the iteration bound of the consensus loop.

use tracing::trace;

use crate::core::TerminationCriterion;
use crate::scoring::Score;

/// Iterations needed to draw at least one outlier-free minimal subset with
/// probability `confidence`, given the current inlier ratio.
///
/// `N = ceil(log(1 - confidence) / log(1 - inlier_ratio^sample_size))`,
/// clamped to `[1, max_iterations]`.
pub fn required_iterations(
    confidence: f64,
    inlier_ratio: f64,
    sample_size: usize,
    max_iterations: usize,
) -> usize {
    let max_iterations = max_iterations.max(1);
    if confidence <= 0.0 {
        return 1;
    }

    let p_good_sample = inlier_ratio.clamp(0.0, 1.0).powi(sample_size as i32);
    if p_good_sample <= 0.0 || confidence >= 1.0 {
        return max_iterations;
    }
    if p_good_sample >= 1.0 {
        return 1;
    }

    let required = (1.0 - confidence).ln() / (1.0 - p_good_sample).ln();
    if !required.is_finite() || required >= max_iterations as f64 {
        return max_iterations;
    }
    (required.ceil() as usize).clamp(1, max_iterations)
}

/// RANSAC-style criterion updating the bound from the best inlier ratio.
#[derive(Debug, Clone)]
pub struct RansacTerminationCriterion {
    /// Desired confidence in \[0, 1\].
    pub confidence: f64,
}

impl TerminationCriterion for RansacTerminationCriterion {
    fn check(
        &mut self,
        best_score: &Score,
        _best_inliers: &[usize],
        point_number: usize,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        if point_number == 0 {
            return false;
        }
        let inlier_ratio = best_score.inlier_count as f64 / point_number as f64;
        let required =
            required_iterations(self.confidence, inlier_ratio, sample_size, *max_iterations);
        *max_iterations = (*max_iterations).min(required);
        false
    }
}

/// LMedS criterion: a confidence bound plus an immediate stop once the
/// robust scale of the best candidate falls below `stop_threshold`.
///
/// The scale-based inlier set of a contaminated candidate can cover every
/// evaluation, so the bound only credits the candidate with the residuals up
/// to its median, `n / 2 + 1` of them at most. This is the 50% breakdown
/// point of the median.
#[derive(Debug, Clone)]
pub struct LeastMedianTerminationCriterion {
    pub confidence: f64,
    pub stop_threshold: f64,
}

impl TerminationCriterion for LeastMedianTerminationCriterion {
    fn check(
        &mut self,
        best_score: &Score,
        _best_inliers: &[usize],
        point_number: usize,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        if point_number > 0 {
            let support = best_score.inlier_count.min(point_number / 2 + 1);
            let inlier_ratio = support as f64 / point_number as f64;
            let required =
                required_iterations(self.confidence, inlier_ratio, sample_size, *max_iterations);
            *max_iterations = (*max_iterations).min(required);
        }
        best_score.scale < self.stop_threshold
    }
}

/// PROSAC criterion (Chum & Matas): non-randomness and maximality.
///
/// For every prefix of `n > m` best-ranked evaluations whose inlier count
/// `I_n` exceeds the non-random minimum `I_min(n)`, the bound
/// `log(1 - confidence) / log(1 - (I_n / n)^m)` is considered; the smallest
/// one (and the plain RANSAC bound) wins.
#[derive(Debug, Clone)]
pub struct ProsacTerminationCriterion {
    confidence: f64,
    beta: f64,
    non_randomness: f64,
    /// Position of every evaluation in the quality order.
    ranks: Vec<usize>,
    /// `min_inliers[n]` for prefix size `n`, built on first use.
    min_inliers: Vec<usize>,
    sample_size: usize,
    in_prefix: Vec<usize>,
}

impl ProsacTerminationCriterion {
    /// `order[k]` is the index of the evaluation ranked `k` (best first).
    pub fn new(confidence: f64, beta: f64, non_randomness: f64, order: &[usize]) -> Self {
        let mut ranks = vec![0; order.len()];
        for (rank, &index) in order.iter().enumerate() {
            ranks[index] = rank;
        }
        Self {
            confidence,
            beta,
            non_randomness,
            ranks,
            min_inliers: Vec::new(),
            sample_size: 0,
            in_prefix: Vec::new(),
        }
    }

    /// Non-random minimum inlier count for every prefix size.
    fn initialize(&mut self, sample_size: usize) {
        self.sample_size = sample_size;
        self.min_inliers =
            non_random_min_inliers(self.ranks.len(), sample_size, self.beta, self.non_randomness);
    }
}

/// `I_min(n)` for every prefix size `n` in `0..=point_number`: the smallest
/// inlier count such that seeing it among the first `n` evaluations (with
/// `m` of them in the sample) happens by chance with probability below
/// `psi`, when each unrelated evaluation supports a wrong model with
/// probability `beta`.
///
/// The count is non-decreasing in `n`, so the search for each prefix
/// resumes from the previous one.
fn non_random_min_inliers(point_number: usize, m: usize, beta: f64, psi: f64) -> Vec<usize> {
    let mut ln_factorials = Vec::with_capacity(point_number + 1);
    ln_factorials.push(0.0);
    for i in 1..=point_number {
        let previous = ln_factorials[i - 1];
        ln_factorials.push(previous + (i as f64).ln());
    }

    let mut min_inliers: Vec<usize> = (0..=point_number.min(m)).collect();
    let mut extra = 0;
    for n in (m + 1)..=point_number {
        let trials = n - m;
        while extra <= trials && binomial_tail(&ln_factorials, trials, extra, beta) >= psi {
            extra += 1;
        }
        min_inliers.push((extra + m).min(n));
    }
    min_inliers
}

/// `P(X >= k)` for `X ~ Binomial(trials, beta)`, summed in log-space from
/// `k` upwards until the terms past the mode stop contributing.
fn binomial_tail(ln_factorials: &[f64], trials: usize, k: usize, beta: f64) -> f64 {
    if k > trials {
        return 0.0;
    }
    let ln_beta = beta.ln();
    let ln_not_beta = (1.0 - beta).ln();
    let mode = ((trials + 1) as f64 * beta).floor() as usize;

    let mut tail = 0.0;
    for j in k..=trials {
        let mut ln_pmf = ln_factorials[trials] - ln_factorials[j] - ln_factorials[trials - j];
        if j > 0 {
            ln_pmf += j as f64 * ln_beta;
        }
        if j < trials {
            ln_pmf += (trials - j) as f64 * ln_not_beta;
        }
        let term = ln_pmf.exp();
        tail += term;
        if j > mode && term <= tail * f64::EPSILON {
            break;
        }
    }
    tail
}

impl TerminationCriterion for ProsacTerminationCriterion {
    fn check(
        &mut self,
        best_score: &Score,
        best_inliers: &[usize],
        point_number: usize,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        let mut ransac = RansacTerminationCriterion {
            confidence: self.confidence,
        };
        ransac.check(best_score, best_inliers, point_number, sample_size, max_iterations);

        if point_number != self.ranks.len() {
            return false;
        }
        if self.sample_size != sample_size || self.min_inliers.is_empty() {
            self.initialize(sample_size);
        }

        // in_prefix[r] = 1 when the evaluation ranked r is an inlier.
        self.in_prefix.clear();
        self.in_prefix.resize(point_number, 0);
        for &index in best_inliers {
            self.in_prefix[self.ranks[index]] = 1;
        }

        let mut inliers_in_prefix = 0;
        let mut best_bound = *max_iterations;
        for n in 1..=point_number {
            inliers_in_prefix += self.in_prefix[n - 1];
            // The sample always supports its own interpolant.
            if n <= sample_size || inliers_in_prefix <= self.min_inliers[n] {
                continue;
            }
            let ratio = inliers_in_prefix as f64 / n as f64;
            let k_n = required_iterations(self.confidence, ratio, sample_size, *max_iterations);
            if k_n < best_bound {
                trace!(prefix = n, inliers = inliers_in_prefix, bound = k_n, "PROSAC prefix bound");
                best_bound = k_n;
            }
        }
        *max_iterations = best_bound;
        false
    }
}
