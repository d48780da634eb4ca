//! Lightweight runtime wrappers exposing the built-in components via enums
//! while the core [`ConsensusEngine`](crate::core::ConsensusEngine) stays
//! fully generic. Each [`RobustEstimatorMethod`] maps to one combination.

use crate::core::{Sampler, Scoring, TerminationCriterion};
use crate::samplers::{quality_order, ProsacSampler, UniformRandomSampler};
use crate::scoring::{InlierCountScoring, LeastMedianScoring, Score, TruncatedQuadraticScoring};
use crate::settings::{RobustEstimatorMethod, RobustSettings};
use crate::termination::{
    required_iterations, LeastMedianTerminationCriterion, ProsacTerminationCriterion,
    RansacTerminationCriterion,
};

/// Runtime sampler selection.
pub enum SamplerChoice {
    Uniform(UniformRandomSampler),
    Prosac(ProsacSampler),
}

impl Sampler for SamplerChoice {
    fn sample(
        &mut self,
        point_number: usize,
        sample_size: usize,
        out_indices: &mut [usize],
    ) -> bool {
        match self {
            SamplerChoice::Uniform(s) => s.sample(point_number, sample_size, out_indices),
            SamplerChoice::Prosac(s) => s.sample(point_number, sample_size, out_indices),
        }
    }
}

/// Runtime scoring selection.
pub enum ScoringChoice {
    InlierCount(InlierCountScoring),
    TruncatedQuadratic(TruncatedQuadraticScoring),
    LeastMedian(LeastMedianScoring),
}

impl Scoring for ScoringChoice {
    fn threshold(&self) -> f64 {
        match self {
            ScoringChoice::InlierCount(s) => s.threshold(),
            ScoringChoice::TruncatedQuadratic(s) => s.threshold(),
            ScoringChoice::LeastMedian(s) => s.threshold(),
        }
    }

    fn score(
        &mut self,
        residuals: &[f64],
        sample_size: usize,
        inliers_out: &mut Vec<usize>,
    ) -> Score {
        match self {
            ScoringChoice::InlierCount(s) => s.score(residuals, sample_size, inliers_out),
            ScoringChoice::TruncatedQuadratic(s) => s.score(residuals, sample_size, inliers_out),
            ScoringChoice::LeastMedian(s) => s.score(residuals, sample_size, inliers_out),
        }
    }
}

/// Runtime termination selection.
pub enum TerminationChoice {
    Ransac(RansacTerminationCriterion),
    LeastMedian(LeastMedianTerminationCriterion),
    Prosac(ProsacTerminationCriterion),
}

impl TerminationCriterion for TerminationChoice {
    fn check(
        &mut self,
        best_score: &Score,
        best_inliers: &[usize],
        point_number: usize,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool {
        match self {
            TerminationChoice::Ransac(term) => {
                term.check(best_score, best_inliers, point_number, sample_size, max_iterations)
            }
            TerminationChoice::LeastMedian(term) => {
                term.check(best_score, best_inliers, point_number, sample_size, max_iterations)
            }
            TerminationChoice::Prosac(term) => {
                term.check(best_score, best_inliers, point_number, sample_size, max_iterations)
            }
        }
    }
}

/// Components of one robust method.
pub struct MethodComponents {
    pub sampler: SamplerChoice,
    pub scoring: ScoringChoice,
    pub termination: TerminationChoice,
}

/// Build the sampler, scoring and termination of `method`.
///
/// `quality_scores` is only read by PROSAC and PROMedS, which fall back to
/// the given order of the evaluations when it is `None`.
///
/// The PROSAC growth schedule of PROMedS spans the iterations the least-median
/// bound allows at 50% contamination rather than `max_iterations`, otherwise
/// the loop ends before the schedule leaves the top-ranked evaluations.
pub fn method_components(
    method: RobustEstimatorMethod,
    settings: &RobustSettings,
    quality_scores: Option<&[f64]>,
    point_number: usize,
    sample_size: usize,
    seed: Option<u64>,
) -> MethodComponents {
    let order = || match quality_scores {
        Some(scores) => quality_order(scores),
        None => (0..point_number).collect(),
    };
    let uniform = || SamplerChoice::Uniform(UniformRandomSampler::from_optional_seed(seed));
    let least_median = || {
        (
            ScoringChoice::LeastMedian(LeastMedianScoring::new(
                settings.stop_threshold,
                settings.inlier_factor,
            )),
            TerminationChoice::LeastMedian(LeastMedianTerminationCriterion {
                confidence: settings.confidence,
                stop_threshold: settings.stop_threshold,
            }),
        )
    };
    let ransac_termination = || {
        TerminationChoice::Ransac(RansacTerminationCriterion {
            confidence: settings.confidence,
        })
    };

    match method {
        RobustEstimatorMethod::Ransac => MethodComponents {
            sampler: uniform(),
            scoring: ScoringChoice::InlierCount(InlierCountScoring::new(settings.threshold)),
            termination: ransac_termination(),
        },
        RobustEstimatorMethod::Msac => MethodComponents {
            sampler: uniform(),
            scoring: ScoringChoice::TruncatedQuadratic(TruncatedQuadraticScoring::new(
                settings.threshold,
            )),
            termination: ransac_termination(),
        },
        RobustEstimatorMethod::Lmeds => {
            let (scoring, termination) = least_median();
            MethodComponents {
                sampler: uniform(),
                scoring,
                termination,
            }
        }
        RobustEstimatorMethod::Prosac => {
            let order = order();
            let termination = TerminationChoice::Prosac(ProsacTerminationCriterion::new(
                settings.confidence,
                settings.prosac_beta,
                settings.prosac_non_randomness,
                &order,
            ));
            MethodComponents {
                sampler: SamplerChoice::Prosac(ProsacSampler::from_order(
                    order,
                    seed,
                    settings.max_iterations,
                )),
                scoring: ScoringChoice::InlierCount(InlierCountScoring::new(settings.threshold)),
                termination,
            }
        }
        RobustEstimatorMethod::Promeds => {
            let (scoring, termination) = least_median();
            let horizon =
                required_iterations(settings.confidence, 0.5, sample_size, settings.max_iterations);
            MethodComponents {
                sampler: SamplerChoice::Prosac(ProsacSampler::from_order(order(), seed, horizon)),
                scoring,
                termination,
            }
        }
    }
}
