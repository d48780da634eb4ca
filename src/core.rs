//! Core consensus traits and the sampling-consensus engine.
//!
//! The engine is generic over its components:
//! - [`Estimator`] fits a model to a minimal or non-minimal subset and
//!   measures residuals,
//! - [`Sampler`] draws minimal subsets,
//! - [`Scoring`] turns residuals into a [`Score`] and an inlier set,
//! - [`TerminationCriterion`] shrinks the iteration bound as better
//!   candidates appear,
//! - [`LocalOptimizer`] refines the final candidate.
//!
//! [`ConsensusEngine::step`] runs one iteration at a time so callers can
//! report progress between iterations; [`ConsensusEngine::run`] drives the
//! whole loop.

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::evaluation::PolynomialEvaluation;
use crate::scoring::Score;
use crate::settings::RobustSettings;

/// Estimator responsible for generating model hypotheses from subsets.
pub trait Estimator {
    /// Model type produced by this estimator.
    type Model: Clone;

    /// Size of a minimal sample for this estimator.
    fn sample_size(&self) -> usize;

    /// Check whether a given sample can determine a model at all.
    fn is_valid_sample(&self, data: &[PolynomialEvaluation], sample: &[usize]) -> bool;

    /// Estimate a model that interpolates a minimal sample.
    fn estimate_model(
        &self,
        data: &[PolynomialEvaluation],
        sample: &[usize],
    ) -> Result<Self::Model>;

    /// Estimate a model from any number of evaluations in the least-squares
    /// sense.
    fn estimate_model_nonminimal(
        &self,
        data: &[PolynomialEvaluation],
        sample: &[usize],
    ) -> Result<Self::Model>;

    /// Non-negative residual of `evaluation` against `model`.
    fn residual(&self, model: &Self::Model, evaluation: &PolynomialEvaluation) -> f64;
}

/// Sampler responsible for drawing minimal samples.
pub trait Sampler {
    /// Draw `sample_size` distinct indices in `[0, point_number)` into
    /// `out_indices`.
    ///
    /// Returns `false` if a sample could not be drawn.
    fn sample(
        &mut self,
        point_number: usize,
        sample_size: usize,
        out_indices: &mut [usize],
    ) -> bool;
}

/// Scoring strategy used to evaluate candidates and determine inliers.
pub trait Scoring {
    /// Inlier/outlier threshold the scoring is configured with.
    fn threshold(&self) -> f64;

    /// Score a candidate from the residuals of every evaluation and fill
    /// `inliers_out` with the indices of its inliers.
    fn score(
        &mut self,
        residuals: &[f64],
        sample_size: usize,
        inliers_out: &mut Vec<usize>,
    ) -> Score;
}

/// Termination criterion deciding when the loop can stop.
pub trait TerminationCriterion {
    /// Called after every improvement of the best candidate. May lower
    /// `max_iterations`.
    ///
    /// Returns `true` if the loop should terminate immediately.
    fn check(
        &mut self,
        best_score: &Score,
        best_inliers: &[usize],
        point_number: usize,
        sample_size: usize,
        max_iterations: &mut usize,
    ) -> bool;
}

/// Refinement of the best candidate once the loop is over.
pub trait LocalOptimizer<M> {
    /// Returns the refined model, or a copy of `model` if refinement is not
    /// possible.
    fn run(&mut self, data: &[PolynomialEvaluation], inliers: &[usize], model: &M) -> M;
}

/// Least squares optimizer that refits the model using all inliers.
pub struct LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    estimator: E,
}

impl<E> LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }
}

impl<E> LocalOptimizer<E::Model> for LeastSquaresOptimizer<E>
where
    E: Estimator,
{
    fn run(
        &mut self,
        data: &[PolynomialEvaluation],
        inliers: &[usize],
        model: &E::Model,
    ) -> E::Model {
        if inliers.len() < self.estimator.sample_size() {
            return model.clone();
        }

        match self.estimator.estimate_model_nonminimal(data, inliers) {
            Ok(refined) => refined,
            Err(err) => {
                warn!(
                    %err,
                    inliers = inliers.len(),
                    "refit over inliers failed, keeping best candidate"
                );
                model.clone()
            }
        }
    }
}

/// Lifecycle of a [`ConsensusEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Outcome of a single [`ConsensusEngine::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// An iteration was executed. `progress` is set when the progress in
    /// \[0, 1\] advanced by at least the configured delta.
    Continue {
        iteration: usize,
        progress: Option<f32>,
    },
    /// The iteration bound is reached; call [`ConsensusEngine::finish`].
    Done,
}

/// Result of a consensus run.
#[derive(Debug, Clone)]
pub struct ConsensusOutput<M> {
    pub model: M,
    /// Inliers of the best candidate.
    pub inliers: Vec<usize>,
    /// Residual of every evaluation against `model`.
    pub residuals: Vec<f64>,
    pub score: Score,
    pub iterations: usize,
}

/// Generic sampling-consensus loop orchestrating the above components.
pub struct ConsensusEngine<E, Sa, Sc, T, LO>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring,
    T: TerminationCriterion,
    LO: LocalOptimizer<E::Model>,
{
    pub estimator: E,
    pub sampler: Sa,
    pub scoring: Sc,
    pub termination: T,
    pub final_optimizer: Option<LO>,

    max_iterations: usize,
    progress_delta: f32,

    state: EngineState,
    iteration: usize,
    iteration_bound: usize,
    last_progress: f32,

    best_model: Option<E::Model>,
    best_score: Option<Score>,
    best_inliers: Vec<usize>,

    sample: Vec<usize>,
    residuals: Vec<f64>,
    inliers: Vec<usize>,
}

impl<E, Sa, Sc, T, LO> ConsensusEngine<E, Sa, Sc, T, LO>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring,
    T: TerminationCriterion,
    LO: LocalOptimizer<E::Model>,
{
    /// Create a new engine from its components. Only `max_iterations` and
    /// `progress_delta` are read from `settings`.
    pub fn new(
        settings: &RobustSettings,
        estimator: E,
        sampler: Sa,
        scoring: Sc,
        termination: T,
        final_optimizer: Option<LO>,
    ) -> Self {
        let sample_size = estimator.sample_size();
        Self {
            estimator,
            sampler,
            scoring,
            termination,
            final_optimizer,
            max_iterations: settings.max_iterations.max(1),
            progress_delta: settings.progress_delta,
            state: EngineState::Idle,
            iteration: 0,
            iteration_bound: settings.max_iterations.max(1),
            last_progress: 0.0,
            best_model: None,
            best_score: None,
            best_inliers: Vec::new(),
            sample: vec![0; sample_size],
            residuals: Vec::new(),
            inliers: Vec::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Number of iterations executed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Current (possibly shrunk) iteration bound.
    pub fn iteration_bound(&self) -> usize {
        self.iteration_bound
    }

    pub fn best_score(&self) -> Option<&Score> {
        self.best_score.as_ref()
    }

    pub fn best_inliers(&self) -> &[usize] {
        &self.best_inliers
    }

    /// Return to [`EngineState::Idle`], forgetting the best candidate.
    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
        self.iteration = 0;
        self.iteration_bound = self.max_iterations;
        self.last_progress = 0.0;
        self.best_model = None;
        self.best_score = None;
        self.best_inliers.clear();
    }

    /// Execute one iteration: draw a minimal subset, fit it, score every
    /// evaluation and keep the candidate if it is strictly better.
    ///
    /// # Errors
    /// [`Error::NotReady`] when `data` holds fewer evaluations than a minimal
    /// subset.
    pub fn step(&mut self, data: &[PolynomialEvaluation]) -> Result<Step> {
        let point_number = data.len();
        let sample_size = self.estimator.sample_size();

        match self.state {
            EngineState::Succeeded | EngineState::Failed => return Ok(Step::Done),
            EngineState::Idle => {
                if point_number < sample_size {
                    return Err(Error::NotReady("fewer evaluations than a minimal subset"));
                }
                self.state = EngineState::Running;
                self.sample.resize(sample_size, 0);
                self.residuals.resize(point_number, 0.0);
            }
            EngineState::Running => {}
        }

        if self.iteration >= self.iteration_bound {
            return Ok(Step::Done);
        }

        let iteration = self.iteration;
        let stop = self.try_sample(data, iteration);
        self.iteration += 1;
        if stop {
            self.iteration_bound = self.iteration;
        }

        let progress = (self.iteration as f32 / self.iteration_bound as f32).min(1.0);
        let progress = if progress - self.last_progress >= self.progress_delta {
            self.last_progress = progress;
            Some(progress)
        } else {
            None
        };

        Ok(Step::Continue {
            iteration,
            progress,
        })
    }

    /// One sample/fit/score round. Returns `true` when the termination
    /// criterion asks to stop.
    fn try_sample(&mut self, data: &[PolynomialEvaluation], iteration: usize) -> bool {
        let point_number = data.len();
        let sample_size = self.sample.len();

        if !self.sampler.sample(point_number, sample_size, &mut self.sample) {
            trace!(iteration, "sampler could not draw a subset");
            return false;
        }
        if !self.estimator.is_valid_sample(data, &self.sample) {
            trace!(iteration, sample = ?self.sample, "invalid subset skipped");
            return false;
        }

        let model = match self.estimator.estimate_model(data, &self.sample) {
            Ok(model) => model,
            Err(err) => {
                trace!(iteration, sample = ?self.sample, %err, "subset fit failed");
                return false;
            }
        };

        for (residual, evaluation) in self.residuals.iter_mut().zip(data) {
            *residual = self.estimator.residual(&model, evaluation);
        }
        let score = self
            .scoring
            .score(&self.residuals, sample_size, &mut self.inliers);
        if score.value.is_nan() {
            trace!(iteration, "candidate with undefined score skipped");
            return false;
        }

        let better = match &self.best_score {
            None => true,
            Some(best) => score > *best,
        };
        if !better {
            return false;
        }

        self.best_model = Some(model);
        self.best_score = Some(score);
        std::mem::swap(&mut self.best_inliers, &mut self.inliers);

        let stop = self.termination.check(
            &score,
            &self.best_inliers,
            point_number,
            sample_size,
            &mut self.iteration_bound,
        );
        self.iteration_bound = self.iteration_bound.clamp(1, self.max_iterations);

        debug!(
            iteration,
            value = score.value,
            inliers = score.inlier_count,
            bound = self.iteration_bound,
            stop,
            "new best candidate"
        );
        stop
    }

    /// Finish the run: refine the best candidate over its inliers.
    ///
    /// # Errors
    /// [`Error::RobustEstimation`] when no candidate was ever found.
    pub fn finish(&mut self, data: &[PolynomialEvaluation]) -> Result<ConsensusOutput<E::Model>> {
        let (Some(model), Some(score)) = (self.best_model.take(), self.best_score) else {
            self.state = EngineState::Failed;
            debug!(iterations = self.iteration, "no consensus reached");
            return Err(Error::RobustEstimation {
                iterations: self.iteration,
            });
        };

        let model = match &mut self.final_optimizer {
            Some(optimizer) => optimizer.run(data, &self.best_inliers, &model),
            None => model,
        };

        let residuals = data
            .iter()
            .map(|evaluation| self.estimator.residual(&model, evaluation))
            .collect();

        self.state = EngineState::Succeeded;
        Ok(ConsensusOutput {
            model,
            inliers: std::mem::take(&mut self.best_inliers),
            residuals,
            score,
            iterations: self.iteration,
        })
    }

    /// Run the loop to completion.
    pub fn run(&mut self, data: &[PolynomialEvaluation]) -> Result<ConsensusOutput<E::Model>> {
        while let Step::Continue { .. } = self.step(data)? {}
        self.finish(data)
    }
}
