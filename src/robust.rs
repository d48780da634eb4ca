//! Robust polynomial estimator.
//!
//! [`RobustPolynomialEstimator`] fits a polynomial of a given degree to a set
//! of evaluations that may contain outliers. The method (RANSAC, MSAC,
//! LMedS, PROSAC or PROMedS) only changes which sampler, scoring and
//! termination criterion drive the consensus engine.
//!
//! ```
//! use polyconsensus::{PolynomialEvaluation, RobustEstimatorMethod, RobustPolynomialEstimator};
//!
//! let mut evaluations: Vec<_> = (0..10)
//!     .map(|i| {
//!         let x = i as f64;
//!         PolynomialEvaluation::direct(x, 1.0 + 2.0 * x)
//!     })
//!     .collect();
//! evaluations.push(PolynomialEvaluation::direct(4.5, 100.0));
//!
//! let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Ransac)
//!     .with_evaluations(evaluations)
//!     .unwrap()
//!     .with_seed(42);
//! let line = estimator.estimate().unwrap();
//! assert!((line.evaluate(4.5) - 10.0).abs() < 1e-6);
//! assert!(!estimator.inliers_data().unwrap().inliers.contains(&10));
//! ```

use tracing::debug;

use crate::choices::method_components;
use crate::core::{ConsensusEngine, LeastSquaresOptimizer, Step};
use crate::distance::DistanceMetric;
use crate::error::{invalid_argument, Error, Result};
use crate::estimators::{check_degree, check_evaluations, PolynomialFitter, DEFAULT_DEGREE};
use crate::evaluation::{has_anchor, PolynomialEvaluation};
use crate::listener::{dispatch, EstimationEvent, EstimatorListener};
use crate::polynomial::Polynomial;
use crate::scoring::Score;
use crate::settings::{
    check_confidence, check_max_iterations, check_positive, check_progress_delta,
    RobustEstimatorMethod, RobustSettings,
};

/// Listener type accepted by [`RobustPolynomialEstimator`].
pub type RobustListener = Box<dyn EstimatorListener<RobustPolynomialEstimator>>;

/// Consensus details of the last successful estimation.
#[derive(Debug, Clone)]
pub struct InliersData {
    /// Indices of the evaluations supporting the best candidate.
    pub inliers: Vec<usize>,
    /// Residual of every evaluation against the returned polynomial.
    pub residuals: Vec<f64>,
    pub score: Score,
    pub iterations: usize,
}

/// Robust estimator of a polynomial from evaluations containing outliers.
pub struct RobustPolynomialEstimator {
    method: RobustEstimatorMethod,
    degree: usize,
    evaluations: Vec<PolynomialEvaluation>,
    quality_scores: Option<Vec<f64>>,
    settings: RobustSettings,
    listener: Option<RobustListener>,
    locked: bool,
    seed: Option<u64>,
    inliers_data: Option<InliersData>,
}

impl Default for RobustPolynomialEstimator {
    fn default() -> Self {
        Self::new(RobustEstimatorMethod::default())
    }
}

impl RobustPolynomialEstimator {
    /// Estimator for first-degree polynomials with default settings.
    pub fn new(method: RobustEstimatorMethod) -> Self {
        Self {
            method,
            degree: DEFAULT_DEGREE,
            evaluations: Vec::new(),
            quality_scores: None,
            settings: RobustSettings::default(),
            listener: None,
            locked: false,
            seed: None,
            inliers_data: None,
        }
    }

    pub fn with_degree(mut self, degree: usize) -> Result<Self> {
        self.set_degree(degree)?;
        Ok(self)
    }

    pub fn with_evaluations(mut self, evaluations: Vec<PolynomialEvaluation>) -> Result<Self> {
        self.set_evaluations(evaluations)?;
        Ok(self)
    }

    pub fn with_quality_scores(mut self, quality_scores: Vec<f64>) -> Result<Self> {
        self.set_quality_scores(quality_scores)?;
        Ok(self)
    }

    pub fn with_settings(mut self, settings: RobustSettings) -> Result<Self> {
        self.set_settings(settings)?;
        Ok(self)
    }

    pub fn with_listener<L>(mut self, listener: L) -> Self
    where
        L: EstimatorListener<RobustPolynomialEstimator> + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Fix the random seed; every `estimate()` then draws the same subsets.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn method(&self) -> RobustEstimatorMethod {
        self.method
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn set_degree(&mut self, degree: usize) -> Result<()> {
        self.check_unlocked()?;
        check_degree(degree)?;
        self.degree = degree;
        Ok(())
    }

    pub fn evaluations(&self) -> &[PolynomialEvaluation] {
        &self.evaluations
    }

    /// # Errors
    /// [`Error::InvalidArgument`] when fewer than `degree + 1` evaluations are
    /// given.
    pub fn set_evaluations(&mut self, evaluations: Vec<PolynomialEvaluation>) -> Result<()> {
        self.check_unlocked()?;
        check_evaluations(self.degree, &evaluations)?;
        self.evaluations = evaluations;
        Ok(())
    }

    pub fn quality_scores(&self) -> Option<&[f64]> {
        self.quality_scores.as_deref()
    }

    /// Quality of every evaluation (larger is better), read by PROSAC and
    /// PROMedS only.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] when fewer than `degree + 1` scores are
    /// given.
    pub fn set_quality_scores(&mut self, quality_scores: Vec<f64>) -> Result<()> {
        self.check_unlocked()?;
        if quality_scores.len() < self.min_number_of_evaluations() {
            return Err(invalid_argument(format!(
                "at least {} quality scores are required, got {}",
                self.min_number_of_evaluations(),
                quality_scores.len()
            )));
        }
        self.quality_scores = Some(quality_scores);
        Ok(())
    }

    pub fn settings(&self) -> &RobustSettings {
        &self.settings
    }

    /// Replace every setting at once.
    pub fn set_settings(&mut self, settings: RobustSettings) -> Result<()> {
        self.check_unlocked()?;
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn confidence(&self) -> f64 {
        self.settings.confidence
    }

    pub fn set_confidence(&mut self, confidence: f64) -> Result<()> {
        self.check_unlocked()?;
        check_confidence(confidence)?;
        self.settings.confidence = confidence;
        Ok(())
    }

    pub fn max_iterations(&self) -> usize {
        self.settings.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        self.check_unlocked()?;
        check_max_iterations(max_iterations)?;
        self.settings.max_iterations = max_iterations;
        Ok(())
    }

    pub fn progress_delta(&self) -> f32 {
        self.settings.progress_delta
    }

    pub fn set_progress_delta(&mut self, progress_delta: f32) -> Result<()> {
        self.check_unlocked()?;
        check_progress_delta(progress_delta)?;
        self.settings.progress_delta = progress_delta;
        Ok(())
    }

    pub fn threshold(&self) -> f64 {
        self.settings.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        self.check_unlocked()?;
        check_positive("threshold", threshold)?;
        self.settings.threshold = threshold;
        Ok(())
    }

    pub fn stop_threshold(&self) -> f64 {
        self.settings.stop_threshold
    }

    pub fn set_stop_threshold(&mut self, stop_threshold: f64) -> Result<()> {
        self.check_unlocked()?;
        check_positive("stop threshold", stop_threshold)?;
        self.settings.stop_threshold = stop_threshold;
        Ok(())
    }

    pub fn inlier_factor(&self) -> f64 {
        self.settings.inlier_factor
    }

    pub fn set_inlier_factor(&mut self, inlier_factor: f64) -> Result<()> {
        self.check_unlocked()?;
        check_positive("inlier factor", inlier_factor)?;
        self.settings.inlier_factor = inlier_factor;
        Ok(())
    }

    pub fn is_geometric_distance_used(&self) -> bool {
        self.settings.use_geometric_distance
    }

    pub fn set_geometric_distance_used(&mut self, use_geometric_distance: bool) -> Result<()> {
        self.check_unlocked()?;
        self.settings.use_geometric_distance = use_geometric_distance;
        Ok(())
    }

    pub fn is_result_refined(&self) -> bool {
        self.settings.refine_result
    }

    pub fn set_result_refined(&mut self, refine_result: bool) -> Result<()> {
        self.check_unlocked()?;
        self.settings.refine_result = refine_result;
        Ok(())
    }

    pub fn set_listener(&mut self, listener: Option<RobustListener>) -> Result<()> {
        self.check_unlocked()?;
        self.listener = listener;
        Ok(())
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// `None` seeds every estimation from entropy.
    pub fn set_seed(&mut self, seed: Option<u64>) -> Result<()> {
        self.check_unlocked()?;
        self.seed = seed;
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn min_number_of_evaluations(&self) -> usize {
        self.degree + 1
    }

    /// Enough evaluations (at least one of them direct or integral) and, for
    /// PROSAC/PROMedS, one quality score per evaluation.
    pub fn is_ready(&self) -> bool {
        let enough = self.evaluations.len() >= self.min_number_of_evaluations()
            && has_anchor(&self.evaluations);
        let scored = !self.method.requires_quality_scores()
            || self
                .quality_scores
                .as_ref()
                .is_some_and(|scores| scores.len() == self.evaluations.len());
        enough && scored
    }

    /// Consensus details of the last successful `estimate()`.
    pub fn inliers_data(&self) -> Option<&InliersData> {
        self.inliers_data.as_ref()
    }

    /// Run the robust estimation.
    ///
    /// # Errors
    /// - [`Error::Locked`] when called from a listener callback,
    /// - [`Error::NotReady`] when [`is_ready`](Self::is_ready) is false,
    /// - [`Error::RobustEstimation`] when no subset produced a candidate.
    pub fn estimate(&mut self) -> Result<Polynomial> {
        self.check_unlocked()?;
        if !self.is_ready() {
            return Err(Error::NotReady(
                "needs degree + 1 evaluations including a direct or integral one, \
                 and one quality score per evaluation for PROSAC/PROMedS",
            ));
        }

        self.locked = true;
        let mut listener = self.listener.take();
        let result = self.run_consensus(&mut listener);
        self.listener = listener;
        self.locked = false;
        result
    }

    fn run_consensus(&mut self, listener: &mut Option<RobustListener>) -> Result<Polynomial> {
        self.inliers_data = None;
        Self::notify(listener, self, EstimationEvent::Start);

        let evaluations = self.evaluations.clone();
        debug!(
            method = ?self.method,
            degree = self.degree,
            evaluations = evaluations.len(),
            "robust polynomial estimation started"
        );

        let fitter = PolynomialFitter::new(
            self.degree,
            DistanceMetric::from_geometric_flag(self.settings.use_geometric_distance),
        );
        let components = method_components(
            self.method,
            &self.settings,
            self.quality_scores.as_deref(),
            evaluations.len(),
            self.degree + 1,
            self.seed,
        );
        let final_optimizer = self
            .settings
            .refine_result
            .then(|| LeastSquaresOptimizer::new(fitter));
        let mut engine = ConsensusEngine::new(
            &self.settings,
            fitter,
            components.sampler,
            components.scoring,
            components.termination,
            final_optimizer,
        );

        while let Step::Continue {
            iteration,
            progress,
        } = engine.step(&evaluations)?
        {
            Self::notify(listener, self, EstimationEvent::NextIteration(iteration));
            if let Some(progress) = progress {
                Self::notify(listener, self, EstimationEvent::ProgressChange(progress));
            }
        }

        let output = engine.finish(&evaluations)?;
        debug!(
            iterations = output.iterations,
            inliers = output.inliers.len(),
            coefficients = ?output.model.coefficients(),
            "robust polynomial estimation finished"
        );
        self.inliers_data = Some(InliersData {
            inliers: output.inliers,
            residuals: output.residuals,
            score: output.score,
            iterations: output.iterations,
        });

        Self::notify(listener, self, EstimationEvent::End);
        Ok(output.model)
    }

    fn notify(listener: &mut Option<RobustListener>, estimator: &mut Self, event: EstimationEvent) {
        if let Some(listener) = listener.as_mut() {
            dispatch(listener.as_mut(), estimator, event);
        }
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(Error::Locked);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn line(n: usize) -> Vec<PolynomialEvaluation> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                PolynomialEvaluation::direct(x, 3.0 - x)
            })
            .collect()
    }

    #[test]
    fn defaults() {
        let estimator = RobustPolynomialEstimator::default();
        assert_eq!(estimator.method(), RobustEstimatorMethod::Promeds);
        assert_eq!(estimator.degree(), 1);
        assert_eq!(estimator.min_number_of_evaluations(), 2);
        assert!(!estimator.is_ready());
        assert!(!estimator.is_locked());
        assert!(estimator.inliers_data().is_none());
        assert_eq!(estimator.settings(), &RobustSettings::default());
    }

    #[test]
    fn setters_validate() {
        let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Ransac);
        assert!(estimator.set_degree(0).is_err());
        assert!(estimator.set_confidence(1.1).is_err());
        assert!(estimator.set_max_iterations(0).is_err());
        assert!(estimator.set_progress_delta(2.0).is_err());
        assert!(estimator.set_threshold(0.0).is_err());
        assert!(estimator.set_stop_threshold(-1.0).is_err());
        assert!(estimator.set_inlier_factor(0.0).is_err());
        assert!(estimator.set_evaluations(line(1)).is_err());
        assert!(estimator.set_quality_scores(vec![1.0]).is_err());

        estimator.set_threshold(0.5).unwrap();
        estimator.set_geometric_distance_used(true).unwrap();
        estimator.set_result_refined(false).unwrap();
        assert_eq!(estimator.threshold(), 0.5);
        assert!(estimator.is_geometric_distance_used());
        assert!(!estimator.is_result_refined());
    }

    #[test]
    fn prosac_needs_matching_quality_scores() {
        let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Prosac)
            .with_evaluations(line(5))
            .unwrap();
        assert!(!estimator.is_ready());
        assert!(matches!(estimator.estimate(), Err(Error::NotReady(_))));

        estimator.set_quality_scores(vec![1.0; 4]).unwrap();
        assert!(!estimator.is_ready());
        estimator.set_quality_scores(vec![1.0; 5]).unwrap();
        assert!(estimator.is_ready());
    }

    #[test]
    fn derivative_only_evaluations_are_not_ready() {
        let evaluations = vec![
            PolynomialEvaluation::derivative(0.0, 1.0, 1).unwrap(),
            PolynomialEvaluation::derivative(1.0, 1.0, 1).unwrap(),
        ];
        let estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Lmeds)
            .with_evaluations(evaluations)
            .unwrap();
        assert!(!estimator.is_ready());
    }

    #[test]
    fn seeded_estimation_is_repeatable() {
        let mut evaluations = line(12);
        evaluations.push(PolynomialEvaluation::direct(2.0, 50.0));
        evaluations.push(PolynomialEvaluation::direct(7.0, -40.0));
        let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Msac)
            .with_evaluations(evaluations)
            .unwrap()
            .with_seed(9);

        let first = estimator.estimate().unwrap();
        let first_data = estimator.inliers_data().cloned().unwrap();
        let second = estimator.estimate().unwrap();
        let second_data = estimator.inliers_data().cloned().unwrap();
        assert_eq!(first, second);
        assert_eq!(first_data.inliers, second_data.inliers);
        assert_eq!(first_data.iterations, second_data.iterations);
    }

    #[test]
    fn inliers_data_reports_residuals_of_every_evaluation() {
        let mut evaluations = line(8);
        evaluations.push(PolynomialEvaluation::direct(3.5, 10.0));
        let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Ransac)
            .with_evaluations(evaluations)
            .unwrap()
            .with_seed(3);
        estimator.estimate().unwrap();

        let data = estimator.inliers_data().unwrap();
        assert_eq!(data.residuals.len(), 9);
        assert_eq!(data.inliers, (0..8).collect::<Vec<_>>());
        assert!((data.residuals[8] - 10.5).abs() < 1e-6);
        assert!(data.iterations >= 1);
    }

    struct Meddler {
        results: Rc<RefCell<Vec<Result<()>>>>,
    }

    impl EstimatorListener<RobustPolynomialEstimator> for Meddler {
        fn on_estimate_start(&mut self, estimator: &mut RobustPolynomialEstimator) {
            assert!(estimator.is_locked());
            let mut results = self.results.borrow_mut();
            results.push(estimator.set_threshold(1.0));
            results.push(estimator.set_degree(2));
            results.push(estimator.set_listener(None));
            results.push(estimator.estimate().map(|_| ()));
        }

        fn on_estimate_next_iteration(
            &mut self,
            estimator: &mut RobustPolynomialEstimator,
            _: usize,
        ) {
            self.results
                .borrow_mut()
                .push(estimator.set_max_iterations(10));
        }
    }

    #[test]
    fn listener_sees_locked_estimator() {
        let results = Rc::new(RefCell::new(Vec::new()));
        let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Ransac)
            .with_evaluations(line(6))
            .unwrap()
            .with_seed(1)
            .with_listener(Meddler {
                results: Rc::clone(&results),
            });

        estimator.estimate().unwrap();
        let results = results.borrow();
        assert!(results.len() >= 5);
        assert!(results.iter().all(|r| *r == Err(Error::Locked)));
        assert!(!estimator.is_locked());
        assert_eq!(estimator.degree(), 1);
        assert_eq!(estimator.threshold(), RobustSettings::default().threshold);

        // The listener survives the estimation and is called again.
        drop(results);
        estimator.estimate().unwrap();
    }
}
