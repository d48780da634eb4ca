//! Integration tests for the robust polynomial estimators.
//!
//! These tests verify that every method recovers polynomials from synthetic
//! data with and without outliers, and that the estimator contract (locking,
//! readiness, events) holds from the outside.

use std::sync::mpsc::channel;

use approx::assert_abs_diff_eq;
use polyconsensus::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ALL_METHODS: [RobustEstimatorMethod; 5] = [
    RobustEstimatorMethod::Ransac,
    RobustEstimatorMethod::Lmeds,
    RobustEstimatorMethod::Msac,
    RobustEstimatorMethod::Prosac,
    RobustEstimatorMethod::Promeds,
];

struct Dataset {
    truth: Polynomial,
    evaluations: Vec<PolynomialEvaluation>,
    quality_scores: Vec<f64>,
    outliers: Vec<usize>,
}

/// Noise-free samples of `truth` on `[-range, range]`, with every index in
/// `outliers` pushed away by at least 5 units. Inliers get higher quality
/// scores than outliers.
fn dataset(truth: Polynomial, n: usize, range: f64, outlier_ratio: f64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let outlier_count = (n as f64 * outlier_ratio).round() as usize;
    let mut is_outlier = vec![false; n];
    while is_outlier.iter().filter(|&&o| o).count() < outlier_count {
        is_outlier[rng.gen_range(0..n)] = true;
    }

    let mut evaluations = Vec::with_capacity(n);
    let mut quality_scores = Vec::with_capacity(n);
    for (i, &outlier) in is_outlier.iter().enumerate() {
        let x = -range + 2.0 * range * i as f64 / (n - 1) as f64;
        let mut y = truth.evaluate(x);
        if outlier {
            let offset: f64 = rng.gen_range(5.0..50.0);
            y += if rng.gen_bool(0.5) { offset } else { -offset };
            quality_scores.push(rng.gen_range(0.0..0.5));
        } else {
            quality_scores.push(rng.gen_range(0.5..1.0));
        }
        evaluations.push(PolynomialEvaluation::direct(x, y));
    }

    Dataset {
        truth,
        evaluations,
        quality_scores,
        outliers: (0..n).filter(|&i| is_outlier[i]).collect(),
    }
}

fn estimator_for(
    method: RobustEstimatorMethod,
    degree: usize,
    data: &Dataset,
    seed: u64,
) -> RobustPolynomialEstimator {
    RobustPolynomialEstimator::new(method)
        .with_degree(degree)
        .unwrap()
        .with_evaluations(data.evaluations.clone())
        .unwrap()
        .with_quality_scores(data.quality_scores.clone())
        .unwrap()
        .with_seed(seed)
}

fn assert_coefficients(actual: &Polynomial, expected: &[f64], epsilon: f64) {
    assert_eq!(actual.coefficients().len(), expected.len());
    for (a, e) in actual.coefficients().iter().zip(expected) {
        assert_abs_diff_eq!(*a, *e, epsilon = epsilon);
    }
}

#[test]
fn test_exact_fit_every_method_and_degree() {
    let mut rng = StdRng::seed_from_u64(2024);
    for degree in 1..=4 {
        let coefficients: Vec<f64> = (0..=degree).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let truth = Polynomial::new(coefficients.clone()).unwrap();
        let data = dataset(truth, 30, 2.0, 0.0, degree as u64);

        for method in ALL_METHODS {
            let mut estimator = estimator_for(method, degree, &data, 11);
            let polynomial = estimator.estimate().unwrap();
            assert_coefficients(&polynomial, &coefficients, 1e-6);
        }
    }
}

#[test]
fn test_parabola_through_three_points() {
    let evaluations = vec![
        PolynomialEvaluation::direct(0.0, 1.0),
        PolynomialEvaluation::direct(1.0, 3.0),
        PolynomialEvaluation::direct(2.0, 7.0),
    ];
    for method in ALL_METHODS {
        let mut estimator = RobustPolynomialEstimator::new(method)
            .with_degree(2)
            .unwrap()
            .with_evaluations(evaluations.clone())
            .unwrap()
            .with_quality_scores(vec![1.0, 1.0, 1.0])
            .unwrap()
            .with_seed(0);
        let polynomial = estimator.estimate().unwrap();
        assert_coefficients(&polynomial, &[1.0, 1.0, 1.0], 1e-9);
    }
}

#[test]
fn test_estimation_is_idempotent() {
    let truth = Polynomial::new(vec![0.5, -1.0, 0.25]).unwrap();
    let data = dataset(truth, 40, 4.0, 0.3, 8);
    for method in ALL_METHODS {
        let mut estimator = estimator_for(method, 2, &data, 77);
        let first = estimator.estimate().unwrap();
        let first_inliers = estimator.inliers_data().unwrap().inliers.clone();
        let second = estimator.estimate().unwrap();
        assert_eq!(first, second, "{method:?}");
        assert_eq!(first_inliers, estimator.inliers_data().unwrap().inliers);
    }
}

#[test]
fn test_outlier_rejection() {
    let truth = Polynomial::new(vec![1.0, 2.0, -0.5]).unwrap();
    let data = dataset(truth, 40, 5.0, 0.3, 3);
    assert_eq!(data.outliers.len(), 12);

    for method in ALL_METHODS {
        let mut estimator = estimator_for(method, 2, &data, 5);
        let polynomial = estimator.estimate().unwrap();
        assert_coefficients(&polynomial, data.truth.coefficients(), 1e-6);

        let inliers = &estimator.inliers_data().unwrap().inliers;
        for outlier in &data.outliers {
            assert!(!inliers.contains(outlier), "{method:?} kept outlier {outlier}");
        }
        assert_eq!(inliers.len(), 28, "{method:?}");
    }
}

#[test]
fn test_outlier_rejection_at_forty_percent() {
    let truth = Polynomial::new(vec![-2.0, 0.5]).unwrap();
    let data = dataset(truth, 50, 10.0, 0.4, 21);
    for method in [
        RobustEstimatorMethod::Ransac,
        RobustEstimatorMethod::Msac,
        RobustEstimatorMethod::Prosac,
    ] {
        let mut estimator = estimator_for(method, 1, &data, 4);
        let line = estimator.estimate().unwrap();
        assert_coefficients(&line, &[-2.0, 0.5], 1e-6);
    }
}

#[test]
fn test_parabola_with_single_outlier() {
    let mut evaluations: Vec<_> = (0..7)
        .map(|i| {
            let x = i as f64;
            PolynomialEvaluation::direct(x, 1.0 + x + x * x)
        })
        .collect();
    evaluations.push(PolynomialEvaluation::direct(3.0, 100.0));

    let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Ransac)
        .with_degree(2)
        .unwrap()
        .with_evaluations(evaluations)
        .unwrap()
        .with_seed(1);
    let polynomial = estimator.estimate().unwrap();
    assert_coefficients(&polynomial, &[1.0, 1.0, 1.0], 1e-2);
    assert!(!estimator.inliers_data().unwrap().inliers.contains(&7));
}

#[test]
fn test_ambiguous_four_points_fit_a_consistent_subset() {
    // (0,1), (1,3), (2,7) lie on 1 + x + x^2; (3,100) does not. With four
    // points every triple is interpolated exactly, so any returned parabola
    // must pass through at least three of them.
    let evaluations = vec![
        PolynomialEvaluation::direct(0.0, 1.0),
        PolynomialEvaluation::direct(1.0, 3.0),
        PolynomialEvaluation::direct(2.0, 7.0),
        PolynomialEvaluation::direct(3.0, 100.0),
    ];
    let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Ransac)
        .with_degree(2)
        .unwrap()
        .with_evaluations(evaluations.clone())
        .unwrap()
        .with_seed(2);
    let polynomial = estimator.estimate().unwrap();

    let fitted = evaluations
        .iter()
        .filter(|e| DistanceMetric::Algebraic.distance(e, &polynomial) < 1e-6)
        .count();
    assert!(fitted >= 3);
    assert!(estimator.inliers_data().unwrap().inliers.len() >= 3);
}

#[test]
fn test_lmeds_stop_threshold_reduces_iterations() {
    // Small noise keeps the median residual away from zero.
    let mut rng = StdRng::seed_from_u64(99);
    let truth = Polynomial::new(vec![0.0, 1.0, 0.2]).unwrap();
    let mut data = dataset(truth, 60, 3.0, 0.25, 17);
    data.evaluations = data
        .evaluations
        .iter()
        .map(|e| {
            let x = match e {
                PolynomialEvaluation::Direct(direct) => direct.x(),
                _ => unreachable!("dataset only holds direct evaluations"),
            };
            PolynomialEvaluation::direct(x, e.evaluation() + rng.gen_range(-0.01..0.01))
        })
        .collect();

    let iterations_with = |stop_threshold: f64| {
        let mut estimator = estimator_for(RobustEstimatorMethod::Lmeds, 2, &data, 1234);
        estimator.set_stop_threshold(stop_threshold).unwrap();
        estimator.estimate().unwrap();
        estimator.inliers_data().unwrap().iterations
    };

    let loose = iterations_with(1e-1);
    let strict = iterations_with(1e-9);
    assert!(loose <= strict, "loose {loose} > strict {strict}");
}

#[test]
fn test_prosac_with_perfect_ranking_needs_fewer_iterations() {
    let truth = Polynomial::new(vec![3.0, -1.0, 0.1]).unwrap();
    let mut data = dataset(truth, 100, 10.0, 0.4, 42);
    // Perfect ranking: every inlier scores above every outlier.
    for (i, score) in data.quality_scores.iter_mut().enumerate() {
        *score = if data.outliers.contains(&i) { 0.0 } else { 1.0 + i as f64 * 1e-3 };
    }

    let mut prosac = estimator_for(RobustEstimatorMethod::Prosac, 2, &data, 6);
    let mut ransac = estimator_for(RobustEstimatorMethod::Ransac, 2, &data, 6);
    let prosac_model = prosac.estimate().unwrap();
    let ransac_model = ransac.estimate().unwrap();

    assert_coefficients(&prosac_model, &[3.0, -1.0, 0.1], 1e-6);
    assert_coefficients(&ransac_model, &[3.0, -1.0, 0.1], 1e-6);
    assert!(
        prosac.inliers_data().unwrap().iterations <= ransac.inliers_data().unwrap().iterations
    );
}

/// Samples of `2x + 1` whose best-ranked evaluation is a gross outlier.
fn line_with_top_ranked_outlier() -> (Vec<PolynomialEvaluation>, Vec<f64>) {
    let mut evaluations: Vec<_> = (0..30)
        .map(|i| {
            let x = i as f64 * 0.5;
            PolynomialEvaluation::direct(x, 2.0 * x + 1.0)
        })
        .collect();
    evaluations[0] = PolynomialEvaluation::direct(0.0, 500.0);
    let mut quality_scores: Vec<f64> = (0..30).map(|i| 1.0 - i as f64 * 0.01).collect();
    quality_scores[0] = 10.0;
    (evaluations, quality_scores)
}

#[test]
fn test_progressive_methods_survive_top_ranked_outlier() {
    let (evaluations, quality_scores) = line_with_top_ranked_outlier();
    for method in [RobustEstimatorMethod::Prosac, RobustEstimatorMethod::Promeds] {
        for seed in 0..10 {
            let mut estimator = RobustPolynomialEstimator::new(method)
                .with_evaluations(evaluations.clone())
                .unwrap()
                .with_quality_scores(quality_scores.clone())
                .unwrap()
                .with_seed(seed);
            let line = estimator.estimate().unwrap();
            assert_coefficients(&line, &[1.0, 2.0], 1e-6);

            let data = estimator.inliers_data().unwrap();
            assert!(data.iterations > 1, "{method:?} seed {seed}");
            assert!(!data.inliers.contains(&0), "{method:?} seed {seed}");
            assert_eq!(data.inliers.len(), 29, "{method:?} seed {seed}");
        }
    }
}

/// Fraction of `trials` seeded runs of `method` that recover `truth` exactly
/// and reject every outlier. Quality scores carry no information, so the
/// progressive methods regularly rank outliers first.
fn recovery_rate(
    method: RobustEstimatorMethod,
    truth: &[f64],
    outlier_ratio: f64,
    trials: u64,
) -> f64 {
    let degree = truth.len() - 1;
    let mut successes = 0;
    for trial in 0..trials {
        let polynomial = Polynomial::new(truth.to_vec()).unwrap();
        let mut data = dataset(polynomial, 30, 3.0, outlier_ratio, 1000 + trial);
        let mut rng = StdRng::seed_from_u64(trial);
        data.quality_scores = (0..30).map(|_| rng.gen_range(0.0..1.0)).collect();

        let mut estimator = estimator_for(method, degree, &data, trial);
        let Ok(polynomial) = estimator.estimate() else {
            continue;
        };
        let inliers = &estimator.inliers_data().unwrap().inliers;
        let exact = polynomial
            .coefficients()
            .iter()
            .zip(truth)
            .all(|(a, e)| (a - e).abs() < 1e-6);
        if exact && data.outliers.iter().all(|o| !inliers.contains(o)) {
            successes += 1;
        }
    }
    successes as f64 / trials as f64
}

#[test]
fn test_median_methods_recover_across_seeds() {
    for method in [RobustEstimatorMethod::Lmeds, RobustEstimatorMethod::Promeds] {
        for outlier_ratio in [0.3, 0.4] {
            let rate = recovery_rate(method, &[1.0, 2.0], outlier_ratio, 40);
            assert!(rate >= 0.9, "{method:?} at {outlier_ratio}: {rate}");
        }
    }
}

#[test]
fn test_recovery_rate_meets_confidence() {
    let confidence = RobustSettings::default().confidence;
    for method in [
        RobustEstimatorMethod::Ransac,
        RobustEstimatorMethod::Msac,
        RobustEstimatorMethod::Prosac,
    ] {
        let rate = recovery_rate(method, &[0.5, -1.0, 0.3], 0.3, 50);
        assert!(rate >= confidence, "{method:?}: {rate}");
    }
}

#[test]
fn test_minimal_evaluations_are_interpolated() {
    let evaluations = vec![
        PolynomialEvaluation::direct(-1.0, 2.0),
        PolynomialEvaluation::direct(0.5, -1.0),
        PolynomialEvaluation::direct(2.0, 4.0),
        PolynomialEvaluation::direct(3.0, 0.0),
    ];
    for method in ALL_METHODS {
        let mut estimator = RobustPolynomialEstimator::new(method)
            .with_degree(3)
            .unwrap()
            .with_evaluations(evaluations.clone())
            .unwrap()
            .with_quality_scores(vec![0.1, 0.2, 0.3, 0.4])
            .unwrap()
            .with_seed(3);
        let polynomial = estimator.estimate().unwrap();
        for e in &evaluations {
            let distance = DistanceMetric::Algebraic.distance(e, &polynomial);
            assert_abs_diff_eq!(distance, 0.0, epsilon = 1e-8);
        }
    }
}

#[test]
fn test_mixed_evaluation_kinds_with_outlier() {
    let truth = Polynomial::new(vec![1.0, -2.0, 0.5]).unwrap();
    let mut evaluations: Vec<PolynomialEvaluation> = (0..8)
        .map(|i| {
            let x = i as f64 - 4.0;
            PolynomialEvaluation::direct(x, truth.evaluate(x))
        })
        .collect();
    let slope = truth.evaluate_derivative(1.0);
    evaluations.push(PolynomialEvaluation::derivative(1.0, slope, 1).unwrap());
    let curvature = truth.evaluate_second_derivative(0.0);
    evaluations.push(PolynomialEvaluation::derivative(0.0, curvature, 2).unwrap());
    let integral = truth.nth_integration(1, Some(&[0.5])).unwrap().evaluate(2.0);
    evaluations.push(PolynomialEvaluation::integral(2.0, integral, 1, Some(vec![0.5])).unwrap());
    let interval = truth.nth_order_integrate_interval(-1.0, 1.5, 2, None).unwrap();
    evaluations
        .push(PolynomialEvaluation::integral_interval(-1.0, 1.5, interval, 2, None).unwrap());
    // Corrupted derivative sample.
    evaluations.push(PolynomialEvaluation::derivative(2.0, 30.0, 1).unwrap());

    for method in [RobustEstimatorMethod::Ransac, RobustEstimatorMethod::Lmeds] {
        let mut estimator = RobustPolynomialEstimator::new(method)
            .with_degree(2)
            .unwrap()
            .with_evaluations(evaluations.clone())
            .unwrap()
            .with_seed(10);
        let polynomial = estimator.estimate().unwrap();
        assert_coefficients(&polynomial, truth.coefficients(), 1e-6);
        assert!(!estimator.inliers_data().unwrap().inliers.contains(&12));
    }
}

#[test]
fn test_geometric_distance_recovers_exact_data() {
    let truth = Polynomial::new(vec![0.0, 4.0, -1.0]).unwrap();
    let data = dataset(truth, 25, 3.0, 0.2, 12);
    let mut estimator = estimator_for(RobustEstimatorMethod::Msac, 2, &data, 8);
    estimator.set_geometric_distance_used(true).unwrap();
    let polynomial = estimator.estimate().unwrap();
    assert_coefficients(&polynomial, &[0.0, 4.0, -1.0], 1e-6);
}

#[test]
fn test_events_are_streamed_through_channel() {
    let truth = Polynomial::new(vec![1.0, 1.0]).unwrap();
    let data = dataset(truth, 30, 5.0, 0.3, 4);
    let (tx, rx) = channel();
    let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Ransac)
        .with_evaluations(data.evaluations.clone())
        .unwrap()
        .with_seed(4)
        .with_listener(tx);
    estimator.set_progress_delta(0.0).unwrap();
    estimator.estimate().unwrap();
    let iterations = estimator.inliers_data().unwrap().iterations;
    drop(estimator);

    let events: Vec<EstimationEvent> = rx.iter().collect();
    assert_eq!(events.first(), Some(&EstimationEvent::Start));
    assert_eq!(events.last(), Some(&EstimationEvent::End));

    let steps: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            EstimationEvent::NextIteration(i) => Some(*i),
            _ => None,
        })
        .collect();
    assert_eq!(steps, (0..iterations).collect::<Vec<_>>());

    let progress: Vec<f32> = events
        .iter()
        .filter_map(|e| match e {
            EstimationEvent::ProgressChange(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
}

struct ReentrantListener {
    attempts: usize,
    locked_errors: usize,
}

impl EstimatorListener<RobustPolynomialEstimator> for ReentrantListener {
    fn on_estimate_progress_change(
        &mut self,
        estimator: &mut RobustPolynomialEstimator,
        _progress: f32,
    ) {
        self.attempts += 2;
        if estimator.estimate() == Err(Error::Locked) {
            self.locked_errors += 1;
        }
        if estimator.set_evaluations(Vec::new()) == Err(Error::Locked) {
            self.locked_errors += 1;
        }
        assert_eq!(self.attempts, self.locked_errors);
    }
}

#[test]
fn test_reentrant_calls_from_listener_are_rejected() {
    let truth = Polynomial::new(vec![2.0, -3.0]).unwrap();
    let data = dataset(truth, 20, 1.0, 0.2, 6);
    let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Lmeds)
        .with_evaluations(data.evaluations.clone())
        .unwrap()
        .with_seed(6)
        .with_listener(ReentrantListener {
            attempts: 0,
            locked_errors: 0,
        });
    estimator.set_progress_delta(0.0).unwrap();

    let line = estimator.estimate().unwrap();
    assert_coefficients(&line, &[2.0, -3.0], 1e-6);
    assert!(!estimator.is_locked());
    assert_eq!(estimator.evaluations().len(), 20);
}

#[test]
fn test_not_ready_and_invalid_arguments() {
    let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Ransac);
    assert!(matches!(estimator.estimate(), Err(Error::NotReady(_))));
    assert!(matches!(estimator.set_degree(0), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        estimator.set_evaluations(vec![PolynomialEvaluation::direct(0.0, 0.0)]),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        RobustPolynomialEstimator::default().with_settings(RobustSettings {
            confidence: -0.5,
            ..Default::default()
        }),
        Err(Error::InvalidArgument(_))
    ));

    let mut promeds = RobustPolynomialEstimator::default()
        .with_evaluations(vec![
            PolynomialEvaluation::direct(0.0, 0.0),
            PolynomialEvaluation::direct(1.0, 1.0),
            PolynomialEvaluation::direct(2.0, 2.0),
        ])
        .unwrap();
    assert!(!promeds.is_ready());
    assert!(matches!(promeds.estimate(), Err(Error::NotReady(_))));
    promeds.set_quality_scores(vec![1.0, 2.0, 3.0]).unwrap();
    assert!(promeds.estimate().is_ok());
}

#[test]
fn test_degenerate_data_fails_after_max_iterations() {
    // Every subset repeats the same x: all fits are singular.
    let evaluations = vec![
        PolynomialEvaluation::direct(1.0, 1.0),
        PolynomialEvaluation::direct(1.0, 2.0),
        PolynomialEvaluation::direct(1.0, 3.0),
    ];
    let mut estimator = RobustPolynomialEstimator::new(RobustEstimatorMethod::Msac)
        .with_evaluations(evaluations)
        .unwrap()
        .with_seed(1);
    estimator.set_max_iterations(20).unwrap();
    assert_eq!(
        estimator.estimate(),
        Err(Error::RobustEstimation { iterations: 20 })
    );
    assert!(estimator.inliers_data().is_none());
    assert!(!estimator.is_locked());
}

#[test]
fn test_estimate_polynomial_api() {
    let truth = Polynomial::new(vec![-1.0, 0.0, 2.0]).unwrap();
    let data = dataset(truth, 30, 2.0, 0.2, 31);
    let result = estimate_polynomial(
        RobustEstimatorMethod::Promeds,
        2,
        data.evaluations.clone(),
        Some(data.quality_scores.clone()),
        None,
        Some(31),
    )
    .unwrap();
    assert_coefficients(&result.model, &[-1.0, 0.0, 2.0], 1e-6);
    assert_eq!(result.inliers.len(), 24);
    assert_eq!(result.score.inlier_count, 24);
}

#[test]
fn test_linear_and_weighted_estimators_through_factory() {
    let truth = Polynomial::new(vec![1.0, 0.5, -0.25]).unwrap();
    let evaluations: Vec<_> = (0..10)
        .map(|i| {
            let x = i as f64 * 0.5;
            PolynomialEvaluation::direct(x, truth.evaluate(x))
        })
        .collect();

    let mut lmse = create_polynomial_estimator(PolynomialEstimatorType::Lmse);
    lmse.set_degree(2).unwrap();
    lmse.set_evaluations(evaluations.clone()).unwrap();
    assert_coefficients(&lmse.estimate().unwrap(), truth.coefficients(), 1e-9);

    let mut weighted = WeightedPolynomialEstimator::with_degree(2).unwrap();
    weighted
        .set_evaluations_and_weights(evaluations, (1..=10).map(f64::from).collect())
        .unwrap();
    assert_coefficients(&weighted.estimate().unwrap(), truth.coefficients(), 1e-9);
}

#[test]
fn test_polynomial_roots_and_extrema() {
    // (x - 1)(x - 2)(x + 3) = x^3 - 7x + 6
    let p = Polynomial::new(vec![6.0, -7.0, 0.0, 1.0]).unwrap();
    let roots = p.real_roots();
    assert_eq!(roots.len(), 3);
    for (root, expected) in roots.iter().zip([-3.0, 1.0, 2.0]) {
        assert_abs_diff_eq!(*root, expected, epsilon = 1e-8);
    }

    let minima = p.minima();
    let maxima = p.maxima();
    assert_eq!(minima.len(), 1);
    assert_eq!(maxima.len(), 1);
    let critical = (7.0f64 / 3.0).sqrt();
    assert_abs_diff_eq!(minima[0], critical, epsilon = 1e-8);
    assert_abs_diff_eq!(maxima[0], -critical, epsilon = 1e-8);
}
