//! PROSAC sampler: progressively grows the subset of high-priority evaluations.

use crate::core::Sampler;
use crate::utils::UniformRandomGenerator;

/// Indices of `quality_scores` sorted by descending score. Equal scores keep
/// their original order.
pub fn quality_order(quality_scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..quality_scores.len()).collect();
    order.sort_by(|&a, &b| quality_scores[b].total_cmp(&quality_scores[a]));
    order
}

/// PROSAC sampler: progressively grows the subset of high-priority points.
///
/// Sample `t` contains the evaluation ranked `n - 1` plus `m - 1` evaluations
/// drawn from the `n - 1` better ranked ones, where the prefix size `n` grows
/// along the growth function `T'_n`. After `ransac_convergence_iterations`
/// samples the sampler behaves like a uniform one.
pub struct ProsacSampler {
    rng: UniformRandomGenerator,
    /// `order[k]` is the evaluation ranked `k`.
    order: Vec<usize>,
    growth_function: Vec<usize>,
    sample_size: Option<usize>,
    ransac_convergence_iterations: usize,
    kth_sample_number: usize,
    subset_size: usize,
}

impl ProsacSampler {
    /// Sampler over evaluations ranked by `quality_scores` (larger is better).
    pub fn from_quality_scores(
        quality_scores: &[f64],
        seed: Option<u64>,
        ransac_convergence_iterations: usize,
    ) -> Self {
        Self::from_order(
            quality_order(quality_scores),
            seed,
            ransac_convergence_iterations,
        )
    }

    /// Sampler over an explicit ranking (`order[0]` is the best evaluation).
    pub fn from_order(
        order: Vec<usize>,
        seed: Option<u64>,
        ransac_convergence_iterations: usize,
    ) -> Self {
        Self {
            rng: UniformRandomGenerator::from_optional_seed(seed),
            order,
            growth_function: Vec::new(),
            sample_size: None,
            ransac_convergence_iterations: ransac_convergence_iterations.max(1),
            kth_sample_number: 0,
            subset_size: 0,
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Current prefix size `n`.
    pub fn subset_size(&self) -> usize {
        self.subset_size
    }

    fn initialize(&mut self, sample_size: usize) {
        let point_number = self.order.len();
        self.sample_size = Some(sample_size);
        self.growth_function.clear();
        self.growth_function.resize(point_number, 0);

        // T_m: expected number of samples among the top m evaluations.
        let mut t_n = self.ransac_convergence_iterations as f64;
        for i in 0..sample_size {
            t_n *= (sample_size - i) as f64 / (point_number - i) as f64;
        }

        let mut t_n_prime: usize = 1;
        for i in 0..point_number {
            if i < sample_size {
                self.growth_function[i] = t_n_prime;
                continue;
            }
            let t_n_plus1 = (i + 1) as f64 * t_n / (i + 1 - sample_size) as f64;
            self.growth_function[i] = t_n_prime + ((t_n_plus1 - t_n).ceil() as usize);
            t_n = t_n_plus1;
            t_n_prime = self.growth_function[i];
        }

        self.kth_sample_number = 0;
        self.subset_size = sample_size;
    }

    /// Restart the growth schedule from the top `m` evaluations.
    pub fn reset(&mut self) {
        if let Some(sample_size) = self.sample_size {
            self.kth_sample_number = 0;
            self.subset_size = sample_size;
        }
    }
}

impl Sampler for ProsacSampler {
    fn sample(
        &mut self,
        point_number: usize,
        sample_size: usize,
        out_indices: &mut [usize],
    ) -> bool {
        if sample_size == 0
            || point_number != self.order.len()
            || sample_size > point_number
            || out_indices.len() < sample_size
        {
            return false;
        }
        if self.sample_size != Some(sample_size) {
            self.initialize(sample_size);
        }

        self.kth_sample_number += 1;
        let out = &mut out_indices[..sample_size];

        if self.kth_sample_number > self.growth_function[self.subset_size - 1]
            && self.subset_size < point_number
        {
            self.subset_size += 1;
        }

        let exhausted = self.kth_sample_number > self.ransac_convergence_iterations
            || self.kth_sample_number > self.growth_function[self.subset_size - 1];
        if exhausted {
            let upper = if self.kth_sample_number > self.ransac_convergence_iterations {
                point_number
            } else {
                self.subset_size
            };
            self.rng.gen_unique(out, 0, upper - 1);
        } else {
            let last = sample_size - 1;
            if last > 0 {
                self.rng.gen_unique(&mut out[..last], 0, self.subset_size - 2);
            }
            out[last] = self.subset_size - 1;
        }

        for position in out.iter_mut() {
            *position = self.order[*position];
        }
        true
    }
}
