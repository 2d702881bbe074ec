//! Post-run statistical analysis
//!
//! Descriptive statistics and percentile-bootstrap confidence intervals over
//! one operation's raw samples, in the style of criterion.rs reports.
//!
//! All times are expressed in microseconds. Nothing here is cached: every
//! report recomputes from the samples it is given.
//!
//! # Statistics
//!
//! - **Mean / StdDev**: arithmetic mean and population standard deviation
//! - **Median / MAD**: median and raw (unscaled) median absolute deviation
//! - **Throughput**: `1 / mean` in operations per second
//! - **R²**: squared correlation of elapsed time against sample index,
//!   a measure of drift over the run
//!
//! # Example
//!
//! ```
//! use kvpulse::stats::analysis::compute_statistics;
//! use kvpulse::stats::Sample;
//! use std::time::Duration;
//!
//! let samples: Vec<Sample> = (1..=3)
//!     .map(|i| Sample::new(i, Duration::from_micros(1000)))
//!     .collect();
//!
//! let stats = compute_statistics(&samples);
//! assert_eq!(stats.mean, 1000.0);
//! assert_eq!(stats.std_dev, 0.0);
//! assert_eq!(stats.throughput, 1000.0);
//! ```

use super::Sample;
use crate::config::BootstrapConfig;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Descriptive statistics for one operation (times in microseconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    /// Median absolute deviation
    pub mad: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
    /// Operations per second
    pub throughput: f64,
    /// R² of elapsed time against sample index
    pub r2: f64,
}

/// Confidence interval around a point estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower_bound: f64,
    pub estimate: f64,
    pub upper_bound: f64,
}

impl ConfidenceInterval {
    /// Zero-width interval at `value`
    pub fn point(value: f64) -> Self {
        Self {
            lower_bound: value,
            estimate: value,
            upper_bound: value,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }
}

/// Confidence intervals for every reported statistic
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticIntervals {
    pub throughput: ConfidenceInterval,
    pub r2: ConfidenceInterval,
    pub mean: ConfidenceInterval,
    pub std_dev: ConfidenceInterval,
    pub median: ConfidenceInterval,
    pub mad: ConfidenceInterval,
}

/// Full analysis of one operation label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReport {
    pub operation: String,
    pub statistics: Statistics,
    pub intervals: StatisticIntervals,
}

/// Value statistics that are bootstrapped by resampling elapsed times alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Estimator {
    Throughput,
    Mean,
    StdDev,
    Median,
    Mad,
}

impl Estimator {
    const ALL: [Estimator; 5] = [
        Estimator::Throughput,
        Estimator::Mean,
        Estimator::StdDev,
        Estimator::Median,
        Estimator::Mad,
    ];

    fn apply(self, values: &[f64]) -> f64 {
        match self {
            Estimator::Throughput => throughput(values),
            Estimator::Mean => mean(values),
            Estimator::StdDev => std_dev(values),
            Estimator::Median => median(values),
            Estimator::Mad => mad(values),
        }
    }

    /// RNG stream, distinct per estimator so parallel runs stay reproducible
    fn stream(self) -> u32 {
        match self {
            Estimator::Throughput => 0,
            Estimator::Mean => 1,
            Estimator::StdDev => 2,
            Estimator::Median => 3,
            Estimator::Mad => 4,
        }
    }
}

/// Elapsed times in microseconds, in sample order
pub fn elapsed_micros(samples: &[Sample]) -> Vec<f64> {
    samples.iter().map(Sample::elapsed_micros).collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Median of an already sorted slice
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Median absolute deviation around `median`, unscaled
pub fn mad_of_sorted(sorted: &[f64], median: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mut deviations: Vec<f64> = sorted.iter().map(|v| (v - median).abs()).collect();
    sort_f64(&mut deviations);
    median_of_sorted(&deviations)
}

pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sort_f64(&mut sorted);
    median_of_sorted(&sorted)
}

pub fn mad(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sort_f64(&mut sorted);
    let median = median_of_sorted(&sorted);
    mad_of_sorted(&sorted, median)
}

/// Operations per second implied by the mean latency
///
/// This is the inverse of the mean, not count over wall time. A zero mean
/// yields 0.0.
pub fn throughput(values: &[f64]) -> f64 {
    let mean_seconds = mean(values) / 1_000_000.0;
    if mean_seconds > 0.0 {
        1.0 / mean_seconds
    } else {
        0.0
    }
}

/// R² of a least-squares fit of elapsed time against `sequence_index`
///
/// 1.0 with fewer than two samples or no variance in elapsed time; 0.0 when
/// every sample has the same index.
pub fn r_squared(samples: &[Sample]) -> f64 {
    if samples.len() < 2 {
        return 1.0;
    }

    let n = samples.len() as f64;
    let mean_x = samples.iter().map(|s| s.sequence_index as f64).sum::<f64>() / n;
    let mean_y = samples.iter().map(Sample::elapsed_micros).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for sample in samples {
        let dx = sample.sequence_index as f64 - mean_x;
        let dy = sample.elapsed_micros() - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx == 0.0 {
        return 0.0;
    }
    if syy == 0.0 {
        return 1.0;
    }

    let correlation = sxy / (sxx * syy).sqrt();
    (correlation * correlation).clamp(0.0, 1.0)
}

/// Descriptive statistics over one operation's samples
///
/// An empty slice yields all-zero statistics.
pub fn compute_statistics(samples: &[Sample]) -> Statistics {
    if samples.is_empty() {
        return Statistics::default();
    }

    let times = elapsed_micros(samples);
    let mut sorted = times.clone();
    sort_f64(&mut sorted);

    let median = median_of_sorted(&sorted);
    Statistics {
        mean: mean(&times),
        std_dev: std_dev(&times),
        median,
        mad: mad_of_sorted(&sorted, median),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        count: samples.len() as u64,
        throughput: throughput(&times),
        r2: r_squared(samples),
    }
}

/// Percentile-bootstrap confidence interval for `statistic`
///
/// Draws `resamples` resamples (with replacement, same length as the input)
/// of the elapsed times, evaluates `statistic` on each and takes the
/// `α/2` and `1 - α/2` percentiles of the sorted results, `α = 1 -
/// confidence`. The estimate is `statistic` on the original sample; bounds
/// are widened to include it if needed.
pub fn bootstrap_confidence_interval<F, R>(
    samples: &[Sample],
    statistic: F,
    resamples: usize,
    confidence: f64,
    rng: &mut R,
) -> ConfidenceInterval
where
    F: Fn(&[f64]) -> f64,
    R: Rng + ?Sized,
{
    if samples.is_empty() {
        return ConfidenceInterval::default();
    }

    let times = elapsed_micros(samples);
    let estimate = statistic(&times);
    if resamples == 0 {
        return ConfidenceInterval::point(estimate);
    }

    let mut resample = vec![0.0; times.len()];
    let mut distribution = Vec::with_capacity(resamples);
    for _ in 0..resamples {
        for slot in resample.iter_mut() {
            *slot = times[rng.gen_range(0..times.len())];
        }
        distribution.push(statistic(&resample));
    }

    interval_from_distribution(distribution, estimate, confidence)
}

/// Bootstrap interval for R², resampling whole `(index, elapsed)` pairs
///
/// Returns a zero-width interval at the point estimate when there are fewer
/// than `min_samples` samples.
pub fn bootstrap_r_squared<R>(
    samples: &[Sample],
    resamples: usize,
    min_samples: usize,
    confidence: f64,
    rng: &mut R,
) -> ConfidenceInterval
where
    R: Rng + ?Sized,
{
    let estimate = r_squared(samples);
    if samples.len() < min_samples || samples.is_empty() || resamples == 0 {
        return ConfidenceInterval::point(estimate);
    }

    let mut resample = samples.to_vec();
    let mut distribution = Vec::with_capacity(resamples);
    for _ in 0..resamples {
        for slot in resample.iter_mut() {
            *slot = samples[rng.gen_range(0..samples.len())];
        }
        distribution.push(r_squared(&resample));
    }

    interval_from_distribution(distribution, estimate, confidence)
}

fn interval_from_distribution(
    mut distribution: Vec<f64>,
    estimate: f64,
    confidence: f64,
) -> ConfidenceInterval {
    sort_f64(&mut distribution);

    let n = distribution.len();
    let alpha = 1.0 - confidence;
    let lower_idx = ((n as f64 * (alpha / 2.0)) as usize).min(n - 1);
    let upper_idx = ((n as f64 * (1.0 - alpha / 2.0)) as usize).min(n - 1);

    ConfidenceInterval {
        lower_bound: distribution[lower_idx].min(estimate),
        estimate,
        upper_bound: distribution[upper_idx].max(estimate),
    }
}

fn sort_f64(values: &mut [f64]) {
    values.sort_unstable_by(f64::total_cmp);
}

/// Computes reports from sample sequences with a fixed bootstrap setup
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    config: BootstrapConfig,
}

impl StatisticsEngine {
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// RNG for one stream: seeded and jumped when a seed is configured
    fn rng(&self, stream: u32) -> Xoshiro256PlusPlus {
        match self.config.seed {
            Some(seed) => {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
                for _ in 0..stream {
                    rng.jump();
                }
                rng
            }
            None => Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Statistics and confidence intervals for one operation
    ///
    /// The five value statistics are bootstrapped in parallel.
    pub fn analyze(&self, operation: &str, samples: &[Sample]) -> OperationReport {
        let statistics = compute_statistics(samples);
        let config = &self.config;

        let value_intervals: Vec<ConfidenceInterval> = Estimator::ALL[..]
            .par_iter()
            .map(|&estimator| {
                let mut rng = self.rng(estimator.stream());
                bootstrap_confidence_interval(
                    samples,
                    |values| estimator.apply(values),
                    config.resamples,
                    config.confidence,
                    &mut rng,
                )
            })
            .collect();

        let mut r2_rng = self.rng(Estimator::ALL.len() as u32);
        let r2 = bootstrap_r_squared(
            samples,
            config.r2_resamples,
            config.min_r2_samples,
            config.confidence,
            &mut r2_rng,
        );

        OperationReport {
            operation: operation.to_owned(),
            statistics,
            intervals: StatisticIntervals {
                throughput: value_intervals[0],
                r2,
                mean: value_intervals[1],
                std_dev: value_intervals[2],
                median: value_intervals[3],
                mad: value_intervals[4],
            },
        }
    }

    /// Reports for every `(label, samples)` pair with at least one sample
    pub fn analyze_all<'a, I>(&self, series: I) -> Vec<OperationReport>
    where
        I: IntoIterator<Item = (&'a str, &'a [Sample])>,
    {
        series
            .into_iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(label, samples)| self.analyze(label, samples))
            .collect()
    }
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new(BootstrapConfig::default())
    }
}
