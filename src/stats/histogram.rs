//! Latency histogram
//!
//! A lock-free, fixed relative-error histogram for recording operation
//! latencies from many threads at once.
//!
//! # Layout
//!
//! Buckets follow the HdrHistogram log-linear layout: each power-of-two range
//! is split into `2 * 10^significant_digits` rounded up to a power of two
//! linear sub-buckets, so every recorded value keeps its leading significant
//! digits. Because the layout matches HdrHistogram exactly, a snapshot can be
//! materialised into an [`hdrhistogram::Histogram`] without re-bucketing and
//! all quantile queries reuse its implementation.
//!
//! # Concurrency
//!
//! Recording is a single relaxed `fetch_add` on the bucket plus one on the
//! total count. Queries take a snapshot; a snapshot taken after all writers
//! have stopped is exact.
//!
//! # Example
//!
//! ```
//! use kvpulse::stats::histogram::LatencyHistogram;
//! use std::time::Duration;
//!
//! let hist = LatencyHistogram::new();
//! hist.record(Duration::from_micros(100));
//! hist.record(Duration::from_micros(200));
//!
//! let snapshot = hist.snapshot();
//! assert_eq!(snapshot.len(), 2);
//! assert!(snapshot.max() >= Duration::from_micros(199));
//! ```

use crate::Result;
use anyhow::{anyhow, bail};
use hdrhistogram::Histogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Smallest trackable latency in nanoseconds
pub const LOWEST_TRACKABLE_NANOS: u64 = 1;

/// Largest trackable latency in nanoseconds (60 seconds)
pub const HIGHEST_TRACKABLE_NANOS: u64 = 60_000_000_000;

/// Decimal digits of precision kept for every value
pub const SIGNIFICANT_DIGITS: u8 = 2;

/// Bucket geometry shared by the atomic counts and the HdrHistogram snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BucketLayout {
    lowest: u64,
    highest: u64,
    unit_magnitude: u32,
    sub_bucket_half_count_magnitude: u32,
    sub_bucket_half_count: usize,
    sub_bucket_mask: u64,
    leading_zero_count_base: u32,
    counts_len: usize,
}

impl BucketLayout {
    fn new(lowest: u64, highest: u64, significant_digits: u8) -> Result<Self> {
        if lowest == 0 {
            bail!("Lowest trackable value must be at least 1");
        }
        if highest < lowest.saturating_mul(2) {
            bail!(
                "Highest trackable value ({}) must be at least twice the lowest ({})",
                highest,
                lowest
            );
        }
        if significant_digits > 5 {
            bail!("Significant digits must be between 0 and 5, got {}", significant_digits);
        }

        let single_unit_resolution = 2 * 10u64.pow(u32::from(significant_digits));
        // ceil(log2(single_unit_resolution))
        let sub_bucket_count_magnitude = 64 - (single_unit_resolution - 1).leading_zeros();
        let sub_bucket_half_count_magnitude = sub_bucket_count_magnitude.max(1) - 1;
        let unit_magnitude = 63 - lowest.leading_zeros();

        if unit_magnitude + sub_bucket_half_count_magnitude > 61 {
            bail!("Cannot represent {} significant digits above {}", significant_digits, lowest);
        }

        let sub_bucket_count = 1u64 << (sub_bucket_half_count_magnitude + 1);
        let sub_bucket_half_count = (sub_bucket_count / 2) as usize;
        let sub_bucket_mask = (sub_bucket_count - 1) << unit_magnitude;

        let mut smallest_untrackable = sub_bucket_count << unit_magnitude;
        let mut buckets_needed = 1usize;
        while smallest_untrackable <= highest {
            if smallest_untrackable > u64::MAX / 2 {
                buckets_needed += 1;
                break;
            }
            smallest_untrackable <<= 1;
            buckets_needed += 1;
        }

        Ok(Self {
            lowest,
            highest,
            unit_magnitude,
            sub_bucket_half_count_magnitude,
            sub_bucket_half_count,
            sub_bucket_mask,
            leading_zero_count_base: 64 - unit_magnitude - sub_bucket_half_count_magnitude - 1,
            counts_len: (buckets_needed + 1) * sub_bucket_half_count,
        })
    }

    #[inline]
    fn index_of(&self, value: u64) -> usize {
        let bucket = self.leading_zero_count_base - (value | self.sub_bucket_mask).leading_zeros();
        let sub_bucket = (value >> (bucket + self.unit_magnitude)) as usize;
        ((bucket as usize + 1) << self.sub_bucket_half_count_magnitude) + sub_bucket
            - self.sub_bucket_half_count
    }

    /// Lowest value that maps to `index`
    fn value_from_index(&self, index: usize) -> u64 {
        let mut bucket = (index >> self.sub_bucket_half_count_magnitude) as i64 - 1;
        let mut sub_bucket = (index & (self.sub_bucket_half_count - 1)) + self.sub_bucket_half_count;
        if bucket < 0 {
            sub_bucket -= self.sub_bucket_half_count;
            bucket = 0;
        }
        (sub_bucket as u64) << (bucket as u32 + self.unit_magnitude)
    }
}

/// Concurrent latency histogram
///
/// Values are recorded in nanoseconds. Anything outside the trackable range
/// is clamped to the nearest bound instead of rejected, so a single extreme
/// outlier never interrupts a run; [`LatencyHistogram::clamped`] reports how
/// many values needed it.
#[derive(Debug)]
pub struct LatencyHistogram {
    layout: BucketLayout,
    counts: Box<[AtomicU64]>,
    total: AtomicU64,
    clamped: AtomicU64,
    template: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create a histogram tracking 1ns to 60s with 2 significant digits
    pub fn new() -> Self {
        Self::with_bounds(LOWEST_TRACKABLE_NANOS, HIGHEST_TRACKABLE_NANOS, SIGNIFICANT_DIGITS)
            .expect("Failed to create histogram with valid bounds")
    }

    /// Create a histogram with explicit bounds (in nanoseconds)
    pub fn with_bounds(lowest: u64, highest: u64, significant_digits: u8) -> Result<Self> {
        let layout = BucketLayout::new(lowest, highest, significant_digits)?;
        let template = Histogram::new_with_bounds(lowest, highest, significant_digits)
            .map_err(|e| anyhow!("Failed to create histogram: {:?}", e))?;
        let counts = (0..layout.counts_len).map(|_| AtomicU64::new(0)).collect();

        Ok(Self {
            layout,
            counts,
            total: AtomicU64::new(0),
            clamped: AtomicU64::new(0),
            template,
        })
    }

    /// Record a latency sample
    ///
    /// This is the hot path: two relaxed atomic increments, no locks.
    #[inline]
    pub fn record(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        let value = nanos.clamp(self.layout.lowest, self.layout.highest);
        if value != nanos {
            self.clamped.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(slot) = self.counts.get(self.layout.index_of(value)) {
            slot.fetch_add(1, Ordering::Relaxed);
            self.total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of recorded samples
    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// Number of samples that fell outside the trackable range
    pub fn clamped(&self) -> u64 {
        self.clamped.load(Ordering::Relaxed)
    }

    /// Copy the current counts into an HdrHistogram for querying
    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut histogram = Histogram::new_from(&self.template);
        for (index, slot) in self.counts.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                // The layout matches and values stay in range, so this cannot fail
                let _ = histogram.record_n(self.layout.value_from_index(index), count);
            }
        }
        HistogramSnapshot { histogram }
    }

    /// Mean latency
    pub fn mean(&self) -> Duration {
        self.snapshot().mean()
    }

    /// Latency at the given percentile (0.0 - 100.0)
    pub fn value_at_percentile(&self, percentile: f64) -> Duration {
        self.snapshot().value_at_percentile(percentile)
    }

    /// Maximum recorded latency
    pub fn max(&self) -> Duration {
        self.snapshot().max()
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time, read-only copy of a [`LatencyHistogram`]
///
/// All queries return [`Duration::ZERO`] for an empty snapshot.
#[derive(Debug, Clone)]
pub struct HistogramSnapshot {
    histogram: Histogram<u64>,
}

impl HistogramSnapshot {
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }

    pub fn mean(&self) -> Duration {
        if self.is_empty() {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.histogram.mean() as u64)
    }

    pub fn min(&self) -> Duration {
        if self.is_empty() {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.histogram.min())
    }

    pub fn max(&self) -> Duration {
        if self.is_empty() {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.histogram.max())
    }

    pub fn value_at_percentile(&self, percentile: f64) -> Duration {
        if self.is_empty() {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.histogram.value_at_percentile(percentile.clamp(0.0, 100.0)))
    }

    /// Merge another snapshot into this one
    ///
    /// Used to build the aggregate row across operation kinds.
    pub fn merge(&mut self, other: &HistogramSnapshot) -> Result<()> {
        self.histogram
            .add(&other.histogram)
            .map_err(|e| anyhow!("Failed to merge histograms: {:?}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_histogram() {
        let hist = LatencyHistogram::new();
        assert_eq!(hist.total_count(), 0);
        assert!(hist.is_empty());
        assert_eq!(hist.mean(), Duration::ZERO);
        assert_eq!(hist.max(), Duration::ZERO);
    }

    #[test]
    fn test_layout_matches_hdrhistogram() {
        let layout = BucketLayout::new(1, HIGHEST_TRACKABLE_NANOS, 2).unwrap();
        assert_eq!(layout.sub_bucket_half_count, 128);
        assert_eq!(layout.counts_len, 3840);

        for value in [1u64, 2, 127, 128, 255, 256, 257, 1_000, 65_535, 1_000_000, 59_999_999_999] {
            let index = layout.index_of(value);
            let lowest = layout.value_from_index(index);
            assert!(lowest <= value, "value {} mapped below lowest {}", value, lowest);
            assert_eq!(layout.index_of(lowest), index);
            assert!(index < layout.counts_len);
        }
    }

    #[test]
    fn test_snapshot_agrees_with_direct_recording() {
        let hist = LatencyHistogram::new();
        let mut direct = Histogram::<u64>::new_with_bounds(1, HIGHEST_TRACKABLE_NANOS, 2).unwrap();

        for i in 1..=1000u64 {
            let nanos = i * 997;
            hist.record(Duration::from_nanos(nanos));
            direct.record(nanos).unwrap();
        }

        let snapshot = hist.snapshot();
        assert_eq!(snapshot.len(), direct.len());
        for p in [50.0, 90.0, 95.0, 99.0, 100.0] {
            assert_eq!(
                snapshot.value_at_percentile(p).as_nanos() as u64,
                direct.value_at_percentile(p)
            );
        }
        assert_eq!(snapshot.max().as_nanos() as u64, direct.max());
    }

    #[test]
    fn test_percentile() {
        let hist = LatencyHistogram::new();
        for i in 1..=100 {
            hist.record(Duration::from_micros(i * 10));
        }

        let p50 = hist.value_at_percentile(50.0);
        let p99 = hist.value_at_percentile(99.0);

        // 2 significant digits: within ~1% of the true value
        assert!(p50.as_micros() >= 490 && p50.as_micros() <= 510);
        assert!(p99.as_micros() >= 980 && p99.as_micros() <= 1000);
    }

    #[test]
    fn test_mean_and_max() {
        let hist = LatencyHistogram::new();
        hist.record(Duration::from_micros(100));
        hist.record(Duration::from_micros(200));
        hist.record(Duration::from_micros(300));

        let mean = hist.mean();
        assert!(mean.as_micros() >= 198 && mean.as_micros() <= 202);
        let max = hist.max();
        assert!(max.as_micros() >= 299 && max.as_micros() <= 302);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let hist = LatencyHistogram::new();
        hist.record(Duration::from_secs(3600));
        hist.record(Duration::ZERO);
        hist.record(Duration::from_millis(1));

        assert_eq!(hist.total_count(), 3);
        assert_eq!(hist.clamped(), 2);
        let max = hist.max();
        assert!(max >= Duration::from_secs(59) && max <= Duration::from_secs(61));
    }

    #[test]
    fn test_concurrent_record() {
        let hist = Arc::new(LatencyHistogram::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let hist = Arc::clone(&hist);
                thread::spawn(move || {
                    for i in 0..10_000u64 {
                        hist.record(Duration::from_nanos(1 + t * 1_000 + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(hist.total_count(), 80_000);
        assert_eq!(hist.snapshot().len(), 80_000);
    }

    #[test]
    fn test_merge_snapshots() {
        let a = LatencyHistogram::new();
        a.record(Duration::from_micros(100));
        let b = LatencyHistogram::new();
        b.record(Duration::from_micros(300));
        b.record(Duration::from_micros(500));

        let mut merged = a.snapshot();
        merged.merge(&b.snapshot()).unwrap();
        assert_eq!(merged.len(), 3);
        assert!(merged.min().as_micros() >= 99 && merged.min().as_micros() <= 101);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(LatencyHistogram::with_bounds(0, 1000, 2).is_err());
        assert!(LatencyHistogram::with_bounds(10, 15, 2).is_err());
        assert!(LatencyHistogram::with_bounds(1, 1000, 6).is_err());
        assert!(LatencyHistogram::with_bounds(1_000, 10_000_000, 3).is_ok());
    }
}
