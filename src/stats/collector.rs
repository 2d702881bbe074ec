//! Benchmark metrics collector
//!
//! One atomic counter and one [`LatencyHistogram`] per [`OperationKind`],
//! plus accumulators for backend-reported read amplification. A single
//! `Collector` is shared by reference (usually behind an `Arc`) between all
//! worker threads for the lifetime of a run.

use super::histogram::{HistogramSnapshot, LatencyHistogram};
use super::{AlignedCounter, OperationKind};
use crate::config::HistogramConfig;
use crate::output::text;
use crate::util::time::calculate_rate;
use crate::Result;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct OperationMetrics {
    count: AlignedCounter,
    latency: LatencyHistogram,
}

/// Collects and tracks benchmark metrics
///
/// All `record_*` methods take `&self` and are safe to call from any number
/// of threads. Counts and histogram entries only ever grow.
#[derive(Debug)]
pub struct Collector {
    operations: Vec<OperationMetrics>,
    read_amp_count: AlignedCounter,
    read_amp_sum: AlignedCounter,
    start: Instant,
}

impl Collector {
    /// Create a collector with the default histogram range (1ns to 60s, 2 digits)
    pub fn new() -> Self {
        let operations = OperationKind::ALL
            .iter()
            .map(|_| OperationMetrics {
                count: AlignedCounter::new(),
                latency: LatencyHistogram::new(),
            })
            .collect();
        Self::from_operations(operations)
    }

    /// Create a collector with configured histogram bounds
    pub fn with_config(config: &HistogramConfig) -> Result<Self> {
        let operations = OperationKind::ALL
            .iter()
            .map(|_| {
                Ok(OperationMetrics {
                    count: AlignedCounter::new(),
                    latency: LatencyHistogram::with_bounds(
                        config.lowest,
                        config.highest,
                        config.significant_digits,
                    )?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_operations(operations))
    }

    fn from_operations(operations: Vec<OperationMetrics>) -> Self {
        Self {
            operations,
            read_amp_count: AlignedCounter::new(),
            read_amp_sum: AlignedCounter::new(),
            start: Instant::now(),
        }
    }

    #[inline]
    fn metrics(&self, kind: OperationKind) -> &OperationMetrics {
        &self.operations[kind.index()]
    }

    /// Record one operation of the given kind
    #[inline]
    pub fn record(&self, kind: OperationKind, latency: Duration) {
        let metrics = self.metrics(kind);
        metrics.count.add(1);
        metrics.latency.record(latency);
    }

    pub fn record_read(&self, latency: Duration) {
        self.record(OperationKind::Read, latency);
    }

    /// Record a read together with the number of physical reads it needed
    ///
    /// Non-positive amplification means the backend did not report one; the
    /// latency is still recorded.
    pub fn record_read_with_amplification(&self, latency: Duration, amplification: i64) {
        self.record_read(latency);
        if amplification > 0 {
            self.read_amp_count.add(1);
            self.read_amp_sum.add(amplification as u64);
        }
    }

    pub fn record_update(&self, latency: Duration) {
        self.record(OperationKind::Update, latency);
    }

    pub fn record_insert(&self, latency: Duration) {
        self.record(OperationKind::Insert, latency);
    }

    pub fn record_scan(&self, latency: Duration) {
        self.record(OperationKind::Scan, latency);
    }

    pub fn record_delete(&self, latency: Duration) {
        self.record(OperationKind::Delete, latency);
    }

    /// Operations recorded for one kind
    pub fn count(&self, kind: OperationKind) -> u64 {
        self.metrics(kind).count.get()
    }

    /// Operations recorded across all kinds
    pub fn total_ops(&self) -> u64 {
        OperationKind::ALL.iter().map(|&kind| self.count(kind)).sum()
    }

    pub fn histogram(&self, kind: OperationKind) -> &LatencyHistogram {
        &self.metrics(kind).latency
    }

    /// Snapshot of one kind's latency histogram
    pub fn snapshot(&self, kind: OperationKind) -> HistogramSnapshot {
        self.histogram(kind).snapshot()
    }

    /// Number of reads that reported an amplification factor
    pub fn read_amp_count(&self) -> u64 {
        self.read_amp_count.get()
    }

    /// Sum of all reported amplification factors
    pub fn read_amp_sum(&self) -> u64 {
        self.read_amp_sum.get()
    }

    /// Average read amplification, if any read reported one
    pub fn read_amplification(&self) -> Option<f64> {
        let count = self.read_amp_count();
        if count == 0 {
            return None;
        }
        Some(self.read_amp_sum() as f64 / count as f64)
    }

    /// Time since the collector was created
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Progress line for `completed_ops` operations so far
    pub fn render_progress(&self, completed_ops: u64) -> String {
        let throughput = calculate_rate(completed_ops, self.elapsed());
        format!("Progress: {} ops, {:.1} ops/sec", completed_ops, throughput)
    }

    /// Print current progress
    ///
    /// Reads are a snapshot of the counters, safe alongside active recorders.
    pub fn print_progress(&self, completed_ops: u64) {
        println!("{}", self.render_progress(completed_ops));
    }

    /// Summary table as text
    pub fn render_summary(&self, backend_metrics: Option<&str>) -> String {
        text::render_summary(self, self.elapsed(), backend_metrics)
    }

    /// Print a summary of all metrics
    ///
    /// `backend_metrics` is the backend's textual metrics dump, printed
    /// verbatim after the aggregate section when present.
    pub fn print_summary(&self, backend_metrics: Option<&str>) {
        print!("{}", self.render_summary(backend_metrics));
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}
