//! Statistics collection
//!
//! Lock-free latency collection and post-run statistical analysis for
//! key-value store operations.
//!
//! This module provides the pieces that sit between the workload driver and
//! the storage backend:
//!
//! - **Collector**: per-operation atomic counters and latency histograms
//! - **TrackedDb**: a [`Db`](crate::db::Db) decorator feeding a `Collector`
//! - **SampleStore**: ordered raw samples per operation label
//! - **OperationTracker**: a `Db` decorator feeding a `SampleStore`
//! - **Analysis**: descriptive statistics and bootstrap confidence intervals
//! - **Progress**: periodic throughput reporting while a run is in flight
//!
//! # Example
//!
//! ```
//! use kvpulse::stats::{Collector, OperationKind};
//! use std::time::Duration;
//!
//! let collector = Collector::new();
//! collector.record_read(Duration::from_micros(100));
//! collector.record_update(Duration::from_micros(150));
//!
//! assert_eq!(collector.count(OperationKind::Read), 1);
//! assert_eq!(collector.total_ops(), 2);
//! ```

pub mod analysis;
pub mod collector;
pub mod histogram;
pub mod progress;
pub mod samples;
pub mod tracked;
pub mod tracker;

pub use analysis::{ConfidenceInterval, OperationReport, Statistics, StatisticsEngine};
pub use collector::Collector;
pub use samples::{Sample, SampleStore};
pub use tracked::TrackedDb;
pub use tracker::{OperationTiming, OperationTracker};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Storage operation kinds tracked by the harness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Read,
    Update,
    Insert,
    Scan,
    Delete,
}

impl OperationKind {
    /// All kinds in report order
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Read,
        OperationKind::Update,
        OperationKind::Insert,
        OperationKind::Scan,
        OperationKind::Delete,
    ];

    /// Dense index for per-kind arrays
    #[inline]
    pub fn index(self) -> usize {
        match self {
            OperationKind::Read => 0,
            OperationKind::Update => 1,
            OperationKind::Insert => 2,
            OperationKind::Scan => 3,
            OperationKind::Delete => 4,
        }
    }

    /// Lowercase name used in the collector summary
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Update => "update",
            OperationKind::Insert => "insert",
            OperationKind::Scan => "scan",
            OperationKind::Delete => "delete",
        }
    }

    /// Uppercase label used for sample series and measurement rows
    pub fn label(self) -> &'static str {
        match self {
            OperationKind::Read => "READ",
            OperationKind::Update => "UPDATE",
            OperationKind::Insert => "INSERT",
            OperationKind::Scan => "SCAN",
            OperationKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cache-line aligned atomic counter to prevent false sharing
///
/// Every worker thread bumps the same per-operation counters, so each one
/// gets its own 64-byte cache line.
///
/// ```text
/// [value: 8 bytes][padding: 56 bytes] = 64 bytes total
/// ```
#[repr(align(64))]
#[derive(Debug)]
pub struct AlignedCounter {
    value: AtomicU64,
    _padding: [u8; 56],
}

impl AlignedCounter {
    /// Create a new counter with initial value 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
            _padding: [0; 56],
        }
    }

    /// Increment the counter by the specified amount
    ///
    /// Uses `Ordering::Relaxed`: counters are independent and only read as
    /// snapshots.
    #[inline]
    pub fn add(&self, val: u64) {
        self.value.fetch_add(val, Ordering::Relaxed);
    }

    /// Get the current value of the counter
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for AlignedCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_counter_size() {
        assert_eq!(std::mem::size_of::<AlignedCounter>(), 64);
        assert_eq!(std::mem::align_of::<AlignedCounter>(), 64);
    }

    #[test]
    fn test_aligned_counter_operations() {
        let counter = AlignedCounter::new();
        assert_eq!(counter.get(), 0);
        counter.add(5);
        counter.add(10);
        assert_eq!(counter.get(), 15);
    }

    #[test]
    fn test_operation_kind_indices_are_dense() {
        for (i, kind) in OperationKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_operation_kind_names() {
        assert_eq!(OperationKind::Read.name(), "read");
        assert_eq!(OperationKind::Scan.label(), "SCAN");
        assert_eq!(OperationKind::Delete.to_string(), "delete");
    }
}
