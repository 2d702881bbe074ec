//! KVPulse - latency collection and statistical analysis for key-value benchmarks
//!
//! KVPulse sits between a YCSB-style workload driver and a storage backend,
//! records every operation's latency while the run is in flight, and turns
//! the recorded data into reports once the run has finished.
//!
//! # Architecture
//!
//! - **Lock-free collection**: per-operation atomic counters and log-linear
//!   latency histograms, safe under any number of recording threads
//! - **Raw samples**: every `(sequence index, elapsed)` pair per operation
//!   for time-ordered series and resampling
//! - **Decorators**: [`TrackedDb`](stats::TrackedDb) and
//!   [`OperationTracker`](stats::OperationTracker) wrap any [`Db`](db::Db)
//!   and stack on top of each other
//! - **Statistics**: mean, standard deviation, median, MAD, throughput and R²
//!   with percentile-bootstrap confidence intervals
//! - **Reports**: summary and statistics text, a measurement table, CSV
//!   series and JSON export
//!
//! # Example
//!
//! ```
//! use kvpulse::config::BootstrapConfig;
//! use kvpulse::db::{memory::MemoryDb, Db, FieldMap};
//! use kvpulse::stats::{Collector, OperationTracker, TrackedDb};
//! use std::sync::Arc;
//!
//! let collector = Arc::new(Collector::new());
//! let bootstrap = BootstrapConfig { resamples: 100, seed: Some(1), ..BootstrapConfig::default() };
//! let db = OperationTracker::with_bootstrap(
//!     TrackedDb::new(MemoryDb::new(), Arc::clone(&collector)),
//!     bootstrap,
//! );
//!
//! db.insert("usertable", "user1", &FieldMap::new()).unwrap();
//! db.read("usertable", "user1", &[]).unwrap();
//!
//! assert_eq!(collector.total_ops(), 2);
//! assert_eq!(db.report_statistics().len(), 2);
//! ```

pub mod config;
pub mod db;
pub mod output;
pub mod stats;
pub mod util;

// Re-export commonly used types
pub use config::MetricsConfig;
pub use db::Db;
pub use stats::{Collector, OperationKind, OperationTracker, StatisticsEngine, TrackedDb};

/// Result type used throughout KVPulse
pub type Result<T> = anyhow::Result<T>;
