//! Concurrent recording through the stacked decorators
//!
//! Many threads drive `OperationTracker<TrackedDb<MemoryDb>>` at once; after
//! they join, every view of the run must agree.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use kvpulse::config::BootstrapConfig;
use kvpulse::db::memory::MemoryDb;
use kvpulse::db::{Db, FieldMap};
use kvpulse::output::report;
use kvpulse::stats::{Collector, OperationKind, OperationTracker, TrackedDb};

const THREADS: usize = 8;
const OPS_PER_THREAD: usize = 2_000;
const TABLE: &str = "usertable";

type Stack = OperationTracker<TrackedDb<MemoryDb>>;

fn create_stack() -> (Arc<Collector>, Arc<Stack>) {
    let collector = Arc::new(Collector::new());
    let bootstrap = BootstrapConfig {
        resamples: 200,
        r2_resamples: 50,
        seed: Some(42),
        ..BootstrapConfig::default()
    };
    let stack = OperationTracker::with_bootstrap(
        TrackedDb::new(MemoryDb::new(), Arc::clone(&collector)),
        bootstrap,
    );
    (collector, Arc::new(stack))
}

fn values(i: usize) -> FieldMap {
    let mut values = FieldMap::new();
    values.insert("field0".to_string(), i.to_le_bytes().to_vec());
    values
}

/// Each thread inserts its own keys, then reads, updates, scans and deletes
fn run_threads(stack: &Arc<Stack>) {
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let stack = Arc::clone(stack);
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    let key = format!("t{}-{:06}", t, i);
                    stack.insert(TABLE, &key, &values(i)).unwrap();
                    stack.read(TABLE, &key, &[]).unwrap();
                    if i % 2 == 0 {
                        stack.update(TABLE, &key, &values(i + 1)).unwrap();
                    }
                    if i % 10 == 0 {
                        stack.scan(TABLE, &key, 5, &[]).unwrap();
                    }
                    if i % 4 == 0 {
                        stack.delete(TABLE, &key).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

fn expected_counts() -> HashMap<OperationKind, u64> {
    let per_thread = |every: usize| (OPS_PER_THREAD.div_ceil(every) * THREADS) as u64;
    HashMap::from([
        (OperationKind::Insert, per_thread(1)),
        (OperationKind::Read, per_thread(1)),
        (OperationKind::Update, per_thread(2)),
        (OperationKind::Scan, per_thread(10)),
        (OperationKind::Delete, per_thread(4)),
    ])
}

// ============ Count Agreement Tests ============

#[test]
fn test_counts_agree_across_views() {
    let (collector, stack) = create_stack();
    run_threads(&stack);

    let timings = stack.timings();
    let samples = stack.samples();

    for (kind, expected) in expected_counts() {
        let label = kind.label();
        assert_eq!(collector.count(kind), expected, "{}", label);
        assert_eq!(collector.histogram(kind).total_count(), expected, "{}", label);
        assert_eq!(timings[label].count, expected, "{}", label);
        assert_eq!(samples[label].len() as u64, expected, "{}", label);
    }

    let total: u64 = expected_counts().values().sum();
    assert_eq!(collector.total_ops(), total);
    assert_eq!(collector.read_amp_count(), expected_counts()[&OperationKind::Read]);
}

#[test]
fn test_sequence_indices_are_gapless() {
    let (_, stack) = create_stack();
    run_threads(&stack);

    for (label, series) in stack.samples() {
        let mut indices: Vec<u64> = series.iter().map(|s| s.sequence_index).collect();
        indices.sort_unstable();
        let expected: Vec<u64> = (1..=series.len() as u64).collect();
        assert_eq!(indices, expected, "{}", label);
    }
}

#[test]
fn test_cumulative_time_matches_samples() {
    let (_, stack) = create_stack();
    run_threads(&stack);

    let timings = stack.timings();
    for (label, series) in stack.samples() {
        let summed: std::time::Duration = series.iter().map(|s| s.elapsed).sum();
        assert_eq!(timings[&label].total_time, summed, "{}", label);
    }
}

// ============ Post-run Report Tests ============

#[test]
fn test_reports_after_concurrent_run() {
    let (collector, stack) = create_stack();
    run_threads(&stack);

    let reports = stack.report_statistics();
    assert_eq!(reports.len(), 5);
    for report in &reports {
        let s = &report.statistics;
        assert!(s.min <= s.median && s.median <= s.max, "{:?}", report);
        assert!(s.min <= s.mean && s.mean <= s.max, "{:?}", report);
        assert!((0.0..=1.0).contains(&s.r2));

        for ci in [
            report.intervals.throughput,
            report.intervals.r2,
            report.intervals.mean,
            report.intervals.std_dev,
            report.intervals.median,
            report.intervals.mad,
        ] {
            assert!(ci.lower_bound <= ci.estimate && ci.estimate <= ci.upper_bound);
        }
    }

    let rows = report::measurement_rows(&collector);
    let table = report::format_measurements(&rows, &stack.timings());
    let last_row = table
        .lines()
        .filter(|l| l.starts_with("│ "))
        .last()
        .unwrap();
    assert!(last_row.starts_with("│ TOTAL "));

    let dir = tempfile::tempdir().unwrap();
    let written = stack.generate_plots(dir.path()).unwrap();
    assert_eq!(written.len(), 5);
}
