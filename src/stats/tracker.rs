//! Per-call operation tracking
//!
//! [`OperationTracker`] wraps a [`Db`] and, for every call, measures the
//! elapsed time around the delegate and performs one tracked update: under a
//! single lock it bumps the label's `{count, total_time}` and appends a
//! [`Sample`] with the label's next sequence index.
//!
//! No statistics are computed while the lock is held. Plot generation and
//! statistics are post-run operations and read a snapshot of the store.

use super::analysis::{OperationReport, StatisticsEngine};
use super::samples::{SampleSeries, SampleStore};
use crate::config::BootstrapConfig;
use crate::db::{Db, FieldMap};
use crate::output::csv::CsvSeriesRenderer;
use crate::output::{text, SeriesRenderer};
use crate::Result;
use anyhow::Context;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Running totals for one operation label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTiming {
    pub count: u64,
    /// Sum of elapsed time over every call
    pub total_time: Duration,
    /// When the first call under this label finished
    pub first_seen: Instant,
}

impl OperationTiming {
    fn new(elapsed: Duration, now: Instant) -> Self {
        Self {
            count: 1,
            total_time: elapsed,
            first_seen: now,
        }
    }

    /// Mean elapsed time per call
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.total_time.as_nanos() / u128::from(self.count)) as u64)
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    timings: HashMap<String, OperationTiming>,
    samples: SampleStore,
}

/// Timing decorator that keeps every raw sample
pub struct OperationTracker<D> {
    db: D,
    state: Mutex<TrackerState>,
    bootstrap: BootstrapConfig,
}

impl<D> OperationTracker<D> {
    pub fn new(db: D) -> Self {
        Self::with_bootstrap(db, BootstrapConfig::default())
    }

    /// Create a tracker whose statistics use the given bootstrap settings
    pub fn with_bootstrap(db: D, bootstrap: BootstrapConfig) -> Self {
        Self {
            db,
            state: Mutex::new(TrackerState::default()),
            bootstrap,
        }
    }

    // A worker that panicked mid-run must not stop post-run reporting
    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a call under `label` that started at `start`
    pub fn track_label(&self, label: &str, start: Instant) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(start);
        self.record_at(label, elapsed, now);
    }

    /// Track an already measured call under `label`
    pub fn record_label(&self, label: &str, elapsed: Duration) {
        self.record_at(label, elapsed, Instant::now());
    }

    fn record_at(&self, label: &str, elapsed: Duration, now: Instant) {
        let mut state = self.state();
        match state.timings.get_mut(label) {
            Some(timing) => {
                timing.count += 1;
                timing.total_time += elapsed;
            }
            None => {
                state
                    .timings
                    .insert(label.to_owned(), OperationTiming::new(elapsed, now));
            }
        }
        state.samples.add_sample(label, elapsed);
    }

    /// Copy of the running totals per label
    pub fn timings(&self) -> HashMap<String, OperationTiming> {
        self.state().timings.clone()
    }

    /// Copy of every label's ordered sample sequence
    pub fn samples(&self) -> SampleSeries {
        self.state().samples.snapshot()
    }

    /// Number of samples recorded under `label`
    pub fn sample_count(&self, label: &str) -> usize {
        self.state().samples.len(label)
    }

    pub fn bootstrap_config(&self) -> &BootstrapConfig {
        &self.bootstrap
    }

    pub fn inner(&self) -> &D {
        &self.db
    }

    pub fn into_inner(self) -> D {
        self.db
    }

    /// Write one CSV series per operation into `output_dir`
    pub fn generate_plots(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        self.generate_plots_with(&CsvSeriesRenderer::new(), output_dir)
    }

    /// Render every operation's series with `renderer`
    ///
    /// Failing to create `output_dir` is an error. A failure on one
    /// operation is logged and the remaining operations are still rendered.
    pub fn generate_plots_with(
        &self,
        renderer: &dyn SeriesRenderer,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create plot directory: {}", output_dir.display()))?;

        let series = self.samples();
        let mut written = Vec::with_capacity(series.len());
        for (label, samples) in &series {
            match renderer.render(label, samples, output_dir) {
                Ok(path) => {
                    debug!(
                        "Wrote {} samples for {} to {}",
                        samples.len(),
                        label,
                        path.display()
                    );
                    written.push(path);
                }
                Err(e) => warn!("Failed to render series for {}: {:#}", label, e),
            }
        }

        info!(
            "Generated {} of {} series in {}",
            written.len(),
            series.len(),
            output_dir.display()
        );
        Ok(written)
    }

    /// Statistics and confidence intervals per label, in label order
    pub fn report_statistics(&self) -> Vec<OperationReport> {
        let series = self.samples();
        let engine = StatisticsEngine::new(self.bootstrap.clone());
        engine.analyze_all(
            series
                .iter()
                .map(|(label, samples)| (label.as_str(), samples.as_slice())),
        )
    }

    pub fn render_statistics(&self) -> String {
        text::render_statistics(&self.report_statistics())
    }

    pub fn print_statistics(&self) {
        print!("{}", self.render_statistics());
    }
}

impl<D: std::fmt::Debug> std::fmt::Debug for OperationTracker<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationTracker")
            .field("db", &self.db)
            .field("bootstrap", &self.bootstrap)
            .finish_non_exhaustive()
    }
}

impl<D: Db> Db for OperationTracker<D> {
    type Error = D::Error;

    fn read(
        &self,
        table: &str,
        key: &str,
        fields: &[String],
    ) -> StdResult<FieldMap, Self::Error> {
        let start = Instant::now();
        let result = self.db.read(table, key, fields);
        self.track_label("READ", start);
        result
    }

    fn read_with_amplification(
        &self,
        table: &str,
        key: &str,
        fields: &[String],
    ) -> StdResult<(FieldMap, u32), Self::Error> {
        let start = Instant::now();
        let result = self.db.read_with_amplification(table, key, fields);
        self.track_label("READ", start);
        result
    }

    fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: &[String],
    ) -> StdResult<Vec<FieldMap>, Self::Error> {
        let start = Instant::now();
        let result = self.db.scan(table, start_key, count, fields);
        self.track_label("SCAN", start);
        result
    }

    fn update(&self, table: &str, key: &str, values: &FieldMap) -> StdResult<(), Self::Error> {
        let start = Instant::now();
        let result = self.db.update(table, key, values);
        self.track_label("UPDATE", start);
        result
    }

    fn insert(&self, table: &str, key: &str, values: &FieldMap) -> StdResult<(), Self::Error> {
        let start = Instant::now();
        let result = self.db.insert(table, key, values);
        self.track_label("INSERT", start);
        result
    }

    fn delete(&self, table: &str, key: &str) -> StdResult<(), Self::Error> {
        let start = Instant::now();
        let result = self.db.delete(table, key);
        self.track_label("DELETE", start);
        result
    }

    fn textual_metrics(&self) -> Option<String> {
        self.db.textual_metrics()
    }
}

/// Sum of every label's cumulative time
pub fn total_time(timings: &HashMap<String, OperationTiming>) -> Duration {
    timings.values().map(|t| t.total_time).sum()
}
