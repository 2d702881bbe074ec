//! Raw sample storage
//!
//! Histograms discard the identity and order of individual operations. The
//! sample store keeps every `(sequence_index, elapsed)` pair per operation
//! label so that time-ordered series and resampling statistics can be
//! computed after the run.
//!
//! The store itself is not synchronised; [`OperationTracker`] owns it behind
//! the same lock that guards its running totals.
//!
//! [`OperationTracker`]: super::OperationTracker

use crate::util::time::as_micros_f64;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// One observed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// 1-based position within its operation label
    pub sequence_index: u64,
    /// Wall-clock time the operation took
    pub elapsed: Duration,
}

impl Sample {
    pub fn new(sequence_index: u64, elapsed: Duration) -> Self {
        Self {
            sequence_index,
            elapsed,
        }
    }

    /// Elapsed time in fractional microseconds
    #[inline]
    pub fn elapsed_micros(&self) -> f64 {
        as_micros_f64(self.elapsed)
    }
}

/// Read-only copy of every series, ordered by label
pub type SampleSeries = BTreeMap<String, Vec<Sample>>;

/// Append-only per-label sample sequences
///
/// Each label's sequence is gapless and ordered: the n-th sample added under
/// a label gets `sequence_index == n`.
#[derive(Debug, Default)]
pub struct SampleStore {
    series: HashMap<String, Vec<Sample>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample under `label` and return its sequence index
    pub fn add_sample(&mut self, label: &str, elapsed: Duration) -> u64 {
        if let Some(series) = self.series.get_mut(label) {
            let index = series.len() as u64 + 1;
            series.push(Sample::new(index, elapsed));
            return index;
        }

        self.series
            .insert(label.to_owned(), vec![Sample::new(1, elapsed)]);
        1
    }

    /// Samples recorded under `label`, in sequence order
    pub fn series(&self, label: &str) -> Option<&[Sample]> {
        self.series.get(label).map(Vec::as_slice)
    }

    /// Number of samples under `label`
    pub fn len(&self, label: &str) -> usize {
        self.series.get(label).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }

    /// Number of samples across every label
    pub fn total_samples(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Labels in alphabetical order
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.series.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Iterate `(label, samples)` in alphabetical label order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Sample])> {
        self.labels()
            .into_iter()
            .filter_map(move |label| self.series(label).map(|samples| (label, samples)))
    }

    /// Clone every series for consumers outside the tracker's lock
    pub fn snapshot(&self) -> SampleSeries {
        self.series
            .iter()
            .map(|(label, samples)| (label.clone(), samples.clone()))
            .collect()
    }
}
