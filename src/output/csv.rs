//! CSV sample series
//!
//! One file per operation with a row per sample, in sequence order. The
//! files feed external plotting tools (gnuplot, pandas, spreadsheets):
//!
//! ```text
//! sample_index,elapsed_us
//! 1,12.345
//! 2,9.870
//! ```
//!
//! Files are named `<OP>_<YYYYmmdd-HHMMSS>_sample_times.csv` using local time.

use super::SeriesRenderer;
use crate::stats::Sample;
use crate::Result;
use anyhow::Context;
use chrono::Local;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Header row of every series file
pub const CSV_HEADER: &str = "sample_index,elapsed_us";

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Series file name for `label` written at `timestamp`
pub fn series_file_name(label: &str, timestamp: &str) -> String {
    format!("{}_{}_sample_times.csv", label, timestamp)
}

/// Writes each series as a two-column CSV file
#[derive(Debug, Clone, Default)]
pub struct CsvSeriesRenderer {
    timestamp: Option<String>,
}

impl CsvSeriesRenderer {
    /// Renderer stamping files with the current local time
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer stamping every file with a fixed timestamp
    pub fn with_timestamp(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
        }
    }

    fn timestamp(&self) -> String {
        match &self.timestamp {
            Some(ts) => ts.clone(),
            None => Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl SeriesRenderer for CsvSeriesRenderer {
    fn render(&self, label: &str, samples: &[Sample], output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(series_file_name(label, &self.timestamp()));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create series file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{}", CSV_HEADER)?;
        for sample in samples {
            writeln!(
                writer,
                "{},{:.3}",
                sample.sequence_index,
                sample.elapsed_micros()
            )?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write series file: {}", path.display()))?;

        Ok(path)
    }
}
