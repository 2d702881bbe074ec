//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//!
//! Every section and field has a default, so an empty file (or no file) is a
//! valid configuration:
//!
//! ```toml
//! [histogram]
//! lowest = 1
//! highest = 60000000000
//! significant_digits = 2
//!
//! [bootstrap]
//! resamples = 100000
//! r2_resamples = 1000
//! min_r2_samples = 11
//! confidence = 0.95
//! seed = 42
//!
//! [output]
//! plot_dir = "./benchmark_plots"
//! json = "stats.json"
//! progress_interval_secs = 1
//! ```

pub mod cli;
pub mod toml;
pub mod validator;

pub use validator::validate;

use crate::stats::histogram::{HIGHEST_TRACKABLE_NANOS, LOWEST_TRACKABLE_NANOS, SIGNIFICANT_DIGITS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete metrics configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub histogram: HistogramConfig,
    pub bootstrap: BootstrapConfig,
    pub output: OutputConfig,
}

/// Latency histogram bounds, in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Lowest discernible value
    pub lowest: u64,
    /// Highest trackable value; larger values are clamped
    pub highest: u64,
    /// Decimal digits of precision (0-5)
    pub significant_digits: u8,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            lowest: LOWEST_TRACKABLE_NANOS,
            highest: HIGHEST_TRACKABLE_NANOS,
            significant_digits: SIGNIFICANT_DIGITS,
        }
    }
}

/// Bootstrap resampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Resamples per value statistic
    pub resamples: usize,
    /// Resamples for the R² interval
    pub r2_resamples: usize,
    /// Below this many samples the R² interval collapses to the estimate
    pub min_r2_samples: usize,
    /// Confidence level in (0, 1)
    pub confidence: f64,
    /// Fixed RNG seed for reproducible intervals
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: 100_000,
            r2_resamples: 1_000,
            min_r2_samples: 11,
            confidence: 0.95,
            seed: None,
        }
    }
}

/// Output paths and intervals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving per-operation sample series
    pub plot_dir: PathBuf,
    /// Statistics JSON export path
    pub json: Option<PathBuf>,
    /// Seconds between progress lines (0 disables progress output)
    pub progress_interval_secs: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            plot_dir: PathBuf::from("./benchmark_plots"),
            json: None,
            progress_interval_secs: 1,
        }
    }
}

impl OutputConfig {
    /// Progress interval, `None` when progress output is disabled
    pub fn progress_interval(&self) -> Option<Duration> {
        (self.progress_interval_secs > 0).then(|| Duration::from_secs(self.progress_interval_secs))
    }
}
