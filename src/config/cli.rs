//! CLI argument parsing using clap

use clap::Parser;
use std::path::PathBuf;

/// KVPulse - key-value benchmark metrics smoke run
///
/// Drives an in-memory store with a YCSB-style operation mix and prints the
/// collected latency summary, measurement table and bootstrap statistics.
#[derive(Parser, Debug)]
#[command(name = "kvpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Workload Options ===
    /// Number of worker threads
    #[arg(short = 't', long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Total operations across all threads
    #[arg(short = 'n', long, default_value = "100000")]
    pub operations: u64,

    /// Records loaded before the run
    #[arg(long, default_value = "10000")]
    pub record_count: u64,

    /// Read percentage (0-100)
    #[arg(long, default_value = "50")]
    pub read_percent: u8,

    /// Update percentage (0-100)
    #[arg(long, default_value = "30")]
    pub update_percent: u8,

    /// Insert percentage (0-100)
    #[arg(long, default_value = "10")]
    pub insert_percent: u8,

    /// Scan percentage (0-100); the remainder of the mix is deletes
    #[arg(long, default_value = "5")]
    pub scan_percent: u8,

    /// Records returned per scan
    #[arg(long, default_value = "10")]
    pub scan_length: usize,

    /// Zipf exponent for key selection (0 is uniform)
    #[arg(long, default_value = "0.99")]
    pub zipf_exponent: f64,

    // === Metrics Options ===
    /// TOML configuration file
    #[arg(short = 'c', long, env = "KVPULSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for per-operation sample series
    #[arg(long)]
    pub plot_dir: Option<PathBuf>,

    /// Write statistics as JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Seed for key selection and bootstrap resampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Bootstrap resamples per statistic
    #[arg(long)]
    pub resamples: Option<usize>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Delete percentage implied by the other four
    pub fn delete_percent(&self) -> u8 {
        100u8.saturating_sub(self.mix_total())
    }

    fn mix_total(&self) -> u8 {
        self.read_percent
            .saturating_add(self.update_percent)
            .saturating_add(self.insert_percent)
            .saturating_add(self.scan_percent)
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.threads == 0 {
            anyhow::bail!("threads must be at least 1");
        }

        if self.record_count == 0 {
            anyhow::bail!("record_count must be at least 1");
        }

        let total = u16::from(self.read_percent)
            + u16::from(self.update_percent)
            + u16::from(self.insert_percent)
            + u16::from(self.scan_percent);
        if total > 100 {
            anyhow::bail!(
                "read + update + insert + scan percentages must not exceed 100, got {}",
                total
            );
        }

        if !(self.zipf_exponent >= 0.0 && self.zipf_exponent.is_finite()) {
            anyhow::bail!("zipf_exponent must be a non-negative number");
        }

        Ok(())
    }

    /// Initialize logging based on CLI flags
    ///
    /// `RUST_LOG` takes precedence; otherwise `KVPULSE_LOG_LEVEL` or `warn`,
    /// or `debug` when `--debug` is given. Logs go to stderr.
    pub fn init_logging(&self) -> anyhow::Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level =
            std::env::var("KVPULSE_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["kvpulse"]);
        assert!(cli.threads >= 1);
        assert_eq!(cli.operations, 100_000);
        assert_eq!(cli.delete_percent(), 5);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_operation_mix() {
        let cli = Cli::parse_from([
            "kvpulse",
            "--read-percent",
            "100",
            "--update-percent",
            "0",
            "--insert-percent",
            "0",
            "--scan-percent",
            "0",
        ]);
        assert_eq!(cli.delete_percent(), 0);
        assert!(cli.validate().is_ok());

        let cli = Cli::parse_from(["kvpulse", "--read-percent", "90", "--update-percent", "20"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_validate_threads_and_zipf() {
        let cli = Cli::parse_from(["kvpulse", "--threads", "0"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["kvpulse", "--zipf-exponent=-1"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["kvpulse", "--record-count", "0"]);
        assert!(cli.validate().is_err());
    }
}
