//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<MetricsConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<MetricsConfig> {
    let config: MetricsConfig =
        ::toml::from_str(contents).context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Load the file named on the command line (or defaults) and apply CLI overrides
pub fn load_config(cli: &Cli) -> Result<MetricsConfig> {
    let config = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => MetricsConfig::default(),
    };
    merge_cli_with_config(cli, config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: MetricsConfig) -> Result<MetricsConfig> {
    if let Some(dir) = &cli.plot_dir {
        config.output.plot_dir = dir.clone();
    }
    if let Some(json) = &cli.json {
        config.output.json = Some(json.clone());
    }
    if let Some(seed) = cli.seed {
        config.bootstrap.seed = Some(seed);
    }
    if let Some(resamples) = cli.resamples {
        config.bootstrap.resamples = resamples;
    }

    validate(&config).context("Configuration validation failed")?;
    Ok(config)
}
