//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate complete configuration
pub fn validate(config: &MetricsConfig) -> Result<()> {
    validate_histogram(&config.histogram)?;
    validate_bootstrap(&config.bootstrap)?;
    Ok(())
}

/// Validate histogram bounds
pub fn validate_histogram(histogram: &HistogramConfig) -> Result<()> {
    if histogram.lowest == 0 {
        anyhow::bail!("histogram.lowest must be at least 1");
    }

    if histogram.highest < histogram.lowest.saturating_mul(2) {
        anyhow::bail!(
            "histogram.highest ({}) must be at least twice histogram.lowest ({})",
            histogram.highest,
            histogram.lowest
        );
    }

    if histogram.significant_digits > 5 {
        anyhow::bail!(
            "histogram.significant_digits must be between 0 and 5, got {}",
            histogram.significant_digits
        );
    }

    Ok(())
}

/// Validate bootstrap settings
pub fn validate_bootstrap(bootstrap: &BootstrapConfig) -> Result<()> {
    if bootstrap.resamples == 0 {
        anyhow::bail!("bootstrap.resamples must be greater than 0");
    }

    if bootstrap.r2_resamples == 0 {
        anyhow::bail!("bootstrap.r2_resamples must be greater than 0");
    }

    if !(bootstrap.confidence > 0.0 && bootstrap.confidence < 1.0) {
        anyhow::bail!(
            "bootstrap.confidence must be between 0 and 1 (exclusive), got {}",
            bootstrap.confidence
        );
    }

    Ok(())
}
