//! JSON output formatting
//!
//! Serialises per-operation statistics reports for programmatic
//! consumption. One file per run; nothing is read back.

use crate::stats::OperationReport;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Top-level JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonStatisticsOutput {
    /// Local time the report was written (RFC 3339)
    pub generated_at: String,
    /// Crate version that produced the report
    pub version: String,
    pub operations: Vec<OperationReport>,
}

impl JsonStatisticsOutput {
    pub fn new(reports: &[OperationReport]) -> Self {
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            operations: reports.to_vec(),
        }
    }
}

/// Write `reports` to `output_path` as pretty-printed JSON
pub fn write_statistics_json(output_path: &Path, reports: &[OperationReport]) -> Result<()> {
    let document = JsonStatisticsOutput::new(reports);
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::analysis::{ConfidenceInterval, StatisticIntervals};
    use crate::stats::Statistics;

    fn report(operation: &str, mean: f64) -> OperationReport {
        OperationReport {
            operation: operation.to_string(),
            statistics: Statistics {
                mean,
                count: 3,
                ..Statistics::default()
            },
            intervals: StatisticIntervals {
                mean: ConfidenceInterval::point(mean),
                ..StatisticIntervals::default()
            },
        }
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let reports = vec![report("READ", 12.5), report("UPDATE", 40.0)];

        write_statistics_json(&path, &reports).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: JsonStatisticsOutput = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.operations, reports);
        assert_eq!(parsed.version, env!("CARGO_PKG_VERSION"));

        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["operations"][0]["operation"], "READ");
        assert_eq!(value["operations"][0]["statistics"]["mean"], 12.5);
        assert_eq!(value["operations"][1]["intervals"]["mean"]["estimate"], 40.0);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("stats.json");
        let err = write_statistics_json(&path, &[]).unwrap_err();
        assert!(err.to_string().contains("Failed to create JSON output"));
    }
}
