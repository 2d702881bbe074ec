//! Human-readable text output

use crate::stats::analysis::ConfidenceInterval;
use crate::stats::histogram::HistogramSnapshot;
use crate::stats::{Collector, OperationKind, OperationReport};
use crate::util::time::{calculate_rate, format_element_rate, format_micros};
use std::fmt::Write;
use std::time::Duration;

const SUMMARY_HEADER: &str =
    "____optype__elapsed_____ops(total)___ops/sec(cum)__avg(ms)__p50(ms)__p95(ms)__p99(ms)_pMax(ms)";

const STATISTICS_RULE_WIDTH: usize = 80;

/// Render the collector's end-of-run summary
///
/// One row per operation kind with a non-zero count, then the aggregate
/// block. `backend_metrics` is appended verbatim under its own heading.
pub fn render_summary(
    collector: &Collector,
    elapsed: Duration,
    backend_metrics: Option<&str>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", SUMMARY_HEADER);

    for kind in OperationKind::ALL {
        let count = collector.count(kind);
        if count == 0 {
            continue;
        }
        let _ = writeln!(
            out,
            "{}",
            summary_row(kind.name(), count, &collector.snapshot(kind), elapsed)
        );
    }

    let total_ops = collector.total_ops();
    let _ = writeln!(out);
    let _ = writeln!(out, "Benchmark Summary:");
    let _ = writeln!(out, "  Total operations: {}", total_ops);
    let _ = writeln!(out, "  Total elapsed: {:.1}s", elapsed.as_secs_f64());
    let _ = writeln!(
        out,
        "  Throughput: {:.1} ops/sec",
        calculate_rate(total_ops, elapsed)
    );
    if let Some(amplification) = collector.read_amplification() {
        let _ = writeln!(out, "  Avg Read Amplification: {:.2}", amplification);
    }

    if let Some(metrics) = backend_metrics {
        let _ = writeln!(out, "\nDatabase-specific metrics:");
        let _ = writeln!(out, "{}", metrics);
    }

    out
}

fn summary_row(name: &str, count: u64, latency: &HistogramSnapshot, elapsed: Duration) -> String {
    let ms = |d: Duration| d.as_nanos() as f64 / 1e6;
    format!(
        "{:>10} {:>7.1}s {:>14} {:>14.1} {:>8.1} {:>8.1} {:>8.1} {:>8.1} {:>8.1}",
        name,
        elapsed.as_secs_f64(),
        count,
        calculate_rate(count, elapsed),
        ms(latency.mean()),
        ms(latency.value_at_percentile(50.0)),
        ms(latency.value_at_percentile(95.0)),
        ms(latency.value_at_percentile(99.0)),
        ms(latency.max()),
    )
}

/// Render one statistics table per report, in the order given
pub fn render_statistics(reports: &[OperationReport]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(STATISTICS_RULE_WIDTH);

    for report in reports {
        let _ = writeln!(out, "\n{}", rule);
        let _ = writeln!(out, "{}: Additional Statistics", report.operation);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(
            out,
            "{:<15} {:>15} {:>15} {:>15}",
            "", "Lower bound", "Estimate", "Upper bound"
        );

        let intervals = &report.intervals;
        write_interval(&mut out, "Throughput", &intervals.throughput, format_element_rate);
        let _ = writeln!(
            out,
            "{:<15} {:>15.7} {:>15.7} {:>15.7}",
            "R²", intervals.r2.lower_bound, intervals.r2.estimate, intervals.r2.upper_bound
        );
        write_interval(&mut out, "Mean", &intervals.mean, format_micros);
        write_interval(&mut out, "Std. Dev.", &intervals.std_dev, format_micros);
        write_interval(&mut out, "Median", &intervals.median, format_micros);
        write_interval(&mut out, "MAD", &intervals.mad, format_micros);
    }

    out
}

fn write_interval(
    out: &mut String,
    name: &str,
    interval: &ConfidenceInterval,
    format: fn(f64) -> String,
) {
    let _ = writeln!(
        out,
        "{:<15} {:>15} {:>15} {:>15}",
        name,
        format(interval.lower_bound),
        format(interval.estimate),
        format(interval.upper_bound)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::analysis::StatisticIntervals;
    use crate::stats::Statistics;

    #[test]
    fn test_summary_skips_idle_operations() {
        let collector = Collector::new();
        collector.record_read_with_amplification(Duration::from_millis(2), 3);
        collector.record_read_with_amplification(Duration::from_millis(2), 1);

        let out = render_summary(&collector, Duration::from_secs(2), None);
        assert!(out.contains(SUMMARY_HEADER));

        let rows: Vec<&str> = out.lines().filter(|l| l.trim_start().starts_with("read")).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("      read     2.0s"));
        assert!(!out.contains("update"));

        assert!(out.contains("  Total operations: 2\n"));
        assert!(out.contains("  Total elapsed: 2.0s\n"));
        assert!(out.contains("  Throughput: 1.0 ops/sec\n"));
        assert!(out.contains("  Avg Read Amplification: 2.00\n"));
        assert!(!out.contains("Database-specific metrics"));
    }

    #[test]
    fn test_summary_without_amplification() {
        let collector = Collector::new();
        collector.record_update(Duration::from_micros(10));

        let out = render_summary(&collector, Duration::from_secs(1), Some("  level 0: 3 files"));
        assert!(!out.contains("Read Amplification"));
        assert!(out.contains("\nDatabase-specific metrics:\n  level 0: 3 files\n"));
    }

    #[test]
    fn test_summary_row_units() {
        let collector = Collector::new();
        collector.record_scan(Duration::from_millis(4));
        let row = summary_row("scan", 1, &collector.snapshot(OperationKind::Scan), Duration::from_secs(1));
        let fields: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(fields[0], "scan");
        assert_eq!(fields[1], "1.0s");
        assert_eq!(fields[2], "1");
        assert_eq!(fields[3], "1.0");
        // 4ms sits well inside one 2-digit bucket
        assert_eq!(fields[4], "4.0");
        assert_eq!(fields[8], "4.0");
    }

    #[test]
    fn test_statistics_table_layout() {
        let report = OperationReport {
            operation: "READ".to_string(),
            statistics: Statistics::default(),
            intervals: StatisticIntervals {
                throughput: ConfidenceInterval::point(1_000.0),
                r2: ConfidenceInterval::point(1.0),
                mean: ConfidenceInterval::point(1_000.0),
                std_dev: ConfidenceInterval::point(0.0),
                median: ConfidenceInterval::point(1_000.0),
                mad: ConfidenceInterval::point(0.0),
            },
        };

        let out = render_statistics(&[report]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "=".repeat(80));
        assert_eq!(lines[2], "READ: Additional Statistics");
        assert!(lines[4].contains("Lower bound"));
        assert!(lines[5].starts_with("Throughput"));
        assert!(lines[5].contains("1.000 Kelem/s"));
        assert!(lines[6].contains("1.0000000"));
        assert!(lines[7].contains("1.00 ms"));
        assert!(lines[8].contains("0.00 µs"));
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn test_statistics_empty() {
        assert!(render_statistics(&[]).is_empty());
    }
}
