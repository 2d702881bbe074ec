//! Measurement table
//!
//! Renders per-operation measurements in one fixed-width table, filling the
//! `Total(ms)` column from the tracker's cumulative time per label.
//!
//! Rows come either from text in the harness's measurement format, one line
//! per operation:
//!
//! ```text
//! READ   - Takes(s): 10.0, Count: 1000, OPS: 100.0, Avg(us): 10, Min(us): 1, Max(us): 50, 50th(us): 9, 90th(us): 20, 95th(us): 30, 99th(us): 40, 99.9th(us): 49
//! ```
//!
//! or directly from a [`Collector`]. Lines that do not match are skipped. A
//! `TOTAL` row, when present, is always rendered last.

use crate::stats::histogram::HistogramSnapshot;
use crate::stats::tracker::total_time;
use crate::stats::{Collector, OperationKind, OperationTiming};
use crate::util::time::calculate_rate;
use nom::{
    bytes::complete::{tag, take_till1},
    character::complete::{char, multispace0, multispace1, u64 as parse_u64},
    number::complete::double,
    sequence::{preceded, tuple},
    IResult,
};
use std::collections::HashMap;
use std::fmt::Write;
use std::time::Duration;
use tracing::warn;

/// Label of the aggregate row
pub const TOTAL_LABEL: &str = "TOTAL";

const TABLE_WIDTH: usize = 126;
const TABLE_TITLE: &str = "YCSB BENCHMARK RESULTS";

/// One operation's measurements (latencies in whole microseconds)
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub operation: String,
    pub takes_secs: f64,
    pub count: u64,
    pub ops: f64,
    pub avg_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub p50_us: u64,
    pub p90_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub p999_us: u64,
}

impl MeasurementRow {
    fn from_snapshot(operation: &str, latency: &HistogramSnapshot, elapsed: Duration) -> Self {
        let us = |d: Duration| d.as_micros() as u64;
        let count = latency.len();
        Self {
            operation: operation.to_owned(),
            takes_secs: elapsed.as_secs_f64(),
            count,
            ops: calculate_rate(count, elapsed),
            avg_us: us(latency.mean()),
            min_us: us(latency.min()),
            max_us: us(latency.max()),
            p50_us: us(latency.value_at_percentile(50.0)),
            p90_us: us(latency.value_at_percentile(90.0)),
            p95_us: us(latency.value_at_percentile(95.0)),
            p99_us: us(latency.value_at_percentile(99.0)),
            p999_us: us(latency.value_at_percentile(99.9)),
        }
    }

    pub fn is_total(&self) -> bool {
        self.operation == TOTAL_LABEL
    }
}

/// `<sep> Label: <value>` with flexible whitespace
fn labelled<'a, O, F>(label: &'static str, value: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    preceded(tuple((multispace0, tag(label), multispace0)), value)
}

fn comma(input: &str) -> IResult<&str, char> {
    preceded(multispace0, char(','))(input)
}

fn measurement_line(input: &str) -> IResult<&str, MeasurementRow> {
    let (input, operation) = take_till1(|c: char| c.is_whitespace())(input)?;
    let (input, _) = tuple((multispace1, char('-'), multispace1))(input)?;
    let (input, takes_secs) = labelled("Takes(s):", double)(input)?;
    let (input, count) = preceded(comma, labelled("Count:", parse_u64))(input)?;
    let (input, ops) = preceded(comma, labelled("OPS:", double))(input)?;
    let (input, avg_us) = preceded(comma, labelled("Avg(us):", parse_u64))(input)?;
    let (input, min_us) = preceded(comma, labelled("Min(us):", parse_u64))(input)?;
    let (input, max_us) = preceded(comma, labelled("Max(us):", parse_u64))(input)?;
    let (input, p50_us) = preceded(comma, labelled("50th(us):", parse_u64))(input)?;
    let (input, p90_us) = preceded(comma, labelled("90th(us):", parse_u64))(input)?;
    let (input, p95_us) = preceded(comma, labelled("95th(us):", parse_u64))(input)?;
    let (input, p99_us) = preceded(comma, labelled("99th(us):", parse_u64))(input)?;
    let (input, p999_us) = preceded(comma, labelled("99.9th(us):", parse_u64))(input)?;

    Ok((
        input,
        MeasurementRow {
            operation: operation.to_owned(),
            takes_secs,
            count,
            ops,
            avg_us,
            min_us,
            max_us,
            p50_us,
            p90_us,
            p95_us,
            p99_us,
            p999_us,
        },
    ))
}

/// Parse one measurement line, `None` if it does not match the format
///
/// Trailing text after the last field is ignored.
pub fn parse_measurement_line(line: &str) -> Option<MeasurementRow> {
    measurement_line(line).ok().map(|(_, row)| row)
}

/// Rows for every operation kind with samples, followed by a `TOTAL` row
pub fn measurement_rows(collector: &Collector) -> Vec<MeasurementRow> {
    let elapsed = collector.elapsed();
    let mut rows = Vec::new();
    let mut total: Option<HistogramSnapshot> = None;

    for kind in OperationKind::ALL {
        let snapshot = collector.snapshot(kind);
        if snapshot.is_empty() {
            continue;
        }
        rows.push(MeasurementRow::from_snapshot(kind.label(), &snapshot, elapsed));

        match total.as_mut() {
            Some(merged) => {
                if let Err(e) = merged.merge(&snapshot) {
                    warn!("Skipping {} in TOTAL row: {:#}", kind, e);
                }
            }
            None => total = Some(snapshot),
        }
    }

    if let Some(merged) = total {
        rows.push(MeasurementRow::from_snapshot(TOTAL_LABEL, &merged, elapsed));
    }
    rows
}

/// Parse `text` and render its measurement lines as a table
pub fn format_metrics_table(text: &str, timings: &HashMap<String, OperationTiming>) -> String {
    let rows: Vec<MeasurementRow> = text.lines().filter_map(parse_measurement_line).collect();
    format_measurements(&rows, timings)
}

/// Render measurement rows as a table
///
/// `Total(ms)` is the tracker's cumulative time for the row's label, `N/A`
/// when the label was never tracked. The `TOTAL` row sums every label.
pub fn format_measurements(
    rows: &[MeasurementRow],
    timings: &HashMap<String, OperationTiming>,
) -> String {
    let mut out = String::new();
    let heavy = "═".repeat(TABLE_WIDTH);

    let _ = writeln!(out, "\n{}", heavy);
    let padding = (TABLE_WIDTH - TABLE_TITLE.len()) / 2;
    let _ = writeln!(out, "{}{}", " ".repeat(padding), TABLE_TITLE);
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(
        out,
        "{}",
        table_row([
            "Operation", "Total(ms)", "Count", "OPS", "Avg(µs)", "p50(µs)", "p95(µs)", "p99(µs)",
            "p99.9(µs)", "Max(µs)",
        ])
    );
    let _ = writeln!(out, "{}", "─".repeat(TABLE_WIDTH));

    let mut total_row = None;
    for row in rows {
        let cumulative = if row.is_total() {
            Some(total_time(timings))
        } else {
            timings.get(&row.operation).map(|t| t.total_time)
        };
        let rendered = render_row(row, cumulative);

        if row.is_total() {
            total_row = Some(rendered);
        } else {
            let _ = writeln!(out, "{}", rendered);
        }
    }
    if let Some(rendered) = total_row {
        let _ = writeln!(out, "{}", rendered);
    }

    let _ = writeln!(out, "{}", heavy);
    out
}

fn render_row(row: &MeasurementRow, cumulative: Option<Duration>) -> String {
    let total_ms = match cumulative {
        Some(total) => format!("{:.3}", total.as_micros() as f64 / 1000.0),
        None => "N/A".to_string(),
    };
    table_row([
        row.operation.as_str(),
        total_ms.as_str(),
        row.count.to_string().as_str(),
        format!("{:.1}", row.ops).as_str(),
        row.avg_us.to_string().as_str(),
        row.p50_us.to_string().as_str(),
        row.p95_us.to_string().as_str(),
        row.p99_us.to_string().as_str(),
        row.p999_us.to_string().as_str(),
        row.max_us.to_string().as_str(),
    ])
}

fn table_row(cells: [&str; 10]) -> String {
    format!(
        "│ {:<12} │ {:>10} │ {:>10} │ {:>9} │ {:>9} │ {:>9} │ {:>9} │ {:>9} │ {:>9} │ {:>9} │",
        cells[0], cells[1], cells[2], cells[3], cells[4], cells[5], cells[6], cells[7], cells[8],
        cells[9]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const READ_LINE: &str = "READ   - Takes(s): 10.0, Count: 1000, OPS: 100.0, Avg(us): 10, Min(us): 1, Max(us): 50, 50th(us): 9, 90th(us): 20, 95th(us): 30, 99th(us): 40, 99.9th(us): 49";
    const TOTAL_LINE: &str = "TOTAL  - Takes(s): 10.0, Count: 1500, OPS: 150.0, Avg(us): 12, Min(us): 1, Max(us): 80, 50th(us): 10, 90th(us): 25, 95th(us): 35, 99th(us): 60, 99.9th(us): 79";
    const UPDATE_LINE: &str = "UPDATE - Takes(s): 10.0, Count: 500, OPS: 50.0, Avg(us): 16, Min(us): 2, Max(us): 80, 50th(us): 14, 90th(us): 30, 95th(us): 40, 99th(us): 70, 99.9th(us): 79";

    fn timing(total_time: Duration) -> OperationTiming {
        OperationTiming {
            count: 1,
            total_time,
            first_seen: Instant::now(),
        }
    }

    fn data_rows(table: &str) -> Vec<&str> {
        table
            .lines()
            .filter(|l| l.starts_with("│ ") && !l.contains("Operation"))
            .collect()
    }

    #[test]
    fn test_parse_measurement_line() {
        let row = parse_measurement_line(READ_LINE).unwrap();
        assert_eq!(row.operation, "READ");
        assert_eq!(row.takes_secs, 10.0);
        assert_eq!(row.count, 1000);
        assert_eq!(row.ops, 100.0);
        assert_eq!(row.avg_us, 10);
        assert_eq!(row.min_us, 1);
        assert_eq!(row.max_us, 50);
        assert_eq!(row.p50_us, 9);
        assert_eq!(row.p90_us, 20);
        assert_eq!(row.p95_us, 30);
        assert_eq!(row.p99_us, 40);
        assert_eq!(row.p999_us, 49);
    }

    #[test]
    fn test_parse_rejects_other_lines() {
        assert!(parse_measurement_line("").is_none());
        assert!(parse_measurement_line("Run finished, takes 10.2s").is_none());
        assert!(parse_measurement_line("READ - Takes(s): 10.0, Count: lots").is_none());
        assert!(parse_measurement_line(&format!(" {}", READ_LINE)).is_none());
    }

    #[test]
    fn test_table_width_and_title() {
        let table = format_measurements(&[], &HashMap::new());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[1].chars().count(), TABLE_WIDTH);
        assert_eq!(lines[2].trim(), TABLE_TITLE);
        assert!(lines[4].contains("Operation"));
        assert_eq!(lines[4].chars().count(), TABLE_WIDTH);
        assert_eq!(lines[5].chars().count(), TABLE_WIDTH);
        assert!(data_rows(&table).is_empty());
    }

    #[test]
    fn test_total_row_rendered_last() {
        let text = format!("{}\n{}\ngarbage line\n{}\n", TOTAL_LINE, READ_LINE, UPDATE_LINE);
        let mut timings = HashMap::new();
        timings.insert("READ".to_string(), timing(Duration::from_micros(1_500)));
        timings.insert("UPDATE".to_string(), timing(Duration::from_micros(2_250)));

        let table = format_metrics_table(&text, &timings);
        let rows = data_rows(&table);
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("│ READ "));
        assert!(rows[1].starts_with("│ UPDATE "));
        assert!(rows[2].starts_with("│ TOTAL "));

        assert!(rows[0].contains("      1.500 │"));
        assert!(rows[1].contains("      2.250 │"));
        assert!(rows[2].contains("      3.750 │"));
        for row in &rows {
            assert_eq!(row.chars().count(), TABLE_WIDTH);
        }
    }

    #[test]
    fn test_untracked_operation_shows_na() {
        let table = format_metrics_table(READ_LINE, &HashMap::new());
        let rows = data_rows(&table);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("        N/A │"));
        assert!(rows[0].contains("     100.0 │"));
    }

    #[test]
    fn test_rows_from_collector() {
        let collector = Collector::new();
        collector.record_read(Duration::from_micros(100));
        collector.record_read(Duration::from_micros(100));
        collector.record_delete(Duration::from_micros(300));

        let rows = measurement_rows(&collector);
        let names: Vec<&str> = rows.iter().map(|r| r.operation.as_str()).collect();
        assert_eq!(names, vec!["READ", "DELETE", "TOTAL"]);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[2].count, 3);
        assert!(rows[2].max_us >= 299);

        let table = format_measurements(&rows, &HashMap::new());
        let rendered = data_rows(&table);
        assert!(rendered[2].starts_with("│ TOTAL "));
        // TOTAL with no tracked labels sums to zero
        assert!(rendered[2].contains("      0.000 │"));
    }
}
