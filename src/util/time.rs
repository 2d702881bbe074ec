//! Time and rate formatting utilities
//!
//! Shared by the collector summary, the statistics tables and the
//! measurement table.

use std::time::Duration;

/// Calculate an operation rate from a count and a duration
///
/// Returns 0.0 for a zero duration.
///
/// # Examples
///
/// ```
/// use kvpulse::util::time::calculate_rate;
/// use std::time::Duration;
///
/// assert_eq!(calculate_rate(1000, Duration::from_secs(10)), 100.0);
/// assert_eq!(calculate_rate(1000, Duration::ZERO), 0.0);
/// ```
pub fn calculate_rate(operations: u64, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds > 0.0 {
        operations as f64 / seconds
    } else {
        0.0
    }
}

/// Format a time given in microseconds using µs, ms or s
///
/// # Examples
///
/// ```
/// use kvpulse::util::time::format_micros;
///
/// assert_eq!(format_micros(512.0), "512.00 µs");
/// assert_eq!(format_micros(1_500.0), "1.50 ms");
/// assert_eq!(format_micros(2_500_000.0), "2.50 s");
/// ```
pub fn format_micros(micros: f64) -> String {
    if micros >= 1_000_000.0 {
        format!("{:.2} s", micros / 1_000_000.0)
    } else if micros >= 1_000.0 {
        format!("{:.2} ms", micros / 1_000.0)
    } else {
        format!("{:.2} µs", micros)
    }
}

/// Format an element rate with metric prefixes
///
/// # Examples
///
/// ```
/// use kvpulse::util::time::format_element_rate;
///
/// assert_eq!(format_element_rate(500.0), "500.000 elem/s");
/// assert_eq!(format_element_rate(1_500.0), "1.500 Kelem/s");
/// assert_eq!(format_element_rate(2_500_000.0), "2.500 Melem/s");
/// ```
pub fn format_element_rate(per_second: f64) -> String {
    if per_second >= 1_000_000.0 {
        format!("{:.3} Melem/s", per_second / 1_000_000.0)
    } else if per_second >= 1_000.0 {
        format!("{:.3} Kelem/s", per_second / 1_000.0)
    } else {
        format!("{:.3} elem/s", per_second)
    }
}

/// Duration as fractional milliseconds
#[inline]
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Duration as fractional microseconds
#[inline]
pub fn as_micros_f64(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000.0
}
