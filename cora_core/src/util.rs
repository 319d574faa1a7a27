//! Timing helpers for structured logs.

use std::time::{Duration, Instant};
use tracing::info;

/// Log how long `operation` took since `start` and return the elapsed time.
///
/// Emits `[TIMING] HH:MM:SS.mmm - operation: 0.123s | additional_info`.
pub fn log_timing(operation: &str, start: Instant, additional_info: &str) -> Duration {
    let elapsed = start.elapsed();
    info!("{}", timing_line(operation, elapsed, additional_info));
    elapsed
}

fn timing_line(operation: &str, elapsed: Duration, additional_info: &str) -> String {
    let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
    let mut line = format!(
        "[TIMING] {timestamp} - {operation}: {:.3}s",
        elapsed.as_secs_f64()
    );
    if !additional_info.is_empty() {
        line.push_str(" | ");
        line.push_str(additional_info);
    }
    line
}
