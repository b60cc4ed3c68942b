//! Human-readable formatting helpers.

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count using the largest unit in B/KB/MB/GB that keeps the
/// value at or above 1, with at most two decimals.
///
/// `0` formats as `"0 B"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
