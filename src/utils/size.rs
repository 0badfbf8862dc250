//! Human-readable byte sizes.

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count with base-1024 units, rounded to two decimals.
/// Trailing zeros are dropped.
///
/// # Examples
///
/// - `format_bytes(0)` -> `"0 B"`
/// - `format_bytes(1536)` -> `"1.5 KB"`
/// - `format_bytes(-5)` -> `"0 B"`
pub fn format_bytes(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 B".to_string();
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let number = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{number} {}", UNITS[unit])
}

/// Percentage saved going from `before` to `after` bytes.
pub fn savings_percent(before: u64, after: u64) -> f64 {
    if before == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let saved = before.saturating_sub(after) as f64 / before as f64;
    saved * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_zero_and_negative() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(-1), "0 B");
    }

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(1), "1 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1100), "1.07 KB");
        assert_eq!(format_bytes(1024 * 1024), "1 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn test_format_bytes_caps_at_gigabytes() {
        assert_eq!(format_bytes(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn test_savings_percent() {
        assert_eq!(savings_percent(0, 10), 0.0);
        assert_eq!(savings_percent(200, 50), 75.0);
        assert_eq!(savings_percent(100, 150), 0.0);
    }
}
