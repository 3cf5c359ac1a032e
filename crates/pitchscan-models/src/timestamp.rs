//! Timestamp formatting shared by logs and the overlay renderer.

/// Format seconds as `HH:MM:SS.mmm`.
///
/// Negative and non-finite inputs clamp to zero.
///
/// # Examples
/// ```
/// use pitchscan_models::timestamp::format_timestamp;
/// assert_eq!(format_timestamp(1.234), "00:00:01.234");
/// assert_eq!(format_timestamp(3725.5), "01:02:05.500");
/// ```
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let total_ms = (seconds * 1000.0).round() as u64;

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00.000");
        assert_eq!(format_timestamp(2.0), "00:00:02.000");
        assert_eq!(format_timestamp(61.25), "00:01:01.250");
        assert_eq!(format_timestamp(3600.0), "01:00:00.000");
    }

    #[test]
    fn test_format_timestamp_clamps() {
        assert_eq!(format_timestamp(-5.0), "00:00:00.000");
        assert_eq!(format_timestamp(f64::NAN), "00:00:00.000");
    }

    #[test]
    fn test_format_timestamp_rounds_to_millis() {
        assert_eq!(format_timestamp(0.9996), "00:00:01.000");
        assert_eq!(format_timestamp(10.0004), "00:00:10.000");
    }
}
