use super::UsageError;

const MILLIS_IN_SECOND: i64 = 1000;
const MILLIS_IN_MINUTE: i64 = 60 * MILLIS_IN_SECOND;
const MILLIS_IN_HOUR: i64 = 60 * MILLIS_IN_MINUTE;

/// Formats foreground time as `"<hours> h <minutes> m <seconds> s"`. Hours are not rolled into
/// days, leftover milliseconds are dropped.
pub fn format_duration(millis: i64) -> Result<String, UsageError> {
    if millis < 0 {
        return Err(UsageError::InvalidArgument(format!(
            "Duration must not be negative, got {millis} ms"
        )));
    }

    let hours = millis / MILLIS_IN_HOUR;
    let minutes = millis % MILLIS_IN_HOUR / MILLIS_IN_MINUTE;
    let seconds = millis % MILLIS_IN_MINUTE / MILLIS_IN_SECOND;

    Ok(format!("{hours} h {minutes} m {seconds} s"))
}

#[cfg(test)]
mod tests {
    use crate::usage::UsageError;

    use super::format_duration;

    #[test]
    fn test_format_zero() {
        assert_eq!(format_duration(0).unwrap(), "0 h 0 m 0 s");
    }

    #[test]
    fn test_format_breakdown() {
        assert_eq!(format_duration(3_661_000).unwrap(), "1 h 1 m 1 s");
        assert_eq!(format_duration(59_999).unwrap(), "0 h 0 m 59 s");
    }

    #[test]
    fn test_format_no_day_rollover() {
        assert_eq!(format_duration(26 * 3_600_000 + 5_000).unwrap(), "26 h 0 m 5 s");
    }

    #[test]
    fn test_format_negative() {
        assert!(matches!(
            format_duration(-1),
            Err(UsageError::InvalidArgument(_))
        ));
    }
}
