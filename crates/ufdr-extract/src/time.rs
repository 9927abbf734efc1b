//! Vendor timestamp and duration parsing.

use chrono::{DateTime, Utc};

/// Parse a vendor ISO-8601 timestamp (e.g. `2020-02-01T18:49:07.430+00:00`
/// or a trailing `Z`) to epoch milliseconds plus a UTC datetime.
///
/// Unparseable values return `None`; callers skip the value at record
/// granularity rather than aborting the document.
pub fn parse_timestamp(value: &str) -> Option<(i64, DateTime<Utc>)> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = DateTime::parse_from_rfc3339(trimmed).ok()?;
    let utc = parsed.with_timezone(&Utc);
    Some((utc.timestamp_millis(), utc))
}

/// Parse a call duration as reported by the vendor: `HH:MM:SS`, `MM:SS`,
/// or a plain number of seconds.
pub fn parse_duration_seconds(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let pieces: Vec<&str> = trimmed.split(':').collect();
    match pieces.as_slice() {
        [secs] => secs.parse::<i64>().ok(),
        [mins, secs] => {
            let m = mins.parse::<i64>().ok()?;
            let s = secs.parse::<i64>().ok()?;
            Some(m * 60 + s)
        }
        [hours, mins, secs] => {
            let h = hours.parse::<i64>().ok()?;
            let m = mins.parse::<i64>().ok()?;
            let s = secs.parse::<i64>().ok()?;
            Some(h * 3600 + m * 60 + s)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_with_offset_parses_to_epoch_ms() {
        let (ms, dt) = parse_timestamp("2020-02-01T18:49:07.430+00:00").unwrap();
        assert_eq!(ms, 1_580_582_947_430);
        assert_eq!(dt.timestamp_millis(), ms);
    }

    #[test]
    fn zulu_suffix_is_accepted() {
        let (ms, _) = parse_timestamp("2020-02-01T18:49:07Z").unwrap();
        assert_eq!(ms, 1_580_582_947_000);
    }

    #[test]
    fn non_utc_offset_normalizes() {
        let (ms_plus2, _) = parse_timestamp("2020-02-01T20:49:07+02:00").unwrap();
        let (ms_utc, _) = parse_timestamp("2020-02-01T18:49:07Z").unwrap();
        assert_eq!(ms_plus2, ms_utc);
    }

    #[test]
    fn garbage_timestamps_are_skipped() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2020-13-45T99:00:00Z").is_none());
    }

    #[test]
    fn duration_formats() {
        assert_eq!(parse_duration_seconds("01:02:03"), Some(3723));
        assert_eq!(parse_duration_seconds("02:03"), Some(123));
        assert_eq!(parse_duration_seconds("45"), Some(45));
        assert_eq!(parse_duration_seconds("00:00:00"), Some(0));
        assert_eq!(parse_duration_seconds(""), None);
        assert_eq!(parse_duration_seconds("a:b:c"), None);
    }
}
