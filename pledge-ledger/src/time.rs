//! Timestamp utilities
//!
//! Ledger timestamps are stored as RFC 3339 text. Sub-second digits are
//! written only as far as needed (0, 3, 6 or 9) and the original UTC offset is
//! kept, so a value read back compares equal to the value written.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Encode a timestamp for storage
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Whether `ts` survives an encode/decode round trip
///
/// RFC 3339 only has four-digit years; chrono writes years outside
/// 0000..=9999 in an extended form that cannot be read back.
pub fn is_storable(ts: &DateTime<FixedOffset>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Decode a stored timestamp
///
/// Accepts RFC 3339 (`T` or space separator). Values written without an
/// offset by older tooling are read as UTC. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts);
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        // After 2000-01-01 and before 2100-01-01
        assert!(timestamp.timestamp() > 946_684_800);
        assert!(timestamp.timestamp() < 4_102_444_800);
    }

    #[test]
    fn test_round_trip_keeps_nanoseconds_and_offset() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let ts = offset
            .with_ymd_and_hms(2024, 3, 1, 18, 30, 5)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();

        let encoded = format_timestamp(&ts);
        assert_eq!(encoded, "2024-03-01T18:30:05.123456789-05:00");

        let decoded = parse_timestamp(&encoded).unwrap();
        assert_eq!(decoded, ts);
        assert_eq!(decoded.offset(), ts.offset());
    }

    #[test]
    fn test_whole_seconds_have_no_fraction() {
        let ts = Utc
            .with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
            .unwrap()
            .fixed_offset();
        assert_eq!(format_timestamp(&ts), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_microsecond_iso_format() {
        let decoded = parse_timestamp("2024-03-01T18:30:05.123456+00:00").unwrap();
        assert_eq!(decoded.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_naive_reads_as_utc() {
        let decoded = parse_timestamp("2024-03-01 18:30:05.5").unwrap();
        assert_eq!(decoded.offset().local_minus_utc(), 0);
        assert_eq!(decoded.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_storable_years() {
        let last = Utc
            .with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
            .unwrap()
            .fixed_offset();
        assert!(is_storable(&last));
        assert!(parse_timestamp(&format_timestamp(&last)).is_some());

        let beyond = Utc
            .with_ymd_and_hms(10000, 1, 1, 0, 0, 0)
            .unwrap()
            .fixed_offset();
        assert!(!is_storable(&beyond));
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_timestamp("not-a-time").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
