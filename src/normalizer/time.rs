use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S%:z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parses a feed timestamp into UTC.
///
/// Accepts RFC 3339, a space-separated datetime with offset, naive datetimes
/// (taken as UTC) and bare dates (midnight UTC). Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_rfc3339_converted_to_utc() {
        let ts = parse_timestamp("2024-03-01T01:30:00+02:00").unwrap();
        assert_eq!(ts.day(), 29);
        assert_eq!(ts.month(), 2);
        assert_eq!(ts.hour(), 23);
    }

    #[test]
    fn test_space_separated_with_offset() {
        let ts = parse_timestamp("2023-07-14 12:00:00+0000").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2023, 7, 14));
    }

    #[test]
    fn test_naive_datetime_is_utc() {
        let ts = parse_timestamp("2022-01-05T08:15:00").unwrap();
        assert_eq!(ts.hour(), 8);
        assert_eq!(parse_timestamp("2022-01-05 08:15:00"), Some(ts));
    }

    #[test]
    fn test_bare_date() {
        let ts = parse_timestamp("2021-12-31").unwrap();
        assert_eq!((ts.year(), ts.hour()), (2021, 0));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }
}
