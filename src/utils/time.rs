use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};

use crate::service::attendance::AttendanceError;

/// Layouts accepted for timestamps that carry no UTC offset.
const NAIVE_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a client timestamp into its wall-clock value.
///
/// RFC 3339 strings keep the clock time they were written with (the offset
/// is dropped, not applied), matching how the console displays them.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, AttendanceError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }

    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .ok_or_else(|| AttendanceError::MalformedTimestamp(raw.to_string()))
}

/// Minutes since midnight, seconds ignored (08:30:59 => 510).
pub fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Parse an `HH:MM` policy time such as `08:00`.
pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
}

pub fn format_hhmm(value: &NaiveDateTime) -> String {
    value.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn parses_iso_with_zulu_suffix() {
        assert_eq!(parse_timestamp("2024-01-01T09:00:00Z").unwrap(), at(9, 0, 0));
    }

    #[test]
    fn keeps_wall_clock_of_offset_timestamps() {
        assert_eq!(
            parse_timestamp("2024-01-01T08:10:00+07:00").unwrap(),
            at(8, 10, 0)
        );
    }

    #[test]
    fn parses_space_separated_and_fractional_forms() {
        assert_eq!(parse_timestamp("2024-01-01 17:05:30").unwrap(), at(17, 5, 30));
        assert_eq!(
            parse_timestamp("2024-01-01T07:45:00.123").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_milli_opt(7, 45, 0, 123)
                .unwrap()
        );
        assert_eq!(parse_timestamp("2024-01-01 07:45").unwrap(), at(7, 45, 0));
    }

    #[test]
    fn rejects_unparseable_time_portion() {
        let err = parse_timestamp("2024-01-01Tnine:00").unwrap_err();
        assert!(matches!(err, AttendanceError::MalformedTimestamp(ref s) if s == "2024-01-01Tnine:00"));
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("2024-01-01").is_err());
    }

    #[test]
    fn minutes_of_day_ignores_seconds() {
        assert_eq!(minutes_of_day(at(8, 30, 59).time()), 510);
        assert_eq!(minutes_of_day(at(0, 0, 0).time()), 0);
    }

    #[test]
    fn hhmm_round_trip_for_policy_times() {
        let t = parse_hhmm(" 17:00 ").unwrap();
        assert_eq!(minutes_of_day(t), 1020);
        assert!(parse_hhmm("5pm").is_err());
        assert_eq!(format_hhmm(&at(7, 5, 0)), "07:05");
    }
}
