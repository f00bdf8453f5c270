//! Time window validation and timestamp rendering.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::ValidationError;

/// A validated `[start, end]` window with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Combine separate date and time inputs and check their order
///
/// The date check runs first so the user sees the coarser mistake first.
pub fn validate_range(
    start_date: NaiveDate,
    start_time: NaiveTime,
    end_date: NaiveDate,
    end_time: NaiveTime,
) -> Result<DateTimeRange, ValidationError> {
    if end_date < start_date {
        return Err(ValidationError::EndDateBeforeStart);
    }

    let start = start_date.and_time(start_time);
    let end = end_date.and_time(end_time);
    if start >= end {
        return Err(ValidationError::EndNotAfterStart);
    }

    Ok(DateTimeRange { start, end })
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| invalid(field, value))
}

/// Parse an `HH:MM` or `HH:MM:SS` time
pub fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ValidationError> {
    let value_trimmed = value.trim();
    NaiveTime::parse_from_str(value_trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value_trimmed, "%H:%M"))
        .map_err(|_| invalid(field, value))
}

/// Render a timestamp the way stored samples are written
///
/// `YYYY-MM-DDTHH:MM:SS`, followed by `.ffffff` only when the value carries
/// sub-second precision.
pub fn isoformat(dt: &NaiveDateTime) -> String {
    let base = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    let micros = dt.nanosecond() % 1_000_000_000 / 1_000;
    if micros == 0 {
        base
    } else {
        format!("{base}.{micros:06}")
    }
}

fn invalid(field: &str, value: &str) -> ValidationError {
    ValidationError::InvalidInput {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date("date", s).unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        parse_time("time", s).unwrap()
    }

    #[test]
    fn test_valid_range() {
        let range =
            validate_range(date("2025-08-28"), time("08:00"), date("2025-08-28"), time("09:30"))
                .unwrap();
        assert_eq!(isoformat(&range.start), "2025-08-28T08:00:00");
        assert_eq!(isoformat(&range.end), "2025-08-28T09:30:00");
    }

    #[test]
    fn test_end_date_before_start() {
        let err =
            validate_range(date("2025-08-28"), time("08:00"), date("2025-08-27"), time("23:00"))
                .unwrap_err();
        assert_eq!(err, ValidationError::EndDateBeforeStart);
    }

    #[test]
    fn test_same_instant_rejected() {
        let err =
            validate_range(date("2025-08-28"), time("08:00"), date("2025-08-28"), time("08:00"))
                .unwrap_err();
        assert_eq!(err, ValidationError::EndNotAfterStart);
    }

    #[test]
    fn test_same_day_earlier_end_time_rejected() {
        let err =
            validate_range(date("2025-08-28"), time("10:00"), date("2025-08-28"), time("09:00"))
                .unwrap_err();
        assert_eq!(err, ValidationError::EndNotAfterStart);
    }

    #[test]
    fn test_isoformat_fractional_seconds() {
        let dt = date("2025-08-28").and_hms_micro_opt(8, 0, 1, 250).unwrap();
        assert_eq!(isoformat(&dt), "2025-08-28T08:00:01.000250");
    }

    #[test]
    fn test_parse_time_accepts_seconds() {
        assert_eq!(time("07:05:09"), NaiveTime::from_hms_opt(7, 5, 9).unwrap());
        assert!(parse_time("start time", "7pm").is_err());
        assert!(parse_date("start date", "28/08/2025").is_err());
    }
}
