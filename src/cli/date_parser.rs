//! Date parsing module for CLI arguments
//!
//! Accepted forms, all interpreted as UTC:
//! - "2023-01-01"
//! - "2023-01-01T10:30:00" or "2023-01-01 10:30:00"
//! - RFC 3339 such as "2023-01-01T10:30:00+02:00"

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Error types for date parsing
#[derive(Debug, thiserror::Error)]
pub enum DateParseError {
    #[error("Invalid date format: {input}. Expected YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS or RFC 3339")]
    InvalidFormat { input: String },

    #[error("Date range validation failed: start date {start} is after end date {end}")]
    InvalidRange { start: String, end: String },
}

/// Parse a date string into a UTC instant
///
/// # Examples
///
/// ```
/// use smellslice::cli::date_parser::parse_date;
///
/// let midnight = parse_date("2023-01-01").unwrap();
/// let later = parse_date("2023-01-01T10:30:00").unwrap();
/// assert!(midnight < later);
/// ```
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = input.trim();
    let invalid = || DateParseError::InvalidFormat {
        input: input.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&midnight))
}

/// Parse an optional start and end, checking start <= end
pub fn parse_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), DateParseError> {
    let start_time = start.map(parse_date).transpose()?;
    let end_time = end.map(parse_date).transpose()?;

    if let (Some(s), Some(e)) = (start_time, end_time) {
        if s > e {
            return Err(DateParseError::InvalidRange {
                start: start.unwrap_or_default().to_string(),
                end: end.unwrap_or_default().to_string(),
            });
        }
    }
    Ok((start_time, end_time))
}

/// Validate that a date range is logical (start <= end)
pub fn validate_date_range(start: Option<&str>, end: Option<&str>) -> Result<(), DateParseError> {
    parse_date_range(start, end).map(|_| ())
}
