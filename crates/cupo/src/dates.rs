//! Reservation date validation.
//!
//! A precondition gate only: parses the caller-supplied date string and
//! rejects dates before the current UTC calendar day. Never touches shared
//! state.

use chrono::{NaiveDate, Utc};

/// Accepted input formats, tried in order. First match wins.
pub const ACCEPTED_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("unrecognized date {0:?} (expected YYYY-MM-DD, DD/MM/YYYY or YYYY/MM/DD)")]
    Unrecognized(String),
    #[error("date {0} is in the past")]
    InPast(NaiveDate),
}

/// Parse a date string against the accepted formats.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DateError> {
    let raw = raw.trim();
    for format in ACCEPTED_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date);
        }
    }
    Err(DateError::Unrecognized(raw.to_string()))
}

/// Parse and reject dates strictly before `today`. `today` itself is valid.
pub fn validate_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, DateError> {
    let date = parse_date(raw)?;
    if date < today {
        return Err(DateError::InPast(date));
    }
    Ok(date)
}

/// Validate against the current UTC calendar day.
pub fn validate_request_date(raw: &str) -> Result<NaiveDate, DateError> {
    validate_date(raw, Utc::now().date_naive())
}
