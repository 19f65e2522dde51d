//! Validation helpers for DTOs.

use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};
use validator::ValidationError;

/// Parse a start time given either as RFC 3339 or as `YYYY-MM-DD HH:MM` in UTC.
///
/// # Examples
///
/// ```ignore
/// parse_start_time("2026-05-01 20:30")          // Some(2026-05-01 20:30 UTC)
/// parse_start_time("2026-05-01T20:30:00+02:00") // Some(2026-05-01 18:30 UTC)
/// parse_start_time("tomorrow")                  // None
/// ```
pub fn parse_start_time(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }

    PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Validates that a start time uses one of the accepted formats.
pub fn validate_start_time(value: &str) -> Result<(), ValidationError> {
    if parse_start_time(value).is_some() {
        return Ok(());
    }

    let mut err = ValidationError::new("start_time_format");
    err.message = Some("Start time must be RFC 3339 or `YYYY-MM-DD HH:MM` (UTC)".into());
    Err(err)
}

/// Validates that a lobby title has visible characters and fits an embed title.
pub fn validate_title(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("title_blank");
        err.message = Some("Title must not be blank".into());
        return Err(err);
    }

    if value.chars().count() > 200 {
        let mut err = ValidationError::new("title_length");
        err.message = Some("Title must be at most 200 characters".into());
        return Err(err);
    }

    Ok(())
}
