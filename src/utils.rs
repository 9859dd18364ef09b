use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Parses a date of birth given either as `YYYY-MM-DD` or as an RFC 3339
/// timestamp. Only the calendar date of a timestamp is kept.
pub fn parse_date_of_birth(text: &str) -> Result<Date> {
    let plain = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(text, plain) {
        return Ok(date);
    }
    OffsetDateTime::parse(text, &Rfc3339)
        .map(|ts| ts.date())
        .with_context(|| format!("invalid date_of_birth: {text}"))
}
