//! Thai Buddhist-era calendar adapter.
//!
//! Storage and querying use Gregorian ISO dates (`YYYY-MM-DD`) everywhere. Display
//! uses the Thai civil calendar, which shares month and day with the Gregorian
//! calendar and offsets the year by a fixed 543 years. Conversion happens only at
//! the display edge; any date picker must convert back before storage so the rest
//! of the system never sees a Buddhist-era year.

use chrono::{Datelike, NaiveDate};

use crate::{ReferError, ReferResult};

/// Fixed year offset between the Gregorian and Thai Buddhist-era calendars.
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Format a stored Gregorian date for display as `DD/MM/YYYY` in the Buddhist era.
pub fn format_thai(date: NaiveDate) -> String {
    format!(
        "{:02}/{:02}/{}",
        date.day(),
        date.month(),
        date.year() + BUDDHIST_ERA_OFFSET
    )
}

/// Parse a Buddhist-era display value (`DD/MM/YYYY`) back into a Gregorian date.
pub fn parse_thai(text: &str) -> ReferResult<NaiveDate> {
    let mut parts = text.trim().split('/');
    let (day, month, year) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(d), Some(m), Some(y), None) => (d, m, y),
        _ => return Err(ReferError::InvalidDate),
    };

    let day: u32 = day.parse().map_err(|_| ReferError::InvalidDate)?;
    let month: u32 = month.parse().map_err(|_| ReferError::InvalidDate)?;
    let year: i32 = year.parse().map_err(|_| ReferError::InvalidDate)?;

    NaiveDate::from_ymd_opt(year - BUDDHIST_ERA_OFFSET, month, day)
        .ok_or(ReferError::InvalidDate)
}

/// Parse a stored Gregorian ISO date string.
pub fn parse_iso(text: &str) -> ReferResult<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| ReferError::InvalidDate)
}
