//! Date helper functions

use chrono::{DateTime, Datelike, FixedOffset, TimeZone};

/// Format a publication date as `dd MMM yyyy` with localized month names
///
/// # Examples
/// ```ignore
/// short_date(&date, chrono_tz::UTC, &months) // -> "12 set 2021"
/// ```
pub fn short_date<Tz: TimeZone>(date: &DateTime<FixedOffset>, tz: Tz, months: &[String]) -> String {
    let local = date.with_timezone(&tz);
    let month = months
        .get(local.month0() as usize)
        .cloned()
        .unwrap_or_else(|| format!("{:02}", local.month()));
    format!("{:02} {} {}", local.day(), month, local.year())
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}
