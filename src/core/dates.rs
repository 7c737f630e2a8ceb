//! Calendar helpers.
//!
//! All billing arithmetic happens on whole UTC days: timestamps are truncated
//! to their date before subtracting, so "days late" never depends on the time
//! of day a loan was created or a payment arrived.

use chrono::{DateTime, NaiveDate, NaiveTime, ParseError, Utc};

/// Format used for dates crossing the engine boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The UTC calendar day of a timestamp.
pub fn day_of(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Midnight UTC at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Whole days from `earlier` to `later`; negative when `later` comes first.
pub fn days_between(later: NaiveDate, earlier: NaiveDate) -> i64 {
    (later - earlier).num_days()
}
