//! Calendar bucketing helpers
//!
//! Weeks start on Monday and are labelled with their ISO-8601 week number.
//! Months are keyed `YYYY-MM`.

use chrono::{Datelike, Duration, NaiveDate};

/// Monday of the week containing `date` (Sunday belongs to the week before)
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Inclusive last day of a week starting at `start`
pub fn week_end(start: NaiveDate) -> NaiveDate {
    start + Duration::days(6)
}

/// ISO week label, `"W01"`..`"W53"`
///
/// Thursday-anchored: 2025-12-29 is `W01` because that week's Thursday
/// falls in 2026.
pub fn iso_week_label(date: NaiveDate) -> String {
    format!("W{:02}", date.iso_week().week())
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    next_month.map_or(date, |d| d - Duration::days(1))
}

/// Month key, `"YYYY-MM"`
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Display label for a month, e.g. `"Dec 2025"`
pub fn month_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

/// Whether the inclusive ranges `[a_start, a_end]` and `[b_start, b_end]` share a day
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}
