// src/utils/date.rs

//! Loose date handling for harvested metadata.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Tabular date format (day-month-year).
pub const DAY_MONTH_YEAR: &str = "%d-%m-%Y";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a loosely formatted date into a calendar date.
///
/// Returns `None` for partial dates (year only, year-month) and anything
/// that does not name a single day.
pub fn parse_loose(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        })
}

/// Format a date field for tabular export.
///
/// Full dates become `DD-MM-YYYY`; anything else is kept verbatim so no
/// information is invented or lost.
///
/// # Examples
/// ```
/// use harvester::utils::date::day_month_year;
///
/// assert_eq!(day_month_year("2021-03-04"), "04-03-2021");
/// assert_eq!(day_month_year("2021"), "2021");
/// ```
pub fn day_month_year(raw: &str) -> String {
    match parse_loose(raw) {
        Some(date) => date.format(DAY_MONTH_YEAR).to_string(),
        None => raw.trim().to_string(),
    }
}

/// Build a date string from CSL-style `date-parts` (`[year, month?, day?]`).
pub fn from_parts(parts: &[i64]) -> Option<String> {
    match parts {
        [y, m, d, ..] => Some(format!("{y:04}-{m:02}-{d:02}")),
        [y, m] => Some(format!("{y:04}-{m:02}")),
        [y] => Some(format!("{y:04}")),
        [] => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_month_year_formats() {
        assert_eq!(day_month_year("2021-03-04"), "04-03-2021");
        assert_eq!(day_month_year("2021/03/04"), "04-03-2021");
        assert_eq!(day_month_year("2021-03-04T10:11:12Z"), "04-03-2021");
        assert_eq!(day_month_year("2021-03-04T10:11:12.345"), "04-03-2021");
    }

    #[test]
    fn test_day_month_year_is_idempotent() {
        let once = day_month_year("2019-12-31");
        assert_eq!(day_month_year(&once), once);
    }

    #[test]
    fn test_partial_and_garbage_dates_kept() {
        assert_eq!(day_month_year("2020-05"), "2020-05");
        assert_eq!(day_month_year("Spring 2020"), "Spring 2020");
        assert_eq!(day_month_year(""), "");
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(from_parts(&[2020, 1, 9]), Some("2020-01-09".to_string()));
        assert_eq!(from_parts(&[2020, 11]), Some("2020-11".to_string()));
        assert_eq!(from_parts(&[1999]), Some("1999".to_string()));
        assert_eq!(from_parts(&[]), None);
    }
}
