//! Regulator date handling.
//!
//! Dates are carried as `YYYYMMDD` strings. Extracts also arrive with
//! `YYYY-MM-DD` and `DD/MM/YYYY`, optionally followed by a time part.

use chrono::{Datelike, NaiveDate};

const FORMATS: [&str; 4] = ["%Y%m%d", "%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Parse a cell as a calendar date. Any time suffix is ignored.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);
    if date_part.is_empty() {
        return None;
    }
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// Render a date the way the regulator expects it.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Year of a date cell. Falls back to the first four digits of an
/// eight-digit value so impossible dates such as `99990231` still yield one.
pub fn date_year(value: &str) -> Option<i32> {
    if let Some(date) = parse_date(value) {
        return Some(date.year());
    }
    let trimmed = value.trim();
    if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed[..4].parse().ok();
    }
    None
}
