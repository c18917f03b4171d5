//! Calendar date parsing and formatting.
//!
//! Dates are stored canonically as `YYYY-MM-DD` and shown as `DD-MM-YYYY`. Both forms are
//! parsed strictly: fixed width, `-` separators and a date that exists on the calendar.

use chrono::NaiveDate;

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";
pub const DISPLAY_FORMAT: &str = "%d-%m-%Y";

/// Parses `DD-MM-YYYY`.
pub fn parse_display(input: &str) -> Option<NaiveDate> {
    let &[d1, d2, b'-', m1, m2, b'-', y1, y2, y3, y4] = input.as_bytes() else {
        return None;
    };
    let day = number(&[d1, d2])?;
    let month = number(&[m1, m2])?;
    let year = number(&[y1, y2, y3, y4])?;
    calendar_date(year, month, day)
}

/// Parses `YYYY-MM-DD`.
pub fn parse_canonical(input: &str) -> Option<NaiveDate> {
    let &[y1, y2, y3, y4, b'-', m1, m2, b'-', d1, d2] = input.as_bytes() else {
        return None;
    };
    let year = number(&[y1, y2, y3, y4])?;
    let month = number(&[m1, m2])?;
    let day = number(&[d1, d2])?;
    calendar_date(year, month, day)
}

/// Accepts either supported form after trimming surrounding whitespace.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    parse_display(trimmed).or_else(|| parse_canonical(trimmed))
}

pub fn to_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

pub fn to_canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

pub fn display_to_canonical(input: &str) -> Option<String> {
    parse_display(input.trim()).map(to_canonical)
}

pub fn canonical_to_display(input: &str) -> Option<String> {
    parse_canonical(input.trim()).map(to_display)
}

fn number(digits: &[u8]) -> Option<u32> {
    digits.iter().try_fold(0u32, |acc, b| {
        b.is_ascii_digit().then(|| acc * 10 + u32::from(b - b'0'))
    })
}

fn calendar_date(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    if year == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}
