//! Brazilian number and date handling.
//!
//! Numbers use `.` as the thousands separator and `,` as the decimal
//! separator (`1.234,56`). Dates are day-first (`05/03/2024`).
//! Parsing is total: anything that does not fit becomes [`CellValue::Missing`].

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use crate::error::CellParseFailure;
use crate::models::CellValue;

static DAY_FIRST_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})(?:[ T].*)?$").unwrap()
});

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[ T].*)?$").unwrap()
});

// Parses decimals like "1.234,56" or "123,45"
pub fn try_parse_number(raw: &str) -> Result<f64, CellParseFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CellParseFailure::Empty);
    }

    let normalized = trimmed
        .replace('.', "") // Remove thousand separators
        .replacen(',', ".", 1);

    match f64::from_str(&normalized) {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CellParseFailure::Malformed {
            raw: raw.to_string(),
            expected: "number",
        }),
    }
}

pub fn parse_number(raw: &str) -> CellValue {
    collapse(try_parse_number(raw).map(CellValue::Number))
}

pub fn try_parse_date(raw: &str) -> Result<NaiveDate, CellParseFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CellParseFailure::Empty);
    }

    let malformed = || CellParseFailure::Malformed {
        raw: raw.to_string(),
        expected: "date",
    };

    let (year, month, day) = if let Some(caps) = ISO_DATE.captures(trimmed) {
        (caps[1].parse::<i32>(), caps[2].parse::<u32>(), caps[3].parse::<u32>())
    } else if let Some(caps) = DAY_FIRST_DATE.captures(trimmed) {
        let year = caps[3].parse::<i32>().map(|y| {
            if caps[3].len() == 2 {
                expand_two_digit_year(y)
            } else {
                y
            }
        });
        (year, caps[2].parse::<u32>(), caps[1].parse::<u32>())
    } else {
        return Err(malformed());
    };

    match (year, month, day) {
        (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d).ok_or_else(malformed),
        _ => Err(malformed()),
    }
}

pub fn parse_date(raw: &str) -> CellValue {
    collapse(try_parse_date(raw).map(CellValue::Date))
}

// 00-68 -> 2000s, 69-99 -> 1900s
fn expand_two_digit_year(year: i32) -> i32 {
    if year < 69 {
        2000 + year
    } else {
        1900 + year
    }
}

fn collapse(result: Result<CellValue, CellParseFailure>) -> CellValue {
    match result {
        Ok(value) => value,
        Err(CellParseFailure::Empty) => CellValue::Missing,
        Err(err) => {
            tracing::trace!("Cell degraded to missing: {}", err);
            CellValue::Missing
        }
    }
}

/// Rounds half away from zero and groups thousands with `.`:
/// `1234567.4` becomes `"1.234.567"`. Magnitudes past `i64` keep every digit.
pub fn format_number(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) => {
            let rounded = n.round();
            group_thousands(&format!("{:.0}", rounded.abs()), rounded < 0.0)
        }
        CellValue::Missing => String::new(),
        other => other.to_string(),
    }
}

fn group_thousands(digits: &str, negative: bool) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_date(value: &CellValue) -> String {
    match value {
        CellValue::Date(date) => date.format("%d/%m/%Y").to_string(),
        CellValue::Missing => String::new(),
        // Not a date: show whatever the cell holds
        other => other.to_string(),
    }
}
