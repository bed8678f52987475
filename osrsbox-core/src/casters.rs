//! Primitive string casters shared by every field cleaner.

use crate::error::{CleanError, CleanResult};
use crate::models::RawValue;
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INT_RE: Regex = Regex::new(r"^[+-]?\d+$").unwrap();
    static ref ORDINAL_RE: Regex = Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref FOUR_DIGIT_YEAR_RE: Regex = Regex::new(r"(?:^|[ /-])\d{4}(?:$|[ /-])").unwrap();
}

const STRICT_DATE_FORMAT: &str = "%d %B %Y";

const NATURAL_DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%d %b %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
];

/// Cast to an integer. Empty text is `0`, not absence; non-numeric text is an error.
pub fn to_int(value: Option<&str>) -> CleanResult<Option<i64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(Some(0));
    }
    if !INT_RE.is_match(value) {
        return Err(CleanError::InvalidNumber(value.to_string()));
    }
    value
        .trim_start_matches('+')
        .parse()
        .map(Some)
        .map_err(|_| CleanError::InvalidNumber(value.to_string()))
}

pub fn to_float(value: Option<&str>) -> CleanResult<Option<f64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(CleanError::InvalidNumber(trimmed.to_string())),
    }
}

/// Cast yes/no style tokens. Anything unrecognised becomes `false` and is logged for review.
pub fn to_bool(value: Option<&str>) -> Option<bool> {
    let value = value?;
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        other => {
            tracing::warn!("Unrecognized boolean value {:?}, defaulting to false", other);
            Some(false)
        }
    }
}

/// Cast to a calendar date, strict `dd Month yyyy` first, then the lenient parser.
pub fn to_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    parse_with(value, &[STRICT_DATE_FORMAT]).or_else(|| parse_natural_date(value))
}

/// Best-effort date parsing for the layouts seen in infobox release fields.
pub fn parse_natural_date(value: &str) -> Option<NaiveDate> {
    let stripped: String = value
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ','))
        .collect();
    let stripped = ORDINAL_RE.replace_all(&stripped, "$1");
    let normalized = WHITESPACE_RE.replace_all(stripped.trim(), " ");
    if !FOUR_DIGIT_YEAR_RE.is_match(&normalized) {
        return None;
    }

    // Month and year only: first of the month
    if normalized.split(' ').count() == 2 {
        let with_day = format!("1 {}", normalized);
        return parse_with(&with_day, &["%d %B %Y", "%d %b %Y"]);
    }

    parse_with(&normalized, NATURAL_DATE_FORMATS)
}

/// First format that parses, keeping only four-digit years.
fn parse_with(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .find(|date| (1000..=9999).contains(&date.year()))
}

pub fn to_list(value: Option<&RawValue>) -> Option<Vec<String>> {
    match value? {
        RawValue::Text(s) => Some(vec![s.clone()]),
        RawValue::List(items) => Some(items.clone()),
    }
}
