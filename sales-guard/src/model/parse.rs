//! Cell-level value parsers.
//!
//! Every parser returns `None` for text it cannot interpret; the caller turns
//! that into [`Field::Malformed`](super::Field::Malformed).

use chrono::NaiveDate;

/// Default date formats, tried in order.
pub const DEFAULT_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%Y/%m/%d"];

/// Parses a currency or plain decimal amount.
///
/// Accepts an optional `$` and thousands separators: `"$1,234.50"`,
/// `"-$12.00"` and `"261.96"` all parse. Non-finite values are rejected.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses a discount fraction. A trailing `%` means the value is a percentage.
pub fn parse_discount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    match trimmed.strip_suffix('%') {
        Some(percent) => parse_decimal(percent).map(|value| value / 100.0),
        None => parse_decimal(trimmed),
    }
}

/// Parses an integer, also accepting integral decimals such as `"3.0"`.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Parses dates against an ordered list of `chrono` format strings.
#[derive(Debug, Clone)]
pub struct DateParser {
    formats: Vec<String>,
}

impl DateParser {
    /// Creates a parser trying `formats` in order.
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the configured formats.
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Parses a date, ignoring a trailing time component
    /// (`"2016-11-08 00:00:00"` parses as 2016-11-08).
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let trimmed = raw.trim();
        let date_part = trimmed
            .split(|c: char| c == ' ' || c == 'T')
            .next()
            .unwrap_or(trimmed);
        self.formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS.iter().copied())
    }
}
