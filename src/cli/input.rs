use std::fmt::Display;

use anyhow::{anyhow, ensure, Context, Result};
use chrono::{DateTime, Local};
use chrono_english::parse_date_string;
use clap::ValueEnum;

use crate::utils::time::{date_to_record_name, parse_record_date};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Normalizes a user supplied date into `YYYY-MM-DD`. Accepts that form directly as well as
/// expressions like "yesterday", "3 days ago" or "15/03/2024".
pub fn parse_date(value: &str, style: DateStyle, now: DateTime<Local>) -> Result<String> {
    let value = value.trim();
    if let Ok(date) = parse_record_date(value) {
        return Ok(date_to_record_name(date));
    }
    let parsed = parse_date_string(value, now, style.into())
        .map_err(|e| anyhow!("Can't parse {value:?} into a date: {e}"))?;
    Ok(date_to_record_name(parsed.date_naive()))
}

/// Parses a finite number. `f64::from_str` also takes "nan" and "inf", which can't be stored.
pub fn parse_number(value: &str, field: &str) -> Result<f64> {
    let value = value.trim();
    let number = value
        .parse::<f64>()
        .with_context(|| format!("{field} should be a number, got {value:?}"))?;
    ensure!(
        number.is_finite(),
        "{field} should be a finite number, got {value:?}"
    );
    Ok(number)
}

/// clap `value_parser` for numeric arguments.
pub fn parse_finite(value: &str) -> Result<f64> {
    parse_number(value, "Value")
}

/// Blank input means "not supplied".
pub fn parse_optional_number(value: &str, field: &str) -> Result<Option<f64>> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse_number(value, field).map(Some)
    }
}

pub fn parse_optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Converts a 1-based number shown next to an activity into a store position.
pub fn display_number_to_index(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()?.checked_sub(1)
}
