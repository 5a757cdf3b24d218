use std::fmt::Display;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::ValueEnum;

/// This is the standard way of converting a date to a string in habit-journal.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Sunday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// `n` consecutive dates ending at `last`, oldest first.
pub fn last_n_dates(last: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n as i64)
        .rev()
        .map(|offset| last - Duration::days(offset))
        .collect()
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum DateStyle {
    #[default]
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

/// Accepts ISO dates (`2025-03-15`) as well as human input such as "yesterday" or "15/03/2025".
pub fn parse_day(value: &str, now: DateTime<Local>, style: DateStyle) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(value, now, style.into())
        .map(|v| v.date_naive())
        .map_err(|e| anyhow!("Failed to parse date {value:?}: {e}"))
}
