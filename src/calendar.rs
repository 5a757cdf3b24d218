//! Calendar layout: Sunday-first month grids, weeks around an anchor day and per-day listings.

use std::{collections::BTreeMap, fmt::Display};

use anyhow::{anyhow, Result};
use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::{
    storage::entities::{find_habit, Entry, Habit},
    utils::time::week_start,
};

pub const PLACEHOLDER_HABIT: &str = "Habit";
pub const DEFAULT_DOT_COLOR: &str = "#14C38E";
/// Entries shown per cell, the rest is only visible in the day listing.
pub const MONTH_CELL_LIMIT: usize = 4;
pub const WEEK_CELL_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| Self { first })
            .ok_or_else(|| anyhow!("{year}-{month} is not a valid month"))
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn days(&self) -> u32 {
        let next = self.next().first;
        (next - self.first).num_days() as u32
    }

    pub fn prev(&self) -> Self {
        Self {
            first: self.first - Months::new(1),
        }
    }

    pub fn next(&self) -> Self {
        Self {
            first: self.first + Months::new(1),
        }
    }

    /// Month `months` away, or `None` when it falls outside the supported date range.
    pub fn shifted(&self, months: i32) -> Option<Self> {
        let delta = Months::new(months.unsigned_abs());
        let first = if months < 0 {
            self.first.checked_sub_months(delta)?
        } else {
            self.first.checked_add_months(delta)?
        };
        // days() looks at the following month
        first.checked_add_months(Months::new(1))?;
        Some(Self { first })
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.first.format("%B %Y"))
    }
}

/// Cells of a month laid out in weeks starting on Sunday. Leading `None`s pad the first week.
pub fn month_grid(month: YearMonth) -> Vec<Option<NaiveDate>> {
    let padding = month.first_day().weekday().num_days_from_sunday() as usize;
    let days = (0..month.days()).map(|offset| Some(month.first_day() + Duration::days(offset as i64)));
    std::iter::repeat(None).take(padding).chain(days).collect()
}

/// The seven days of the Sunday-started week containing `anchor`.
pub fn week_dates(anchor: NaiveDate) -> Vec<NaiveDate> {
    let start = week_start(anchor);
    (0..7).map(|i| start + Duration::days(i)).collect()
}

pub fn entries_by_date(entries: &[Entry]) -> BTreeMap<NaiveDate, Vec<&Entry>> {
    let mut by_date = BTreeMap::<NaiveDate, Vec<&Entry>>::new();
    for entry in entries {
        by_date.entry(entry.entry_date).or_default().push(entry);
    }
    by_date
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayLine {
    pub entry_id: String,
    pub habit_name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub color: String,
}

impl Display for DayLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} — {}", self.habit_name, self.value)?;
        match self.unit.as_deref() {
            Some(unit) if !unit.is_empty() => write!(f, " {unit}"),
            _ => Ok(()),
        }
    }
}

pub fn day_lines(habits: &[Habit], entries: &[&Entry]) -> Vec<DayLine> {
    entries
        .iter()
        .map(|entry| {
            let habit = find_habit(habits, &entry.habit_id);
            DayLine {
                entry_id: entry.id.clone(),
                habit_name: habit.map_or(PLACEHOLDER_HABIT, |h| h.name.as_str()).into(),
                value: entry.value,
                unit: habit.and_then(|h| h.unit.clone()),
                color: habit
                    .and_then(|h| h.color.clone())
                    .unwrap_or_else(|| DEFAULT_DOT_COLOR.into()),
            }
        })
        .collect()
}
