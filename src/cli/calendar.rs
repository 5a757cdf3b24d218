use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use clap::Parser;

use crate::{
    calendar::{
        day_lines, entries_by_date, month_grid, week_dates, YearMonth, MONTH_CELL_LIMIT,
        WEEK_CELL_LIMIT,
    },
    storage::entities::{Entry, Habit},
    utils::time::date_to_key,
};

use super::{output::swatch, validation_error, App, DATE_HELP};

const WEEKDAYS: &str = "Sun Mon Tue Wed Thu Fri Sat";

#[derive(Debug, Parser)]
pub struct CalendarCommand {
    #[arg(short, long, help = DATE_HELP)]
    date: Option<String>,
    #[arg(long, help = "Show the week around the date instead of its month")]
    week: bool,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Months (or weeks with --week) to move from the date. Negative goes back"
    )]
    shift: i32,
    #[arg(long, conflicts_with_all = ["week", "shift"], help = "List every entry of the date")]
    day: bool,
}

pub async fn process_calendar_command(app: &App, command: CalendarCommand) -> Result<()> {
    let anchor = app.day(command.date.as_deref())?;
    let view = app.journal.load_view(app.remote()).await?;
    let by_date = entries_by_date(&view.entries);

    if command.day {
        print_day(app, &view.habits, &by_date, anchor);
    } else if command.week {
        print_week(app, &view.habits, &by_date, shift_week(anchor, command.shift)?);
    } else {
        print_month(app, &view.habits, &by_date, shift_month(anchor, command.shift)?);
    }
    Ok(())
}

fn shift_week(anchor: NaiveDate, shift: i32) -> Result<NaiveDate> {
    // a whole week either side has to exist for print_week
    anchor
        .checked_add_signed(Duration::weeks(shift as i64))
        .filter(|day| {
            day.checked_sub_signed(Duration::weeks(1)).is_some()
                && day.checked_add_signed(Duration::weeks(1)).is_some()
        })
        .ok_or_else(|| validation_error(format!("--shift {shift} leaves the supported dates")))
}

fn shift_month(anchor: NaiveDate, shift: i32) -> Result<YearMonth> {
    YearMonth::containing(anchor)
        .shifted(shift)
        .ok_or_else(|| validation_error(format!("--shift {shift} leaves the supported dates")))
}

/// `12•3` for the 12th with three entries.
fn month_cell(date: Option<NaiveDate>, by_date: &BTreeMap<NaiveDate, Vec<&Entry>>) -> String {
    let Some(date) = date else {
        return "    ".into();
    };
    match by_date.get(&date).map(|e| e.len()).unwrap_or_default() {
        0 => format!("{:>2}  ", date.day()),
        n => format!("{:>2}•{}", date.day(), n.min(9)),
    }
}

fn print_lines(habits: &[Habit], entries: &[&Entry], limit: usize) {
    let lines = day_lines(habits, entries);
    for line in lines.iter().take(limit) {
        println!("  {} {line}", swatch(Some(line.color.as_str())));
    }
    if lines.len() > limit {
        println!("  +{} more", lines.len() - limit);
    }
}

fn print_month(
    app: &App,
    habits: &[Habit],
    by_date: &BTreeMap<NaiveDate, Vec<&Entry>>,
    month: YearMonth,
) {
    println!("{}", app.heading(&month.to_string()));
    println!("{WEEKDAYS}");
    let cells = month_grid(month);
    for week in cells.chunks(7) {
        let row = week
            .iter()
            .map(|d| month_cell(*d, by_date))
            .collect::<Vec<_>>();
        println!("{}", row.join("").trim_end());
    }

    for date in cells.iter().flatten() {
        let Some(entries) = by_date.get(date) else {
            continue;
        };
        println!("{}", date_to_key(*date));
        print_lines(habits, entries, MONTH_CELL_LIMIT);
    }
}

fn print_week(
    app: &App,
    habits: &[Habit],
    by_date: &BTreeMap<NaiveDate, Vec<&Entry>>,
    anchor: NaiveDate,
) {
    let dates = week_dates(anchor);
    println!(
        "{}",
        app.heading(&format!(
            "{} → {}",
            date_to_key(dates[0]),
            date_to_key(dates[dates.len() - 1])
        ))
    );
    for date in &dates {
        println!("{} {}", date.format("%a"), date_to_key(*date));
        match by_date.get(date) {
            Some(entries) => print_lines(habits, entries, WEEK_CELL_LIMIT),
            None => println!("  —"),
        }
    }
}

fn print_day(
    app: &App,
    habits: &[Habit],
    by_date: &BTreeMap<NaiveDate, Vec<&Entry>>,
    date: NaiveDate,
) {
    println!("{}", app.heading(&date.format("%A %Y-%m-%d").to_string()));
    match by_date.get(&date) {
        Some(entries) => {
            for line in day_lines(habits, entries) {
                println!(
                    "  {} {line}\t{}",
                    swatch(Some(line.color.as_str())),
                    line.entry_id
                );
            }
        }
        None => println!("  No entries"),
    }
}
