use anyhow::Result;
use clap::Subcommand;

use crate::{
    export::format_number,
    journal::suggestions::Suggestion,
    stats::{dashboard, insight::weekly_insight, DashboardSummary},
    utils::time::date_to_key,
};

use super::{
    output::{bar, swatch},
    validation_error, App,
};

const BAR_WIDTH: usize = 24;
const NO_VALUE: &str = "—";

#[derive(Debug, Subcommand)]
pub enum SuggestCommand {
    #[command(about = "Create a habit from a suggestion")]
    Add {
        #[arg(help = "Number shown in the list or the suggestion title")]
        suggestion: String,
    },
}

pub async fn print_dashboard(app: &App) -> Result<()> {
    let view = app.journal.load_view(app.remote()).await?;
    let summary = dashboard(&view.habits, &view.entries, app.today());
    print_summary(app, &summary);
    Ok(())
}

fn print_summary(app: &App, summary: &DashboardSummary) {
    println!("{}", app.heading("Overview"));
    println!(
        "Completion\t{}",
        summary
            .completion
            .map_or_else(|| NO_VALUE.to_string(), |v| v.to_string())
    );
    println!("Active habits\t{}", summary.active_habits);
    println!("Tracked days\t{}", summary.tracked_days);

    println!();
    println!("{}", app.heading("Last 7 days"));
    let busiest = summary
        .weekly_activity
        .iter()
        .map(|d| d.count)
        .max()
        .unwrap_or_default();
    for day in &summary.weekly_activity {
        println!(
            "{} {}\t{} {}",
            day.date.format("%a"),
            date_to_key(day.date),
            day.count,
            bar(day.count as f64, busiest as f64, BAR_WIDTH)
        );
    }

    if !summary.activity_share.is_empty() {
        println!();
        println!("{}", app.heading("Activity share"));
        let largest = summary
            .activity_share
            .iter()
            .map(|s| s.value)
            .fold(0., f64::max);
        for share in &summary.activity_share {
            println!(
                "{} {}\t{} {}",
                swatch(Some(share.color.as_str())),
                share.name,
                format_number(share.value),
                bar(share.value, largest, BAR_WIDTH)
            );
        }
    }

    println!();
    println!("{}", app.heading("Timeline"));
    if summary.timeline.is_empty() {
        println!("No entries yet");
    }
    for item in &summary.timeline {
        let unit = if item.unit.is_empty() {
            String::new()
        } else {
            format!(" {}", item.unit)
        };
        println!(
            "{}  {} — {}{}",
            date_to_key(item.entry.entry_date),
            item.habit_name,
            format_number(item.entry.value),
            unit
        );
    }
}

pub async fn print_insight(app: &App) -> Result<()> {
    let view = app.journal.load_view(app.remote()).await?;
    let insight = weekly_insight(&view.habits, &view.entries, app.today());
    println!("{}\t{insight}", app.heading("Weekly insight"));
    Ok(())
}

/// Accepts the 1-based position in the list or a title, ignoring case.
fn pick_suggestion<'a>(suggestions: &'a [Suggestion], key: &str) -> Option<&'a Suggestion> {
    let key = key.trim();
    match key.parse::<usize>() {
        Ok(position) => position.checked_sub(1).and_then(|i| suggestions.get(i)),
        Err(_) => suggestions.iter().find(|s| s.title.eq_ignore_ascii_case(key)),
    }
}

pub async fn process_suggest_command(app: &App, command: Option<SuggestCommand>) -> Result<()> {
    let suggestions = app.journal.suggestions().await?;
    match command {
        None => {
            if suggestions.is_empty() {
                println!("No suggestions, keep going");
                return Ok(());
            }
            println!("{}", app.heading("Suggestions"));
            for (i, suggestion) in suggestions.iter().enumerate() {
                println!("{}. {}\t{}", i + 1, suggestion.title, suggestion.reason);
            }
        }
        Some(SuggestCommand::Add { suggestion }) => {
            let Some(picked) = pick_suggestion(&suggestions, &suggestion) else {
                return Err(validation_error(format!(
                    "No suggestion {suggestion:?}, run `suggest` to see the list"
                )));
            };
            let habit = app.journal.create_habit_from_suggestion(picked).await?;
            println!("Habit saved locally ({})", habit.id);
        }
    }
    Ok(())
}
