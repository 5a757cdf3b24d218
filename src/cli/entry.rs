use anyhow::Result;
use clap::Subcommand;
use tracing::warn;

use crate::{
    calendar::day_lines,
    journal::entries::EntryForm,
    storage::entities::Entry,
    utils::time::date_to_key,
};

use super::{finite_number, output::swatch, resolve_habit, App, DATE_HELP};

const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Debug, Subcommand)]
pub enum EntryCommand {
    #[command(about = "Record a value for a habit")]
    Add {
        #[arg(help = "Id or name of the habit")]
        habit: String,
        #[arg(allow_negative_numbers = true, value_parser = finite_number)]
        value: Option<f64>,
        #[arg(short, long, help = DATE_HELP)]
        date: Option<String>,
    },
    #[command(about = "Most recent entries, newest first")]
    List {
        #[arg(long, help = "Only entries of this habit (id or name)")]
        habit: Option<String>,
        #[arg(short = 'n', long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    #[command(about = "Delete a local entry")]
    Delete { id: String },
}

/// Sorts by entry date, newest first. Same-day entries keep their stored order.
fn newest_first<'a>(entries: impl Iterator<Item = &'a Entry>, limit: usize) -> Vec<&'a Entry> {
    let mut sorted = entries.collect::<Vec<_>>();
    sorted.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
    sorted.truncate(limit);
    sorted
}

pub async fn process_entry_command(app: &App, command: EntryCommand) -> Result<()> {
    match command {
        EntryCommand::Add { habit, value, date } => {
            let view = app.journal.load_view(app.remote()).await?;
            let habit_id = match resolve_habit(&view.habits, &habit) {
                Some(found) => found.id.clone(),
                None => {
                    warn!("No habit matches {habit:?}, recording against it as an id");
                    habit
                }
            };
            let form = EntryForm {
                habit_id,
                value,
                date: date.as_deref().map(|d| app.day(Some(d))).transpose()?,
            };
            let (entry, outcome) = app.journal.add_entry(app.remote(), form).await?;
            println!(
                "{} ({} on {})",
                outcome.describe("Entry"),
                entry.id,
                date_to_key(entry.entry_date)
            );
        }
        EntryCommand::List { habit, limit } => {
            let view = app.journal.load_view(app.remote()).await?;
            let habit_id = habit.map(|key| {
                resolve_habit(&view.habits, &key).map_or(key, |h| h.id.clone())
            });
            let entries = newest_first(
                view.entries
                    .iter()
                    .filter(|e| habit_id.as_ref().map_or(true, |id| e.habit_id == *id)),
                limit,
            );
            if entries.is_empty() {
                println!("No entries");
                return Ok(());
            }
            for (entry, line) in entries.iter().zip(day_lines(&view.habits, &entries)) {
                println!(
                    "{}  {} {}\t{}",
                    date_to_key(entry.entry_date),
                    swatch(Some(line.color.as_str())),
                    line,
                    entry.id
                );
            }
        }
        EntryCommand::Delete { id } => {
            if app.journal.delete_entry(&id).await? {
                println!("Entry deleted");
            } else {
                println!("No local entry {id}");
            }
        }
    }
    Ok(())
}
