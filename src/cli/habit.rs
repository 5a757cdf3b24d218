use anyhow::Result;
use clap::Subcommand;

use crate::{
    export::format_number,
    journal::habits::{find_template, HabitChanges, HabitForm, TEMPLATES},
    storage::entities::{Entry, Habit},
};

use super::{
    finite_number, output::hex_colour, output::swatch, resolve_habit, validation_error, App,
};

#[derive(Debug, Subcommand)]
pub enum HabitCommand {
    #[command(about = "Create a habit")]
    Add {
        name: String,
        #[arg(short, long, help = "Unit of measurement. Defaults to \"units\"")]
        unit: Option<String>,
        #[arg(short, long, value_parser = finite_number, help = "Daily goal in units")]
        goal: Option<f64>,
        #[arg(short, long, help = "Colour in #RRGGBB form")]
        color: Option<String>,
        #[arg(short, long, value_parser = finite_number, help = "Record today's progress for the new habit")]
        today: Option<f64>,
    },
    #[command(about = "Change a habit. Only given fields are updated")]
    Edit {
        #[arg(help = "Id or name of the habit")]
        habit: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        unit: Option<String>,
        #[arg(short, long, value_parser = finite_number, conflicts_with = "clear_goal")]
        goal: Option<f64>,
        #[arg(long, help = "Remove the daily goal")]
        clear_goal: bool,
        #[arg(short, long, help = "Colour in #RRGGBB form")]
        color: Option<String>,
        #[arg(short, long, value_parser = finite_number, help = "Set today's progress")]
        today: Option<f64>,
    },
    #[command(about = "List habits with today's progress")]
    List,
    #[command(about = "Delete a habit. Its entries are kept")]
    Delete {
        #[arg(help = "Id or name of the habit")]
        habit: String,
    },
    #[command(about = "List the built-in templates or create a habit from one")]
    Template { name: Option<String> },
}

fn checked_colour(color: Option<String>) -> Result<Option<String>> {
    match color {
        Some(color) if hex_colour(&color).is_none() => Err(validation_error(format!(
            "{color:?} is not a colour, expected something like #14C38E"
        ))),
        color => Ok(color),
    }
}

fn goal_text(habit: &Habit) -> String {
    match habit.daily_goal {
        Some(goal) => format!("{} {}", format_number(goal), habit.unit_label()),
        None => "no goal".into(),
    }
}

fn today_total(entries: &[Entry], habit: &Habit, today: chrono::NaiveDate) -> f64 {
    entries
        .iter()
        .filter(|e| e.habit_id == habit.id && e.entry_date == today)
        .map(|e| e.value)
        .sum()
}

pub async fn process_habit_command(app: &App, command: HabitCommand) -> Result<()> {
    match command {
        HabitCommand::Add {
            name,
            unit,
            goal,
            color,
            today,
        } => {
            let form = HabitForm {
                name,
                unit,
                daily_goal: goal,
                color: checked_colour(color)?,
                today_value: today,
            };
            let (habit, outcome) = app.journal.create_habit(app.remote(), form).await?;
            println!("{} ({})", outcome.describe("Habit"), habit.id);
        }
        HabitCommand::Edit {
            habit,
            name,
            unit,
            goal,
            clear_goal,
            color,
            today,
        } => {
            let habits = app.journal.habits().await?;
            let id = resolve_habit(&habits, &habit).map_or(habit, |h| h.id.clone());
            let changes = HabitChanges {
                name,
                unit,
                daily_goal: goal,
                clear_goal,
                color: checked_colour(color)?,
                today_value: today,
            };
            let (habit, outcome) = app.journal.edit_habit(app.remote(), &id, changes).await?;
            println!("{} ({})", outcome.describe("Habit"), habit.name);
        }
        HabitCommand::List => {
            let view = app.journal.load_view(app.remote()).await?;
            if view.habits.is_empty() {
                println!("No habits yet");
                return Ok(());
            }
            println!("{}", app.heading("Habits"));
            let today = app.today();
            for habit in &view.habits {
                println!(
                    "{} {}\t{}\ttoday {} / {}{}",
                    swatch(habit.color.as_deref()),
                    habit.name,
                    habit.id,
                    format_number(today_total(&view.entries, habit, today)),
                    goal_text(habit),
                    if habit.local { "\t(local)" } else { "" }
                );
            }
        }
        HabitCommand::Delete { habit } => {
            let habits = app.journal.habits().await?;
            let id = resolve_habit(&habits, &habit).map_or(habit, |h| h.id.clone());
            if app.journal.delete_habit(&id).await? {
                println!("Habit deleted");
            } else {
                println!("No local habit {id}");
            }
        }
        HabitCommand::Template { name: None } => {
            println!("{}", app.heading("Templates"));
            for template in &TEMPLATES {
                println!(
                    "{} {}\t{} {}",
                    swatch(Some(template.color)),
                    template.name,
                    format_number(template.daily_goal),
                    template.unit
                );
            }
        }
        HabitCommand::Template { name: Some(name) } => {
            let Some(template) = find_template(&name) else {
                let names = TEMPLATES.iter().map(|t| t.name).collect::<Vec<_>>();
                return Err(validation_error(format!(
                    "No template {name:?}, pick one of {}",
                    names.join(", ")
                )));
            };
            let habit = app.journal.create_habit_from_template(template).await?;
            println!("Habit saved locally ({})", habit.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        journal::test_utils::{day, entry, habit},
        storage::entities::Habit,
    };

    use super::{checked_colour, goal_text, today_total};

    #[test]
    fn test_checked_colour() {
        assert_eq!(checked_colour(None).unwrap(), None);
        assert_eq!(
            checked_colour(Some("#00B0FF".into())).unwrap().as_deref(),
            Some("#00B0FF")
        );
        assert!(checked_colour(Some("blue".into())).is_err());
    }

    #[test]
    fn test_progress_texts() {
        let water = Habit {
            daily_goal: Some(2000.),
            unit: Some("ml".into()),
            ..habit("w", "Water")
        };
        assert_eq!(goal_text(&water), "2000 ml");
        assert_eq!(goal_text(&habit("r", "Read")), "no goal");

        let entries = [
            entry("1", "w", 500., day(2025, 11, 12)),
            entry("2", "w", 250., day(2025, 11, 12)),
            entry("3", "w", 900., day(2025, 11, 11)),
            entry("4", "r", 10., day(2025, 11, 12)),
        ];
        assert_eq!(today_total(&entries, &water, day(2025, 11, 12)), 750.);
    }
}
