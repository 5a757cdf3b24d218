//! Brings CSV files into the local journal. Column names are matched loosely so files exported by
//! other tools can be read, and the columns written by the CSV export are honoured as they are.

pub mod parser;

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::{
    journal::{
        habits::{DEFAULT_COLOR, DEFAULT_UNIT},
        Journal,
    },
    storage::{
        entities::{new_local_entry_id, new_local_habit_id, parse_timestamp, Entry, Habit},
        store::KeyValueStore,
    },
};

use parser::parse_csv;

const UNNAMED: &str = "Unnamed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportTarget {
    Entries,
    Habits,
}

#[derive(Debug, PartialEq)]
pub struct Imported<T> {
    pub records: Vec<T>,
    /// Lines that couldn't be turned into a record.
    pub skipped: usize,
}

/// First non-empty value among the given column names.
fn pick<'a>(row: &'a HashMap<String, String>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| row.get(*name))
        .map(|v| v.as_str())
        .find(|v| !v.is_empty())
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_local(row: &HashMap<String, String>) -> bool {
    pick(row, &["local"]).map_or(true, |v| !v.eq_ignore_ascii_case("false"))
}

fn parse_stamp(row: &HashMap<String, String>, column: &str) -> Option<DateTime<Utc>> {
    pick(row, &[column]).and_then(parse_timestamp)
}

pub fn entries_from_csv(text: &str, now: DateTime<Utc>) -> Imported<Entry> {
    let table = parse_csv(text);
    let mut skipped = 0;
    let mut records = vec![];

    for (line, row) in table.rows.iter().enumerate() {
        let Some(habit_id) = pick(row, &["habit_id", "habit", "habitId", "habitID"]) else {
            warn!("Skipping entry on line {}, no habit", line + 2);
            skipped += 1;
            continue;
        };
        let value = match pick(row, &["value", "val", "amount"]) {
            None => 0.,
            Some(raw) => match parse_number(raw) {
                Some(v) => v,
                None => {
                    warn!("Skipping entry on line {}, {raw:?} is not a number", line + 2);
                    skipped += 1;
                    continue;
                }
            },
        };
        let date = pick(row, &["entry_date", "date"])
            .map(|raw| raw.chars().take(10).collect::<String>())
            .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok());
        let Some(entry_date) = date else {
            warn!("Skipping entry on line {}, no readable date", line + 2);
            skipped += 1;
            continue;
        };

        records.push(Entry {
            id: pick(row, &["id"]).map_or_else(|| new_local_entry_id(now), str::to_string),
            habit_id: habit_id.into(),
            value,
            entry_date,
            created_at: parse_stamp(row, "created_at").or(Some(now)),
            updated_at: parse_stamp(row, "updated_at"),
            local: parse_local(row),
        });
    }
    Imported { records, skipped }
}

pub fn habits_from_csv(text: &str, now: DateTime<Utc>) -> Imported<Habit> {
    let table = parse_csv(text);
    let records = table
        .rows
        .iter()
        .map(|row| Habit {
            id: pick(row, &["id"]).map_or_else(|| new_local_habit_id(now), str::to_string),
            user_id: pick(row, &["user_id"]).map(str::to_string),
            name: pick(row, &["name", "title", "habit"])
                .unwrap_or(UNNAMED)
                .into(),
            unit: Some(pick(row, &["unit", "u"]).unwrap_or(DEFAULT_UNIT).into()),
            daily_goal: pick(row, &["daily_goal", "goal"]).and_then(parse_number),
            color: Some(pick(row, &["color"]).unwrap_or(DEFAULT_COLOR).into()),
            created_at: parse_stamp(row, "created_at").or(Some(now)),
            updated_at: parse_stamp(row, "updated_at"),
            local: parse_local(row),
        })
        .collect();
    Imported {
        records,
        skipped: 0,
    }
}

impl<S: KeyValueStore + Sync> Journal<S> {
    /// Parses `text` and puts the records in front of the stored ones.
    pub async fn import_csv(&self, text: &str, target: ImportTarget) -> Result<(usize, usize)> {
        let now = self.clock().time();
        let (imported, skipped) = match target {
            ImportTarget::Entries => {
                let Imported { records, skipped } = entries_from_csv(text, now);
                let count = records.len();
                self.update_entries(move |entries| {
                    let existing = std::mem::replace(entries, records);
                    entries.extend(existing);
                    Ok(())
                })
                .await?;
                (count, skipped)
            }
            ImportTarget::Habits => {
                let Imported { records, skipped } = habits_from_csv(text, now);
                let count = records.len();
                self.update_habits(move |habits| {
                    let existing = std::mem::replace(habits, records);
                    habits.extend(existing);
                    Ok(())
                })
                .await?;
                (count, skipped)
            }
        };
        info!("Imported {imported} {target:?}, skipped {skipped}");
        Ok((imported, skipped))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};

    use crate::{
        export::csv::to_csv,
        journal::test_utils::{day, entry, habit, test_journal, test_time},
        storage::entities::{is_local_id, Entry, Habit},
    };

    use super::{entries_from_csv, habits_from_csv, ImportTarget};

    #[test]
    fn test_entry_aliases() {
        let csv = "habit,amount,date\nh1,2.5,2025-11-10T08:00:00Z\nh2,,2025-11-11\n,3,2025-11-11\nh3,abc,2025-11-11\nh4,1,someday";
        let imported = entries_from_csv(csv, test_time());

        assert_eq!(imported.skipped, 3);
        assert_eq!(imported.records.len(), 2);
        let first = &imported.records[0];
        assert_eq!(first.habit_id, "h1");
        assert_eq!(first.value, 2.5);
        assert_eq!(first.entry_date, day(2025, 11, 10));
        assert_eq!(first.created_at, Some(test_time()));
        assert!(first.local && is_local_id(&first.id));
        assert_eq!(imported.records[1].value, 0.);
    }

    #[test]
    fn test_habit_aliases_and_defaults() {
        let csv = "title,u,goal\nRead,pages,20\n,,";
        let imported = habits_from_csv(csv, test_time());
        let habits = imported.records;

        assert_eq!(habits[0].name, "Read");
        assert_eq!(habits[0].unit.as_deref(), Some("pages"));
        assert_eq!(habits[0].daily_goal, Some(20.));
        assert_eq!(habits[1].name, "Unnamed");
        assert_eq!(habits[1].unit.as_deref(), Some("units"));
        assert_eq!(habits[1].daily_goal, None);
        assert_eq!(habits[1].color.as_deref(), Some("#14C38E"));
        assert!(habits[1].local);
    }

    #[test]
    fn test_entries_round_trip() {
        let entries = vec![
            Entry {
                created_at: Some(Utc.with_ymd_and_hms(2025, 11, 10, 7, 0, 0).unwrap()),
                ..entry("local_e_1_1", "local_1_1", 2000., day(2025, 11, 10))
            },
            Entry {
                created_at: Some(Utc.with_ymd_and_hms(2025, 11, 11, 7, 0, 0).unwrap()),
                updated_at: Some(Utc.with_ymd_and_hms(2025, 11, 11, 8, 0, 0).unwrap()),
                ..entry("42", "7", 1.25, day(2025, 11, 11))
            },
        ];

        let imported = entries_from_csv(&to_csv(&entries).unwrap(), test_time());
        assert_eq!(imported.skipped, 0);
        assert_eq!(imported.records, entries);
    }

    #[test]
    fn test_habits_round_trip() {
        let habits = vec![
            Habit {
                daily_goal: Some(2000.),
                color: Some("#00B0FF".into()),
                created_at: Some(Utc.with_ymd_and_hms(2025, 11, 10, 7, 0, 0).unwrap()),
                ..habit("local_1_1", "Water, \"cold\"")
            },
            Habit {
                user_id: Some("user-1".into()),
                color: Some("#14C38E".into()),
                created_at: Some(Utc.with_ymd_and_hms(2025, 11, 9, 7, 0, 0).unwrap()),
                ..habit("12", "Walk")
            },
        ];

        let imported = habits_from_csv(&to_csv(&habits).unwrap(), test_time());
        assert_eq!(imported.records, habits);
    }

    #[tokio::test]
    async fn test_import_prepends() -> Result<()> {
        let (_dir, journal) = test_journal();
        journal
            .update_entries(|e| {
                e.push(entry("old", "h", 1., day(2025, 11, 1)));
                Ok(())
            })
            .await?;

        let (imported, skipped) = journal
            .import_csv("habit_id,value,entry_date\nh,5,2025-11-12", ImportTarget::Entries)
            .await?;
        assert_eq!((imported, skipped), (1, 0));

        let entries = journal.entries().await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, 5.);
        assert_eq!(entries[1].id, "old");
        Ok(())
    }
}
