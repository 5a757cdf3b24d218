//! Dashboard aggregation. Everything here is pure and works over whatever habits/entries the
//! caller merged together.

pub mod insight;

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::{
    storage::entities::{find_habit, Entry, Habit},
    utils::{
        percentage::{rounded_percentage, Percentage},
        time::last_n_dates,
    },
};

/// Colors for habits that don't carry their own.
pub const PALETTE: [&str; 7] = [
    "#14C38E", "#7EE7C6", "#FFD75A", "#6C5CE7", "#00B0FF", "#FF7A7A", "#A29BFE",
];
pub const WINDOW_DAYS: usize = 7;
pub const TIMELINE_LEN: usize = 12;
pub const UNKNOWN_HABIT: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HabitShare {
    pub name: String,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineItem {
    pub entry: Entry,
    pub habit_name: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    /// `None` when no entry of the window belongs to a habit with a goal.
    pub completion: Option<Percentage>,
    pub active_habits: usize,
    pub tracked_days: usize,
    pub weekly_activity: Vec<DayCount>,
    pub activity_share: Vec<HabitShare>,
    pub timeline: Vec<TimelineItem>,
}

pub fn dashboard(habits: &[Habit], entries: &[Entry], today: NaiveDate) -> DashboardSummary {
    let window = last_n_dates(today, WINDOW_DAYS);
    let in_window = window.iter().copied().collect::<HashSet<_>>();
    let recent = entries
        .iter()
        .filter(|e| in_window.contains(&e.entry_date))
        .collect::<Vec<_>>();

    DashboardSummary {
        completion: completion(habits, &recent),
        active_habits: habits.len(),
        tracked_days: entries
            .iter()
            .map(|e| e.entry_date)
            .collect::<HashSet<_>>()
            .len(),
        weekly_activity: window
            .iter()
            .map(|date| DayCount {
                date: *date,
                count: entries.iter().filter(|e| e.entry_date == *date).count(),
            })
            .collect(),
        activity_share: activity_share(habits, &recent),
        timeline: timeline(habits, entries),
    }
}

/// Share of entries meeting their habit's goal. Entries of unknown or goal-less habits don't count.
fn completion(habits: &[Habit], recent: &[&Entry]) -> Option<Percentage> {
    let mut total = 0;
    let mut met = 0;
    for entry in recent {
        let Some(goal) = find_habit(habits, &entry.habit_id).and_then(|h| h.daily_goal) else {
            continue;
        };
        total += 1;
        if entry.value >= goal {
            met += 1;
        }
    }
    rounded_percentage(met, total)
}

fn activity_share(habits: &[Habit], recent: &[&Entry]) -> Vec<HabitShare> {
    let mut sums = HashMap::<&str, f64>::new();
    for entry in recent {
        *sums.entry(entry.habit_id.as_str()).or_default() += entry.value;
    }

    habits
        .iter()
        .enumerate()
        .map(|(i, habit)| HabitShare {
            name: habit.name.clone(),
            value: sums.get(habit.id.as_str()).copied().unwrap_or_default(),
            color: habit
                .color
                .clone()
                .unwrap_or_else(|| PALETTE[i % PALETTE.len()].into()),
        })
        .filter(|share| share.value > 0.)
        .collect()
}

/// Most recent entries by date, newest first. Entries of the same day keep their stored order.
pub fn timeline(habits: &[Habit], entries: &[Entry]) -> Vec<TimelineItem> {
    let mut sorted = entries.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
    sorted
        .into_iter()
        .take(TIMELINE_LEN)
        .map(|entry| {
            let habit = find_habit(habits, &entry.habit_id);
            TimelineItem {
                entry: entry.clone(),
                habit_name: habit.map_or(UNKNOWN_HABIT, |h| h.name.as_str()).into(),
                unit: habit.map(|h| h.unit_label()).unwrap_or_default().into(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::{
        journal::{
            entries::EntryForm,
            habits::HabitForm,
            test_utils::{day, entry, habit, test_journal},
        },
        remote::NoopRemote,
        storage::entities::Habit,
    };

    use super::{dashboard, timeline, PALETTE, UNKNOWN_HABIT};

    fn goal_habit(id: &str, name: &str, goal: f64, color: Option<&str>) -> Habit {
        Habit {
            daily_goal: Some(goal),
            color: color.map(str::to_string),
            ..habit(id, name)
        }
    }

    #[test]
    fn test_empty_dashboard() {
        let summary = dashboard(&[], &[], day(2025, 11, 12));
        assert_eq!(summary.completion, None);
        assert_eq!(summary.active_habits, 0);
        assert_eq!(summary.tracked_days, 0);
        assert_eq!(summary.weekly_activity.len(), 7);
        assert!(summary.weekly_activity.iter().all(|d| d.count == 0));
        assert_eq!(summary.weekly_activity[6].date, day(2025, 11, 12));
        assert!(summary.activity_share.is_empty());
    }

    #[test]
    fn test_dashboard_over_window() {
        let habits = [
            goal_habit("w", "Water", 2000., Some("#00B0FF")),
            goal_habit("r", "Read", 30., None),
            habit("n", "No goal"),
        ];
        let entries = [
            entry("1", "w", 2000., day(2025, 11, 12)),
            entry("2", "w", 1000., day(2025, 11, 11)),
            entry("3", "r", 45., day(2025, 11, 6)),
            entry("4", "n", 3., day(2025, 11, 12)),
            // outside of the window, only counted as a tracked day
            entry("5", "r", 1., day(2025, 11, 5)),
            entry("6", "gone", 1., day(2025, 11, 12)),
        ];

        let summary = dashboard(&habits, &entries, day(2025, 11, 12));
        assert_eq!(summary.completion.map(|v| *v), Some(67.));
        assert_eq!(summary.active_habits, 3);
        assert_eq!(summary.tracked_days, 4);
        assert_eq!(
            summary.weekly_activity.iter().map(|d| d.count).collect::<Vec<_>>(),
            vec![1, 0, 0, 0, 0, 1, 3]
        );

        let shares = summary
            .activity_share
            .iter()
            .map(|s| (s.name.as_str(), s.value, s.color.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            shares,
            vec![
                ("Water", 3000., "#00B0FF"),
                ("Read", 45., PALETTE[1]),
                ("No goal", 3., PALETTE[2]),
            ]
        );
    }

    #[test]
    fn test_timeline_order_and_placeholder() {
        let habits = [habit("h", "Walk")];
        let mut entries = (1..=14)
            .map(|d| entry(&format!("e{d}"), "h", d as f64, day(2025, 11, d)))
            .collect::<Vec<_>>();
        entries.push(entry("dangling", "gone", 1., day(2025, 11, 14)));

        let items = timeline(&habits, &entries);
        assert_eq!(items.len(), 12);
        assert_eq!(items[0].entry.id, "e14");
        assert_eq!(items[1].habit_name, UNKNOWN_HABIT);
        assert_eq!(items[2].entry.id, "e13");
        assert_eq!(items[11].entry.id, "e4");
        assert_eq!(items[0].unit, "units");
    }

    #[tokio::test]
    async fn test_water_scenario() -> Result<()> {
        let (_dir, journal) = test_journal();
        let (habit, _) = journal
            .create_habit(
                &NoopRemote,
                HabitForm {
                    name: "Water".into(),
                    ..Default::default()
                },
            )
            .await?;
        journal
            .add_entry(
                &NoopRemote,
                EntryForm {
                    habit_id: habit.id.clone(),
                    value: Some(2000.),
                    date: None,
                },
            )
            .await?;

        let view = journal.load_view(&NoopRemote).await?;
        assert_eq!(view.habits.len(), 1);
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].habit_id, habit.id);

        let summary = dashboard(&view.habits, &view.entries, journal.clock().today());
        assert_eq!(summary.active_habits, 1);
        assert_eq!(summary.tracked_days, 1);
        assert_eq!(summary.timeline[0].habit_name, "Water");
        Ok(())
    }
}
