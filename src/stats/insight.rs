use std::{collections::HashSet, fmt::Display};

use chrono::NaiveDate;

use crate::{
    storage::entities::{find_habit, Entry, Habit},
    utils::time::last_n_dates,
};

use super::{UNKNOWN_HABIT, WINDOW_DAYS};

pub const NO_DATA: &str = "No data";

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyInsight {
    pub top_habit: String,
    pub count: usize,
}

impl Display for WeeklyInsight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} • {} entries", self.top_habit, self.count)
    }
}

/// Habit with the most entries over the last week. Ties go to the habit logged first.
pub fn weekly_insight(habits: &[Habit], entries: &[Entry], today: NaiveDate) -> WeeklyInsight {
    let window = last_n_dates(today, WINDOW_DAYS)
        .into_iter()
        .collect::<HashSet<_>>();

    // first-seen order, keeps ties deterministic
    let mut counts: Vec<(&str, usize)> = vec![];
    for entry in entries.iter().filter(|e| window.contains(&e.entry_date)) {
        match counts.iter_mut().find(|(id, _)| *id == entry.habit_id) {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.habit_id.as_str(), 1)),
        }
    }

    let mut top: Option<(&str, usize)> = None;
    for (id, count) in counts {
        if top.map_or(true, |(_, best)| count > best) {
            top = Some((id, count));
        }
    }

    match top {
        Some((id, count)) => WeeklyInsight {
            top_habit: find_habit(habits, id)
                .map_or(UNKNOWN_HABIT, |h| h.name.as_str())
                .into(),
            count,
        },
        None => WeeklyInsight {
            top_habit: NO_DATA.into(),
            count: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::journal::test_utils::{day, entry, habit};

    use super::weekly_insight;

    #[test]
    fn test_no_data() {
        let insight = weekly_insight(&[], &[entry("1", "h", 1., day(2025, 1, 1))], day(2025, 11, 12));
        assert_eq!(insight.top_habit, "No data");
        assert_eq!(insight.to_string(), "No data • 0 entries");
    }

    #[test]
    fn test_top_habit() {
        let habits = [habit("a", "Walk"), habit("b", "Read")];
        let entries = [
            entry("1", "a", 1., day(2025, 11, 12)),
            entry("2", "b", 1., day(2025, 11, 11)),
            entry("3", "b", 1., day(2025, 11, 10)),
            entry("4", "a", 1., day(2025, 11, 1)),
        ];
        let insight = weekly_insight(&habits, &entries, day(2025, 11, 12));
        assert_eq!((insight.top_habit.as_str(), insight.count), ("Read", 2));
    }

    #[test]
    fn test_tie_and_unknown_habit() {
        let entries = [
            entry("1", "gone", 1., day(2025, 11, 12)),
            entry("2", "a", 1., day(2025, 11, 12)),
        ];
        let insight = weekly_insight(&[habit("a", "Walk")], &entries, day(2025, 11, 12));
        assert_eq!((insight.top_habit.as_str(), insight.count), ("Unknown", 1));
    }
}
