use std::collections::HashMap;

use anyhow::Result;

use crate::storage::{
    entities::{new_local_habit_id, Entry, Habit},
    store::KeyValueStore,
};

use super::Journal;

pub const SUGGESTION_COLOR: &str = "#FFD75A";
const MAX_SUGGESTIONS: usize = 3;
/// Habits logged fewer times than this count as neglected.
const LOW_ACTIVITY: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub title: &'static str,
    pub reason: &'static str,
}

/// Offline heuristics: nudges towards meditation and walking unless a habit already mentions them,
/// and towards hydration once some habit is rarely logged.
pub fn suggest(habits: &[Habit], entries: &[Entry]) -> Vec<Suggestion> {
    let names = habits
        .iter()
        .map(|h| h.name.to_lowercase())
        .collect::<Vec<_>>();
    let has = |keyword: &str| names.iter().any(|n| n.contains(keyword));

    let mut suggestions = vec![];
    if !has("meditate") {
        suggestions.push(Suggestion {
            title: "Meditate 5 min",
            reason: "Small daily reset to increase focus",
        });
    }
    if !has("walk") && !has("steps") {
        suggestions.push(Suggestion {
            title: "Walk 30 mins",
            reason: "Boost energy & mood",
        });
    }

    let mut counts = HashMap::<&str, usize>::new();
    for entry in entries {
        *counts.entry(entry.habit_id.as_str()).or_default() += 1;
    }
    if counts.values().any(|c| *c < LOW_ACTIVITY) && suggestions.len() < MAX_SUGGESTIONS {
        suggestions.push(Suggestion {
            title: "Hydrate: 500ml between meals",
            reason: "Hydration improves energy",
        });
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

impl<S: KeyValueStore + Sync> Journal<S> {
    pub async fn suggestions(&self) -> Result<Vec<Suggestion>> {
        Ok(suggest(&self.habits().await?, &self.entries().await?))
    }

    /// Stores a suggestion as a local habit without unit or goal.
    pub async fn create_habit_from_suggestion(&self, suggestion: &Suggestion) -> Result<Habit> {
        let now = self.clock.time();
        let habit = Habit {
            id: new_local_habit_id(now),
            user_id: None,
            name: suggestion.title.into(),
            unit: Some(String::new()),
            daily_goal: None,
            color: Some(SUGGESTION_COLOR.into()),
            created_at: Some(now),
            updated_at: None,
            local: true,
        };
        self.insert_local_habit(habit.clone()).await?;
        Ok(habit)
    }
}
