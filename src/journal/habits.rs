use anyhow::{anyhow, bail, Result};
use tracing::{info, instrument, warn};

use crate::{
    remote::{
        tables::{insert_returning_id, signed_in_user, to_row, HabitPayload},
        RemoteStore, Table,
    },
    storage::{
        entities::{is_local_id, new_local_entry_id, new_local_habit_id, Entry, Habit},
        store::KeyValueStore,
    },
};

use super::{finite, Journal, SaveOutcome, GOAL_NOT_A_NUMBER, VALUE_NOT_A_NUMBER};

pub const DEFAULT_UNIT: &str = "units";
pub const DEFAULT_COLOR: &str = "#14C38E";

#[derive(Debug, Clone, Default)]
pub struct HabitForm {
    pub name: String,
    pub unit: Option<String>,
    pub daily_goal: Option<f64>,
    pub color: Option<String>,
    /// Sets the value of today's entry for the habit.
    pub today_value: Option<f64>,
}

/// Fields left as `None` are not touched.
#[derive(Debug, Clone, Default)]
pub struct HabitChanges {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub daily_goal: Option<f64>,
    pub clear_goal: bool,
    pub color: Option<String>,
    pub today_value: Option<f64>,
}

#[derive(Debug, PartialEq)]
pub struct HabitTemplate {
    pub name: &'static str,
    pub unit: &'static str,
    pub daily_goal: f64,
    pub color: &'static str,
}

pub const TEMPLATES: [HabitTemplate; 4] = [
    HabitTemplate {
        name: "Daily Walk",
        unit: "steps",
        daily_goal: 10000.,
        color: "#14C38E",
    },
    HabitTemplate {
        name: "Reading",
        unit: "minutes",
        daily_goal: 30.,
        color: "#7EE7C6",
    },
    HabitTemplate {
        name: "Water Intake",
        unit: "ml",
        daily_goal: 2000.,
        color: "#00B0FF",
    },
    HabitTemplate {
        name: "Recycle",
        unit: "grams",
        daily_goal: 300.,
        color: "#FFD75A",
    },
];

pub fn find_template(name: &str) -> Option<&'static HabitTemplate> {
    let name = name.trim();
    TEMPLATES.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Name required");
    }
    Ok(name.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl<S: KeyValueStore + Sync> Journal<S> {
    /// Stores the habit locally and, when somebody is signed in, mirrors it to the remote store.
    #[instrument(skip(self, remote))]
    pub async fn create_habit(
        &self,
        remote: &dyn RemoteStore,
        form: HabitForm,
    ) -> Result<(Habit, SaveOutcome)> {
        let name = required_name(&form.name)?;
        let daily_goal = form
            .daily_goal
            .map(|goal| finite(goal, GOAL_NOT_A_NUMBER))
            .transpose()?;
        if let Some(value) = form.today_value {
            finite(value, VALUE_NOT_A_NUMBER)?;
        }
        let user = signed_in_user(remote).await;
        let now = self.clock.time();

        let mut habit = Habit {
            id: new_local_habit_id(now),
            user_id: user.clone(),
            name,
            unit: Some(non_empty(form.unit).unwrap_or_else(|| DEFAULT_UNIT.into())),
            daily_goal,
            color: Some(non_empty(form.color).unwrap_or_else(|| DEFAULT_COLOR.into())),
            created_at: Some(now),
            updated_at: None,
            local: true,
        };
        self.insert_local_habit(habit.clone()).await?;

        if let Some(value) = form.today_value {
            self.set_today_progress(&habit.id, value).await?;
        }

        if user.is_none() {
            return Ok((habit, SaveOutcome::SavedLocally));
        }

        let row = to_row(&HabitPayload::from_habit(&habit))?;
        let outcome = match insert_returning_id(remote, Table::Habits, row).await {
            Ok(server_id) => {
                self.replace_habit_id(&habit.id, &server_id).await?;
                habit.id = server_id;
                habit.local = false;
                SaveOutcome::Saved
            }
            Err(e) => {
                warn!("Remote insert of habit {} failed, kept local {e:?}", habit.id);
                SaveOutcome::ServerError
            }
        };
        Ok((habit, outcome))
    }

    #[instrument(skip(self, remote))]
    pub async fn edit_habit(
        &self,
        remote: &dyn RemoteStore,
        id: &str,
        changes: HabitChanges,
    ) -> Result<(Habit, SaveOutcome)> {
        let now = self.clock.time();
        let name = changes.name.as_deref().map(required_name).transpose()?;
        if let Some(goal) = changes.daily_goal {
            finite(goal, GOAL_NOT_A_NUMBER)?;
        }
        if let Some(value) = changes.today_value {
            finite(value, VALUE_NOT_A_NUMBER)?;
        }
        let habit_id = id.to_string();
        let today_value = changes.today_value;

        let habit = self
            .update_habits(move |habits| {
                let habit = habits
                    .iter_mut()
                    .find(|h| h.id == habit_id)
                    .ok_or_else(|| anyhow!("No habit with id {habit_id}"))?;
                if let Some(name) = name {
                    habit.name = name;
                }
                if let Some(unit) = non_empty(changes.unit) {
                    habit.unit = Some(unit);
                }
                if changes.clear_goal {
                    habit.daily_goal = None;
                } else if let Some(goal) = changes.daily_goal {
                    habit.daily_goal = Some(goal);
                }
                if let Some(color) = non_empty(changes.color) {
                    habit.color = Some(color);
                }
                habit.updated_at = Some(now);
                Ok(habit.clone())
            })
            .await?;

        if let Some(value) = today_value {
            self.set_today_progress(&habit.id, value).await?;
        }

        if is_local_id(&habit.id) || signed_in_user(remote).await.is_none() {
            return Ok((habit, SaveOutcome::SavedLocally));
        }

        let row = to_row(&HabitPayload::from_habit(&habit).with_updated_at(now))?;
        let outcome = match remote.update(Table::Habits, &habit.id, row).await {
            Ok(_) => SaveOutcome::Saved,
            Err(e) => {
                warn!("Remote update of habit {} failed, kept local {e:?}", habit.id);
                SaveOutcome::ServerError
            }
        };
        Ok((habit, outcome))
    }

    /// Removes the habit from the local collection. Its entries are left where they are.
    pub async fn delete_habit(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        let removed = self
            .update_habits(move |habits| {
                let before = habits.len();
                habits.retain(|h| h.id != id);
                Ok(before != habits.len())
            })
            .await?;
        Ok(removed)
    }

    /// Templates are always stored as local habits.
    pub async fn create_habit_from_template(&self, template: &HabitTemplate) -> Result<Habit> {
        let now = self.clock.time();
        let habit = Habit {
            id: new_local_habit_id(now),
            user_id: None,
            name: template.name.into(),
            unit: Some(template.unit.into()),
            daily_goal: Some(template.daily_goal),
            color: Some(template.color.into()),
            created_at: Some(now),
            updated_at: None,
            local: true,
        };
        self.insert_local_habit(habit.clone()).await?;
        info!("Created habit {} from template", habit.name);
        Ok(habit)
    }

    pub(super) async fn insert_local_habit(&self, habit: Habit) -> Result<()> {
        self.update_habits(move |habits| {
            habits.insert(0, habit);
            Ok(())
        })
        .await
    }

    /// Sets today's value for a habit. An existing entry for today is updated in place, otherwise
    /// a new local entry is prepended.
    pub async fn set_today_progress(&self, habit_id: &str, value: f64) -> Result<Entry> {
        let value = finite(value, VALUE_NOT_A_NUMBER)?;
        let now = self.clock.time();
        let today = self.clock.today();
        let habit_id = habit_id.to_string();

        self.update_entries(move |entries| {
            if let Some(entry) = entries
                .iter_mut()
                .find(|e| e.habit_id == habit_id && e.entry_date == today)
            {
                entry.value = value;
                entry.created_at = Some(now);
                entry.updated_at = Some(now);
                return Ok(entry.clone());
            }

            let entry = Entry {
                id: new_local_entry_id(now),
                habit_id,
                value,
                entry_date: today,
                created_at: Some(now),
                updated_at: None,
                local: true,
            };
            entries.insert(0, entry.clone());
            Ok(entry)
        })
        .await
    }
}
