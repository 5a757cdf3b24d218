use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::storage::entities::{id_ser, Entry, Habit, Section};

use super::{RemoteStore, SelectQuery, Table};

/// Largest number of entries pulled from the remote store in one go.
pub const ENTRY_FETCH_LIMIT: usize = 2000;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HabitPayload {
    pub name: String,
    pub unit: Option<String>,
    pub daily_goal: Option<f64>,
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
}

impl HabitPayload {
    pub fn from_habit(habit: &Habit) -> Self {
        Self {
            name: habit.name.clone(),
            unit: habit.unit.clone(),
            daily_goal: habit.daily_goal,
            color: habit.color.clone(),
            updated_at: None,
            user_id: habit.user_id.clone(),
        }
    }

    pub fn with_updated_at(self, updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at: Some(updated_at),
            ..self
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct EntryPayload {
    pub habit_id: String,
    pub value: f64,
    pub entry_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EntryPayload {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            habit_id: entry.habit_id.clone(),
            value: entry.value,
            entry_date: entry.entry_date,
            updated_at: None,
        }
    }

    pub fn with_updated_at(self, updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at: Some(updated_at),
            ..self
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SectionPayload {
    pub user_id: Option<String>,
    pub name: String,
    pub color: Option<String>,
}

pub fn to_row(payload: &impl Serialize) -> Result<Value> {
    Ok(serde_json::to_value(payload)?)
}

/// Id of the first returned row, if the backend returned any.
pub fn returned_id(rows: &[Value]) -> Option<String> {
    rows.first()
        .and_then(|row| row.get("id"))
        .and_then(id_ser::from_value)
}

/// Rows that don't fit the local schema are dropped with a warning.
pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Skipping remote {table} row {row}: {e}");
                None
            }
        })
        .collect()
}

/// Inserts the row and returns the id the server assigned to it.
pub async fn insert_returning_id(
    remote: &dyn RemoteStore,
    table: Table,
    row: Value,
) -> Result<String> {
    let rows = remote.insert(table, row).await?;
    returned_id(&rows).ok_or_else(|| anyhow!("Insert into {table} returned no id"))
}

/// Signed in user, treating any failure to find out as being signed out.
pub async fn signed_in_user(remote: &dyn RemoteStore) -> Option<String> {
    remote
        .current_user()
        .await
        .inspect_err(|e| debug!("Couldn't resolve current user {e:?}"))
        .ok()
        .flatten()
}

/// Newest habits first, the same order they are kept in locally.
pub async fn fetch_habits(remote: &dyn RemoteStore) -> Result<Vec<Habit>> {
    let rows = remote
        .select(Table::Habits, SelectQuery::all().ordered("created_at", false))
        .await?;
    Ok(decode_rows(Table::Habits, rows))
}

pub async fn fetch_sections(remote: &dyn RemoteStore) -> Result<Vec<Section>> {
    let rows = remote.select(Table::Sections, SelectQuery::all()).await?;
    Ok(decode_rows(Table::Sections, rows))
}

pub async fn fetch_entries(remote: &dyn RemoteStore) -> Result<Vec<Entry>> {
    let rows = remote
        .select(Table::Entries, SelectQuery::limit(ENTRY_FETCH_LIMIT))
        .await?;
    Ok(decode_rows(Table::Entries, rows))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use super::{decode_rows, fetch_habits, returned_id, to_row, EntryPayload, HabitPayload};
    use crate::{
        remote::{MockRemoteStore, SelectQuery, Table},
        storage::entities::Entry,
    };

    #[test]
    fn test_returned_id_accepts_numbers() {
        assert_eq!(returned_id(&[json!({"id": 7})]), Some("7".into()));
        assert_eq!(returned_id(&[json!({"id": "abc"})]), Some("abc".into()));
        assert_eq!(returned_id(&[json!({"name": "no id"})]), None);
        assert_eq!(returned_id(&[]), None);
    }

    #[test]
    fn test_payload_rows() {
        let payload = HabitPayload {
            name: "Water".into(),
            unit: Some("ml".into()),
            daily_goal: Some(2000.),
            color: None,
            updated_at: None,
            user_id: None,
        };
        assert_eq!(
            to_row(&payload).unwrap(),
            json!({"name": "Water", "unit": "ml", "daily_goal": 2000.0, "color": null, "user_id": null})
        );

        let updated_at = Utc.with_ymd_and_hms(2025, 11, 10, 8, 0, 0).unwrap();
        let payload = EntryPayload {
            habit_id: "srv-1".into(),
            value: 3.,
            entry_date: NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
            updated_at: None,
        }
        .with_updated_at(updated_at);
        assert_eq!(
            to_row(&payload).unwrap(),
            json!({"habit_id": "srv-1", "value": 3.0, "entry_date": "2025-11-10", "updated_at": "2025-11-10T08:00:00Z"})
        );
    }

    #[test]
    fn test_decode_rows_skips_foreign_rows() {
        let rows = vec![
            json!({"id": 1, "habit_id": 2, "value": 5, "entry_date": "2025-11-10"}),
            json!({"id": 2, "habit_id": 2}),
        ];
        let entries: Vec<Entry> = decode_rows(Table::Entries, rows);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].habit_id, "2");
    }

    #[tokio::test]
    async fn test_habits_are_fetched_newest_first() {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_select()
            .withf(|table, query| {
                *table == Table::Habits
                    && *query == SelectQuery::all().ordered("created_at", false)
            })
            .times(1)
            .returning(|_, _| Ok(vec![json!({"id": 3, "name": "Walk"})]));

        let habits = fetch_habits(&remote).await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].id, "3");
    }
}
