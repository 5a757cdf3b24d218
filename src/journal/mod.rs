//! Typed access to the locally stored collections and the user facing operations built on top of
//! them. Every write goes to the local store first, the remote store is only ever a best-effort
//! mirror.

pub mod entries;
pub mod habits;
pub mod sections;
pub mod suggestions;
pub mod view;

use std::{collections::HashMap, fmt::Display};

use anyhow::{bail, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::{
    storage::{
        entities::{Entry, Habit, Section, Theme},
        store::{
            decode_collection, encode_collection, KeyValueStore, ENTRIES_KEY, HABITS_KEY,
            SECTIONS_KEY, THEME_KEY,
        },
    },
    utils::clock::Clock,
};

/// What happened to a record after it was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Stored locally and accepted by the remote store.
    Saved,
    /// Nobody is signed in so only the local copy exists.
    SavedLocally,
    /// The remote store refused the record, the local copy is kept.
    ServerError,
}

impl SaveOutcome {
    pub fn describe(self, record: &str) -> String {
        match self {
            SaveOutcome::Saved => format!("{record} saved"),
            SaveOutcome::SavedLocally => format!("{record} saved locally"),
            SaveOutcome::ServerError => "Saved locally (server error)".into(),
        }
    }
}

impl Display for SaveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe("Record"))
    }
}

pub(crate) const GOAL_NOT_A_NUMBER: &str = "Daily goal must be a number";
pub(crate) const VALUE_NOT_A_NUMBER: &str = "Enter a value";

/// Documents are stored as json, which can't hold NaN or infinities.
pub(crate) fn finite(value: f64, message: &str) -> Result<f64> {
    if !value.is_finite() {
        bail!("{message}");
    }
    Ok(value)
}

pub struct Journal<S> {
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: KeyValueStore + Sync> Journal<S> {
    pub fn new(store: S, clock: Box<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub async fn habits(&self) -> Result<Vec<Habit>> {
        self.read(HABITS_KEY).await
    }

    pub async fn entries(&self) -> Result<Vec<Entry>> {
        self.read(ENTRIES_KEY).await
    }

    pub async fn sections(&self) -> Result<Vec<Section>> {
        self.read(SECTIONS_KEY).await
    }

    pub async fn update_habits<R: Send>(
        &self,
        modify: impl FnOnce(&mut Vec<Habit>) -> Result<R> + Send,
    ) -> Result<R> {
        self.update(HABITS_KEY, modify).await
    }

    pub async fn update_entries<R: Send>(
        &self,
        modify: impl FnOnce(&mut Vec<Entry>) -> Result<R> + Send,
    ) -> Result<R> {
        self.update(ENTRIES_KEY, modify).await
    }

    pub async fn update_sections<R: Send>(
        &self,
        modify: impl FnOnce(&mut Vec<Section>) -> Result<R> + Send,
    ) -> Result<R> {
        self.update(SECTIONS_KEY, modify).await
    }

    async fn read<T: DeserializeOwned>(&self, key: &'static str) -> Result<Vec<T>> {
        let raw = self.store.get(key).await?;
        decode_collection(key, raw.as_deref())
    }

    async fn update<T, R>(
        &self,
        key: &'static str,
        modify: impl FnOnce(&mut Vec<T>) -> Result<R> + Send,
    ) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        R: Send,
    {
        self.store
            .update(key, move |raw| {
                let mut items = decode_collection::<T>(key, raw)?;
                let result = modify(&mut items)?;
                Ok((encode_collection(&items)?, result))
            })
            .await
    }

    /// Gives a habit the id the server assigned to it. Entries pointing at the old id follow.
    pub async fn replace_habit_id(&self, old: &str, new: &str) -> Result<()> {
        let (old_id, new_id) = (old.to_string(), new.to_string());
        let found = self
            .update_habits(move |habits| {
                let mut found = false;
                for habit in habits.iter_mut().filter(|h| h.id == old_id) {
                    habit.id = new_id.clone();
                    habit.local = false;
                    found = true;
                }
                Ok(found)
            })
            .await?;
        if !found {
            debug!("Habit {old} disappeared before its id could be replaced");
        }

        let mapping = HashMap::from([(old.to_string(), new.to_string())]);
        self.remap_entry_habits(&mapping).await?;
        Ok(())
    }

    /// Rewrites `habit_id` of every entry found in `mapping`. Returns the number of touched entries.
    pub async fn remap_entry_habits(&self, mapping: &HashMap<String, String>) -> Result<usize> {
        if mapping.is_empty() {
            return Ok(0);
        }
        let mapping = mapping.clone();
        self.update_entries(move |entries| {
            let mut touched = 0;
            for entry in entries.iter_mut() {
                if let Some(new_id) = mapping.get(&entry.habit_id) {
                    entry.habit_id = new_id.clone();
                    touched += 1;
                }
            }
            Ok(touched)
        })
        .await
    }

    pub async fn replace_entry_id(&self, old: &str, new: &str) -> Result<bool> {
        let (old_id, new_id) = (old.to_string(), new.to_string());
        self.update_entries(move |entries| {
            let mut found = false;
            for entry in entries.iter_mut().filter(|e| e.id == old_id) {
                entry.id = new_id.clone();
                entry.local = false;
                found = true;
            }
            Ok(found)
        })
        .await
    }

    pub async fn theme(&self) -> Result<Theme> {
        let Some(raw) = self.store.get(THEME_KEY).await? else {
            return Ok(Theme::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Stored theme {raw:?} is unreadable, using default: {e}");
            Theme::default()
        }))
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.store
            .set(THEME_KEY, serde_json::to_string(&theme)?)
            .await
    }
}
