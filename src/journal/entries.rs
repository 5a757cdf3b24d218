use anyhow::{bail, Result};
use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

use crate::{
    remote::{
        tables::{insert_returning_id, signed_in_user, to_row, EntryPayload},
        RemoteStore, Table,
    },
    storage::{
        entities::{is_local_id, new_local_entry_id, Entry},
        store::KeyValueStore,
    },
};

use super::{finite, Journal, SaveOutcome, VALUE_NOT_A_NUMBER};

#[derive(Debug, Clone, Default)]
pub struct EntryForm {
    pub habit_id: String,
    pub value: Option<f64>,
    /// Defaults to today.
    pub date: Option<NaiveDate>,
}

impl<S: KeyValueStore + Sync> Journal<S> {
    #[instrument(skip(self, remote))]
    pub async fn add_entry(
        &self,
        remote: &dyn RemoteStore,
        form: EntryForm,
    ) -> Result<(Entry, SaveOutcome)> {
        let habit_id = form.habit_id.trim().to_string();
        if habit_id.is_empty() {
            bail!("Pick a habit");
        }
        let Some(value) = form.value else {
            bail!(VALUE_NOT_A_NUMBER);
        };
        let value = finite(value, VALUE_NOT_A_NUMBER)?;
        let now = self.clock.time();

        let mut entry = Entry {
            id: new_local_entry_id(now),
            habit_id,
            value,
            entry_date: form.date.unwrap_or_else(|| self.clock.today()),
            created_at: Some(now),
            updated_at: None,
            local: true,
        };
        let stored = entry.clone();
        self.update_entries(move |entries| {
            entries.insert(0, stored);
            Ok(())
        })
        .await?;

        if signed_in_user(remote).await.is_none() {
            return Ok((entry, SaveOutcome::SavedLocally));
        }
        if is_local_id(&entry.habit_id) {
            debug!("Habit {} is not on the server yet, entry stays local", entry.habit_id);
            return Ok((entry, SaveOutcome::SavedLocally));
        }

        let row = to_row(&EntryPayload::from_entry(&entry))?;
        let outcome = match insert_returning_id(remote, Table::Entries, row).await {
            Ok(server_id) => {
                self.replace_entry_id(&entry.id, &server_id).await?;
                entry.id = server_id;
                entry.local = false;
                SaveOutcome::Saved
            }
            Err(e) => {
                warn!("Remote insert of entry {} failed, kept local {e:?}", entry.id);
                SaveOutcome::ServerError
            }
        };
        Ok((entry, outcome))
    }

    /// Local removal only, the remote copy is never deleted.
    pub async fn delete_entry(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.update_entries(move |entries| {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            Ok(before != entries.len())
        })
        .await
    }
}
