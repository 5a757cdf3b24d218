use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use crate::{
    remote::{
        tables::{fetch_entries, fetch_habits, fetch_sections, signed_in_user},
        RemoteStore,
    },
    storage::{
        entities::{Entry, Habit, Record, Section},
        store::KeyValueStore,
    },
};

use super::Journal;

/// Everything the read-only commands display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JournalView {
    pub habits: Vec<Habit>,
    pub entries: Vec<Entry>,
}

/// Appends the remote records whose id is not known locally.
pub fn append_remote_only<T: Record>(local: &mut Vec<T>, remote: Vec<T>) -> usize {
    let known = local
        .iter()
        .map(|r| r.id().to_string())
        .collect::<HashSet<_>>();
    let before = local.len();
    local.extend(remote.into_iter().filter(|r| !known.contains(r.id())));
    local.len() - before
}

impl<S: KeyValueStore + Sync> Journal<S> {
    /// Local data first, then records only the remote store knows about. Remote failures only
    /// mean less data.
    pub async fn load_view(&self, remote: &dyn RemoteStore) -> Result<JournalView> {
        let mut view = JournalView {
            habits: self.habits().await?,
            entries: self.entries().await?,
        };
        if signed_in_user(remote).await.is_none() {
            return Ok(view);
        }

        let (habits, entries) = futures::join!(fetch_habits(remote), fetch_entries(remote));
        match habits {
            Ok(habits) => {
                let added = append_remote_only(&mut view.habits, habits);
                debug!("Added {added} remote only habits");
            }
            Err(e) => debug!("Failed to fetch remote habits {e:?}"),
        }
        match entries {
            Ok(entries) => {
                let added = append_remote_only(&mut view.entries, entries);
                debug!("Added {added} remote only entries");
            }
            Err(e) => debug!("Failed to fetch remote entries {e:?}"),
        }
        Ok(view)
    }

    pub async fn load_sections(&self, remote: &dyn RemoteStore) -> Result<Vec<Section>> {
        let mut sections = self.sections().await?;
        if signed_in_user(remote).await.is_some() {
            match fetch_sections(remote).await {
                Ok(remote_sections) => {
                    append_remote_only(&mut sections, remote_sections);
                }
                Err(e) => debug!("Failed to fetch remote sections {e:?}"),
            }
        }
        Ok(sections)
    }
}
