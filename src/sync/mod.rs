//! One-shot reconciliation between the local journal and the remote store.
//!
//! Local records are pushed first (inserting local-only ones and adopting the server ids), then
//! fresh remote snapshots are merged back with [merge::merge_by_id]. Nothing is rolled back, a
//! failed or cancelled run simply leaves some records migrated and others not.

pub mod merge;

use std::collections::HashMap;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    journal::Journal,
    remote::{
        tables::{
            fetch_entries, fetch_habits, insert_returning_id, returned_id, signed_in_user, to_row,
            EntryPayload, HabitPayload,
        },
        RemoteStore, Table,
    },
    storage::{entities::is_local_id, store::KeyValueStore},
};

use merge::merge_by_id;

pub const SYNC_ABORTED: &str = "Sync aborted";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub success: bool,
    pub error: Option<String>,
    pub habits_pushed: usize,
    pub entries_pushed: usize,
    /// Remote calls that failed. The affected records stay as they were locally.
    pub failures: usize,
    /// Entries that still point at a habit the server doesn't know.
    pub skipped_entries: usize,
    /// At least one remote snapshot couldn't be fetched for the final merge.
    pub partial: bool,
}

/// `base + round(i / max(1, total) * span)`
fn scaled(base: u8, span: u8, i: usize, total: usize) -> u8 {
    base + (i as f64 / total.max(1) as f64 * span as f64).round() as u8
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        bail!(SYNC_ABORTED);
    }
    Ok(())
}

/// Runs a full push-then-pull. Never fails: any error ends the run and is reported through
/// [SyncReport::error]. `on_progress` receives a message and a percentage.
#[instrument(skip_all)]
pub async fn sync_local_to_remote<S: KeyValueStore + Sync>(
    journal: &Journal<S>,
    remote: &dyn RemoteStore,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(&str, u8),
) -> SyncReport {
    let mut report = SyncReport::default();
    on_progress("Starting sync", 0);

    match run(journal, remote, cancel, &mut on_progress, &mut report).await {
        Ok(()) => {
            report.success = true;
            info!("Sync finished {report:?}");
        }
        Err(e) => {
            warn!("Sync stopped {e:?}");
            on_progress(&format!("Sync error: {e}"), 100);
            report.error = Some(e.to_string());
        }
    }
    report
}

async fn run<S: KeyValueStore + Sync>(
    journal: &Journal<S>,
    remote: &dyn RemoteStore,
    cancel: &CancellationToken,
    on_progress: &mut impl FnMut(&str, u8),
    report: &mut SyncReport,
) -> Result<()> {
    let habits = journal.habits().await?;
    let entry_count = journal.entries().await?.len();
    on_progress(
        &format!(
            "Found {} habit(s) and {} entry(ies) locally.",
            habits.len(),
            entry_count
        ),
        5,
    );

    let user = signed_in_user(remote).await;
    let now = journal.clock().time();
    let mut mapping = HashMap::new();

    for (i, habit) in habits.iter().enumerate() {
        check_cancelled(cancel)?;
        on_progress(
            &format!("Syncing habit {}", habit.name),
            scaled(5, 40, i, habits.len()),
        );

        let mut payload = HabitPayload::from_habit(habit)
            .with_updated_at(habit.updated_at.or(habit.created_at).unwrap_or(now));
        payload.user_id = payload.user_id.or_else(|| user.clone());
        let row = to_row(&payload)?;

        if !is_local_id(&habit.id) {
            match remote.update(Table::Habits, &habit.id, row).await {
                Ok(rows) => {
                    if let Some(id) = returned_id(&rows).filter(|id| *id != habit.id) {
                        mapping.insert(habit.id.clone(), id);
                    }
                    report.habits_pushed += 1;
                }
                Err(e) => {
                    warn!("Habit update failed for {} {e:?}", habit.id);
                    report.failures += 1;
                }
            }
            continue;
        }

        match insert_returning_id(remote, Table::Habits, row).await {
            Ok(server_id) => {
                let (old_id, new_id) = (habit.id.clone(), server_id.clone());
                journal
                    .update_habits(move |stored| {
                        for h in stored.iter_mut().filter(|h| h.id == old_id) {
                            h.id = new_id.clone();
                            h.local = false;
                        }
                        Ok(())
                    })
                    .await?;
                mapping.insert(habit.id.clone(), server_id);
                report.habits_pushed += 1;
            }
            Err(e) => {
                warn!("Habit insert failed for {}, kept local {e:?}", habit.id);
                report.failures += 1;
            }
        }
    }

    if journal.remap_entry_habits(&mapping).await? > 0 {
        on_progress("Remapped local entry habit IDs to server IDs", 60);
    }

    let entries = journal.entries().await?;
    for (i, entry) in entries.iter().enumerate() {
        check_cancelled(cancel)?;
        on_progress(
            &format!("Syncing entry {}/{}", i + 1, entries.len()),
            scaled(60, 30, i, entries.len()),
        );

        if is_local_id(&entry.habit_id) {
            debug!("Skipping entry {}, habit {} is local only", entry.id, entry.habit_id);
            report.skipped_entries += 1;
            continue;
        }

        let payload = EntryPayload::from_entry(entry)
            .with_updated_at(entry.updated_at.or(entry.created_at).unwrap_or(now));
        let row = to_row(&payload)?;

        if !is_local_id(&entry.id) {
            match remote.update(Table::Entries, &entry.id, row).await {
                Ok(_) => report.entries_pushed += 1,
                Err(e) => {
                    warn!("Entry update failed for {} {e:?}", entry.id);
                    report.failures += 1;
                }
            }
            continue;
        }

        match insert_returning_id(remote, Table::Entries, row).await {
            Ok(server_id) => {
                journal.replace_entry_id(&entry.id, &server_id).await?;
                report.entries_pushed += 1;
            }
            Err(e) => {
                warn!("Entry insert failed for {}, kept local {e:?}", entry.id);
                report.failures += 1;
            }
        }
    }

    on_progress("Finalizing sync", 95);
    let (remote_habits, remote_entries) =
        futures::join!(fetch_habits(remote), fetch_entries(remote));

    match remote_habits {
        Ok(remote_habits) => {
            journal
                .update_habits(move |local| {
                    *local = merge_by_id(local, &remote_habits);
                    Ok(())
                })
                .await?
        }
        Err(e) => {
            warn!("Final habit merge skipped {e:?}");
            report.partial = true;
        }
    }
    match remote_entries {
        Ok(remote_entries) => {
            journal
                .update_entries(move |local| {
                    *local = merge_by_id(local, &remote_entries);
                    Ok(())
                })
                .await?
        }
        Err(e) => {
            warn!("Final entry merge skipped {e:?}");
            report.partial = true;
        }
    }

    if report.partial {
        on_progress("Sync completed (partial)", 100);
    } else {
        on_progress("Merged server data locally", 100);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use chrono::NaiveDate;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use crate::{
        journal::{
            test_utils::{day, entry, habit, test_journal},
            Journal,
        },
        remote::{MockRemoteStore, Table},
        storage::store::FileStore,
        utils::logging::TEST_LOGGING,
    };

    use super::{scaled, sync_local_to_remote, SyncReport, SYNC_ABORTED};

    fn signed_in() -> MockRemoteStore {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_current_user()
            .returning(|| Ok(Some("user-1".into())));
        remote
    }

    async fn seed(journal: &Journal<FileStore>, date: NaiveDate) -> Result<()> {
        journal
            .update_habits(|h| {
                h.push(habit("local_1_1", "Water"));
                Ok(())
            })
            .await?;
        journal
            .update_entries(|e| {
                e.push(entry("local_e_1_1", "local_1_1", 2000., date));
                Ok(())
            })
            .await
    }

    async fn run_sync(
        journal: &Journal<FileStore>,
        remote: &MockRemoteStore,
        cancel: &CancellationToken,
    ) -> (SyncReport, Vec<(String, u8)>) {
        *TEST_LOGGING;
        let mut progress = vec![];
        let report = sync_local_to_remote(journal, remote, cancel, |msg, pct| {
            progress.push((msg.to_string(), pct))
        })
        .await;
        (report, progress)
    }

    #[test]
    fn test_scaled_progress() {
        assert_eq!(scaled(5, 40, 0, 0), 5);
        assert_eq!(scaled(5, 40, 1, 2), 25);
        assert_eq!(scaled(60, 30, 2, 3), 80);
    }

    #[tokio::test]
    async fn test_local_records_take_server_ids() -> Result<()> {
        let (_dir, journal) = test_journal();
        seed(&journal, day(2025, 11, 12)).await?;

        let mut remote = signed_in();
        remote
            .expect_insert()
            .withf(|table, row| *table == Table::Habits && row["user_id"] == json!("user-1"))
            .times(1)
            .returning(|_, _| Ok(vec![json!({"id": 100})]));
        remote
            .expect_insert()
            .withf(|table, row| *table == Table::Entries && row["habit_id"] == json!("100"))
            .times(1)
            .returning(|_, _| Ok(vec![json!({"id": 200})]));
        remote.expect_select().returning(|table, _| match table {
            Table::Habits => Ok(vec![json!({"id": 100, "name": "Water"})]),
            _ => Ok(vec![
                json!({"id": 200, "habit_id": 100, "value": 2000, "entry_date": "2025-11-12"}),
            ]),
        });

        let (report, progress) = run_sync(&journal, &remote, &CancellationToken::new()).await;

        assert!(report.success, "{report:?}");
        assert_eq!((report.habits_pushed, report.entries_pushed), (1, 1));
        assert!(!report.partial);
        assert_eq!(progress.last().unwrap(), &("Merged server data locally".into(), 100));
        assert!(progress.contains(&("Remapped local entry habit IDs to server IDs".into(), 60)));

        let habits = journal.habits().await?;
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].id, "100");
        assert!(!habits[0].local);
        let entries = journal.entries().await?;
        assert_eq!(entries.len(), 1);
        assert_eq!((entries[0].id.as_str(), entries[0].habit_id.as_str()), ("200", "100"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failures_keep_local_copies() -> Result<()> {
        let (_dir, journal) = test_journal();
        seed(&journal, day(2025, 11, 12)).await?;
        journal
            .update_entries(|e| {
                e.push(entry("33", "9", 1., day(2025, 11, 11)));
                Ok(())
            })
            .await?;

        let mut remote = signed_in();
        remote
            .expect_insert()
            .returning(|_, _| Err(anyhow!("Remote error: 500")));
        remote
            .expect_update()
            .withf(|table, id, _| *table == Table::Entries && id == "33")
            .times(1)
            .returning(|_, _, _| Ok(vec![]));
        remote
            .expect_select()
            .returning(|_, _| Err(anyhow!("Remote error: 503")));

        let (report, progress) = run_sync(&journal, &remote, &CancellationToken::new()).await;

        assert!(report.success);
        assert_eq!(report.failures, 1);
        assert_eq!(report.skipped_entries, 1);
        assert_eq!(report.entries_pushed, 1);
        assert!(report.partial);
        assert_eq!(progress.last().unwrap(), &("Sync completed (partial)".into(), 100));

        assert_eq!(journal.habits().await?[0].id, "local_1_1");
        assert_eq!(journal.entries().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_merge_uses_fetched_collection() -> Result<()> {
        let (_dir, journal) = test_journal();
        journal
            .update_habits(|h| {
                h.push(habit("1", "Walk"));
                Ok(())
            })
            .await?;

        let mut remote = signed_in();
        remote
            .expect_update()
            .returning(|_, _, _| Ok(vec![json!({"id": 1})]));
        remote.expect_select().returning(|table, _| match table {
            Table::Habits => Ok(vec![
                json!({"id": 1, "name": "Walk"}),
                json!({"id": 2, "name": "Read", "updated_at": "2025-11-10T08:00:00Z"}),
            ]),
            _ => Err(anyhow!("Remote error: 503")),
        });

        let (report, _) = run_sync(&journal, &remote, &CancellationToken::new()).await;

        assert!(report.success && report.partial);
        let ids = journal
            .habits()
            .await?
            .into_iter()
            .map(|h| h.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["1", "2"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_records() -> Result<()> {
        let (_dir, journal) = test_journal();
        journal
            .update_habits(|h| {
                h.push(habit("local_1_1", "Water"));
                h.push(habit("local_1_2", "Walk"));
                Ok(())
            })
            .await?;

        let mut remote = signed_in();
        remote
            .expect_insert()
            .times(1)
            .returning(|_, _| Ok(vec![json!({"id": 100})]));
        remote.expect_select().never();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let report = sync_local_to_remote(&journal, &remote, &cancel, move |msg, _| {
            if msg.starts_with("Syncing habit") {
                token.cancel();
            }
        })
        .await;

        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some(SYNC_ABORTED));
        assert_eq!(report.habits_pushed, 1);
        let habits = journal.habits().await?;
        assert_eq!(habits[0].id, "100");
        assert_eq!(habits[1].id, "local_1_2");
        Ok(())
    }
}
