use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::{
    remote::{
        tables::{returned_id, signed_in_user, to_row, SectionPayload},
        RemoteStore, Table,
    },
    storage::{
        entities::{new_local_section_id, Section},
        store::KeyValueStore,
    },
};

use super::{Journal, SaveOutcome};

pub const DEFAULT_SECTION_COLOR: &str = "#FFD75A";

impl<S: KeyValueStore + Sync> Journal<S> {
    /// Signed out sections are kept locally. Signed in ones go to the remote store, falling back to
    /// a local copy when it refuses them.
    pub async fn create_section(
        &self,
        remote: &dyn RemoteStore,
        name: &str,
        color: Option<&str>,
    ) -> Result<(Section, SaveOutcome)> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Please enter a section name.");
        }
        let color = color
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_SECTION_COLOR)
            .to_string();
        let now = self.clock.time();

        let mut section = Section {
            id: new_local_section_id(now),
            user_id: None,
            name: name.into(),
            color: Some(color),
            created_at: Some(now),
            local: true,
        };

        let outcome = match signed_in_user(remote).await {
            None => SaveOutcome::SavedLocally,
            Some(user_id) => {
                let payload = SectionPayload {
                    user_id: Some(user_id.clone()),
                    name: section.name.clone(),
                    color: section.color.clone(),
                };
                match remote.insert(Table::Sections, to_row(&payload)?).await {
                    Ok(rows) => {
                        // the server copy is cached so listing works offline
                        if let Some(id) = returned_id(&rows) {
                            section.id = id;
                        }
                        section.user_id = Some(user_id);
                        section.local = false;
                        SaveOutcome::Saved
                    }
                    Err(e) => {
                        warn!("Failed to create section remotely, saved locally {e:?}");
                        SaveOutcome::ServerError
                    }
                }
            }
        };

        let stored = section.clone();
        self.update_sections(move |sections| {
            sections.insert(0, stored);
            Ok(())
        })
        .await?;
        info!("Created section {}", section.name);
        Ok((section, outcome))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use serde_json::json;

    use crate::{
        journal::{test_utils::test_journal, SaveOutcome},
        remote::{MockRemoteStore, NoopRemote, Table},
    };

    use super::DEFAULT_SECTION_COLOR;

    #[tokio::test]
    async fn test_requires_name() {
        let (_dir, journal) = test_journal();
        let err = journal
            .create_section(&NoopRemote, "   ", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a section name.");
    }

    #[tokio::test]
    async fn test_signed_out_is_local() -> Result<()> {
        let (_dir, journal) = test_journal();
        let (section, outcome) = journal.create_section(&NoopRemote, "Health", None).await?;
        assert_eq!(outcome, SaveOutcome::SavedLocally);
        assert!(section.id.starts_with("local_section_"));
        assert_eq!(section.color.as_deref(), Some(DEFAULT_SECTION_COLOR));
        assert_eq!(journal.sections().await?, vec![section]);
        Ok(())
    }

    #[tokio::test]
    async fn test_signed_in_fallback() -> Result<()> {
        let (_dir, journal) = test_journal();
        let mut remote = MockRemoteStore::new();
        remote
            .expect_current_user()
            .returning(|| Ok(Some("user-1".into())));
        let mut calls = 0;
        remote
            .expect_insert()
            .withf(|table, _| *table == Table::Sections)
            .times(2)
            .returning(move |_, _| {
                calls += 1;
                if calls == 1 {
                    Ok(vec![json!({"id": 3})])
                } else {
                    Err(anyhow!("Remote error: 500"))
                }
            });

        let (first, outcome) = journal
            .create_section(&remote, "Work", Some("#6C5CE7"))
            .await?;
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(first.id, "3");
        assert_eq!(first.user_id.as_deref(), Some("user-1"));

        let (second, outcome) = journal.create_section(&remote, "Home", None).await?;
        assert_eq!(outcome, SaveOutcome::ServerError);
        assert!(second.local);

        let stored = journal.sections().await?;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].name, "Home");
        Ok(())
    }
}
