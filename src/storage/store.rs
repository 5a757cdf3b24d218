use std::{future::Future, ops::Deref, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::fs::operations::{read_locked, update_locked, write_locked};

pub const HABITS_KEY: &str = "hj_local_habits";
pub const ENTRIES_KEY: &str = "hj_local_entries";
pub const SECTIONS_KEY: &str = "hj_local_sections";
pub const THEME_KEY: &str = "hj_theme";

/// Interface for abstracting the key-value documents the journal lives in.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;

    /// Atomic read-modify-write of a single key. See [update_locked].
    fn update<R: Send>(
        &self,
        key: &str,
        modify: impl FnOnce(Option<&str>) -> Result<(String, R)> + Send,
    ) -> impl Future<Output = Result<R>> + Send;
}

impl<T: Deref + Sync> KeyValueStore for T
where
    T::Target: KeyValueStore + Sync,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        self.deref().get(key)
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send {
        self.deref().set(key, value)
    }

    fn update<R: Send>(
        &self,
        key: &str,
        modify: impl FnOnce(Option<&str>) -> Result<(String, R)> + Send,
    ) -> impl Future<Output = Result<R>> + Send {
        self.deref().update(key, modify)
    }
}

/// The main realization of [KeyValueStore]: one JSON document per key inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        read_locked(&path)
            .await
            .with_context(|| format!("Failed to read {path:?}"))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key);
        write_locked(&path, value.as_bytes())
            .await
            .with_context(|| format!("Failed to write {path:?}"))
    }

    async fn update<R: Send>(
        &self,
        key: &str,
        modify: impl FnOnce(Option<&str>) -> Result<(String, R)> + Send,
    ) -> Result<R> {
        update_locked(&self.path_for(key), modify).await
    }
}

/// Decodes a stored JSON array. Elements that don't match `T` are skipped, a document that is not
/// an array at all is an error.
pub fn decode_collection<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> Result<Vec<T>> {
    let Some(raw) = raw else {
        return Ok(vec![]);
    };
    let document: Value =
        serde_json::from_str(raw).with_context(|| format!("Document {key} is not valid json"))?;
    let Value::Array(items) = document else {
        return Err(anyhow!("Document {key} is not a json array"));
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                // ignore illegal values, they are most likely hand edits
                warn!("Skipping illegal record in {key} {item}: {e}");
                None
            }
        })
        .collect())
}

pub fn encode_collection<T: Serialize>(items: &[T]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}
