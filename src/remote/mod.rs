//! Contains the table based client for the hosted backend.
//! [RemoteStore] is the contract the rest of the application talks to, [connect] picks the
//! realization depending on whether the backend is configured.

pub mod postgrest;
pub mod tables;

use std::fmt::Display;

use anyhow::{bail, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tracing::warn;

use postgrest::{PostgrestClient, RemoteConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Habits,
    Entries,
    Sections,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Habits => "habits",
            Table::Entries => "entries",
            Table::Sections => "sections",
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// Column plus `true` for ascending order.
    pub order_by: Option<(&'static str, bool)>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn ordered(self, column: &'static str, ascending: bool) -> Self {
        Self {
            order_by: Some((column, ascending)),
            ..self
        }
    }
}

/// Generic select/insert/update access to the remote tables. Rows travel as raw json so that
/// columns the application doesn't know about survive.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Id of the signed in user or `None` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<String>>;

    async fn select(&self, table: Table, query: SelectQuery) -> Result<Vec<Value>>;

    /// Inserts a row and returns the stored representation.
    async fn insert(&self, table: Table, row: Value) -> Result<Vec<Value>>;

    /// Updates the row with `id` and returns the stored representation.
    async fn update(&self, table: Table, id: &str, row: Value) -> Result<Vec<Value>>;
}

/// Stand-in used when no backend is configured. Nobody is ever signed in and every table call
/// fails, which makes every caller fall back to local data.
pub struct NoopRemote;

#[async_trait]
impl RemoteStore for NoopRemote {
    async fn current_user(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn select(&self, _table: Table, _query: SelectQuery) -> Result<Vec<Value>> {
        bail!("Remote store not configured")
    }

    async fn insert(&self, _table: Table, _row: Value) -> Result<Vec<Value>> {
        bail!("Remote store not configured")
    }

    async fn update(&self, _table: Table, _id: &str, _row: Value) -> Result<Vec<Value>> {
        bail!("Remote store not configured")
    }
}

pub fn connect(config: Option<RemoteConfig>) -> Result<Box<dyn RemoteStore>> {
    match config {
        Some(config) => Ok(Box::new(PostgrestClient::new(config)?)),
        None => {
            warn!("Remote url or key not set, running in local only mode");
            Ok(Box::new(NoopRemote))
        }
    }
}
