use std::{io::ErrorKind, path::Path};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::trace;

/// Reads the whole document under a shared lock. A missing or empty file reads as `None`.
pub async fn read_locked(path: &Path) -> Result<Option<String>, io::Error> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    file.lock_shared()?;
    let mut content = String::new();
    let result = file.read_to_string(&mut content).await;
    file.unlock_async().await?;
    result?;

    Ok(if content.is_empty() { None } else { Some(content) })
}

/// Replaces the document under an exclusive lock.
pub async fn write_locked(path: &Path, content: &[u8]) -> Result<(), io::Error> {
    let mut file = open_for_update(path).await?;
    file.lock_exclusive()?;
    let result = overwrite(&mut file, content).await;
    file.unlock_async().await?;
    result
}

/// Read-modify-write of a single document. The exclusive lock is held from the read until the
/// new content is flushed, so concurrent updaters of the same document are serialized.
///
/// `modify` receives the current content (`None` when missing or empty) and returns the new
/// content plus a value handed back to the caller. When `modify` fails nothing is written.
pub async fn update_locked<R>(
    path: &Path,
    modify: impl FnOnce(Option<&str>) -> Result<(String, R)>,
) -> Result<R> {
    let mut file = open_for_update(path).await?;
    file.lock_exclusive()?;
    let result = update_with_file(&mut file, modify).await;
    file.unlock_async().await?;
    result
}

async fn open_for_update(path: &Path) -> Result<File, io::Error> {
    File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await
}

async fn update_with_file<R>(
    file: &mut File,
    modify: impl FnOnce(Option<&str>) -> Result<(String, R)>,
) -> Result<R> {
    let mut current = String::new();
    file.read_to_string(&mut current).await?;
    let current = if current.is_empty() {
        None
    } else {
        Some(current.as_str())
    };

    let (next, value) = modify(current)?;
    overwrite(file, next.as_bytes()).await?;
    Ok(value)
}

async fn overwrite(file: &mut File, content: &[u8]) -> Result<(), io::Error> {
    trace!("Overwriting document with {} bytes", content.len());
    file.set_len(0).await?;
    file.rewind().await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_data().await
}
