use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

/// Every kind of data that gets persisted. Each collection lives in its own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Blocks,
    Categories,
    Statistics,
}

impl Collection {
    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::Blocks => "blocks.jsonl",
            Collection::Categories => "categories.jsonl",
            Collection::Statistics => "statistics.jsonl",
        }
    }
}

/// Interface for abstracting storage of blocks, categories and cached statistics.
pub trait Storage {
    /// Reads every value of a collection. A collection that was never saved is empty.
    fn load<T: DeserializeOwned>(&self, collection: Collection)
    -> impl Future<Output = Result<Vec<T>>>;

    /// Replaces the contents of a collection.
    fn save<T: Serialize>(
        &self,
        collection: Collection,
        values: &[T],
    ) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> Storage for T
where
    T::Target: Storage,
{
    fn load<V: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> impl Future<Output = Result<Vec<V>>> {
        self.deref().load(collection)
    }

    fn save<V: Serialize>(
        &self,
        collection: Collection,
        values: &[V],
    ) -> impl Future<Output = Result<()>> {
        self.deref().save(collection, values)
    }
}

/// The main realization of [Storage]. Values are written as json lines into a directory, one
/// file per [Collection].
pub struct JsonStorage {
    dir: PathBuf,
}

impl JsonStorage {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }
}

async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, std::io::Error> {
    debug!("Reading {path:?}");
    let file = File::open(path).await?;
    file.lock_shared()?;
    let buffer = BufReader::new(file);
    let mut lines = buffer.lines();
    let mut values = vec![];
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(v) => values.push(v),
            Err(e) => {
                // A half written line shouldn't take the rest of the data down with it.
                warn!("Skipping illegal json line in {:?} {}: {e}", path, &line)
            }
        }
    }

    lines.into_inner().into_inner().unlock_async().await?;

    Ok(values)
}

async fn write_lines(file: &mut File, buffer: &[u8]) -> Result<(), std::io::Error> {
    file.set_len(0).await?;
    file.write_all(buffer).await?;
    file.flush().await?;
    file.sync_data().await
}

impl Storage for JsonStorage {
    async fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let path = self.path(collection);
        match read_lines(&path).await {
            Ok(values) => Ok(values),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(e) => Err(e).with_context(|| format!("Failed to read {path:?}")),
        }
    }

    async fn save<T: Serialize>(&self, collection: Collection, values: &[T]) -> Result<()> {
        let path = self.path(collection);

        let mut buffer = Vec::<u8>::new();
        for value in values {
            serde_json::to_writer(&mut buffer, value)?;
            buffer.push(b'\n');
        }

        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {path:?}"))?;

        // Truncation happens only after the lock is held so readers never see a partial file
        // from this writer.
        file.lock_exclusive()?;
        let result = write_lines(&mut file, &buffer).await;
        file.unlock_async().await?;
        result.with_context(|| format!("Failed to write {path:?}"))?;

        debug!("Saved {} values into {path:?}", values.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use crate::store::entities::{BlockId, Category, CategoryId, TimeBlock};

    use super::{Collection, JsonStorage, Storage};

    fn test_block(id: u64, hour: u32) -> TimeBlock {
        TimeBlock {
            id: BlockId(id),
            title: format!("block {id}"),
            start: Utc.with_ymd_and_hms(2018, 7, 4, hour, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2018, 7, 4, hour + 1, 0, 0).unwrap(),
            category_id: Some(CategoryId(1)),
            notes: "notes".into(),
            completed: id % 2 == 0,
        }
    }

    #[tokio::test]
    async fn test_storage_basic() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonStorage::new(dir.path().to_owned())?;
        let blocks = vec![test_block(1, 9), test_block(2, 10)];

        storage.save(Collection::Blocks, &blocks).await?;

        let stored: Vec<TimeBlock> = storage.load(Collection::Blocks).await?;
        assert_eq!(stored, blocks);

        Ok(())
    }

    #[tokio::test]
    async fn test_storage_missing_collection_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonStorage::new(dir.path().join("nested"))?;

        let stored: Vec<Category> = storage.load(Collection::Categories).await?;
        assert!(stored.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_overwrite_shrinks_file() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonStorage::new(dir.path().to_owned())?;

        storage
            .save(
                Collection::Blocks,
                &[test_block(1, 9), test_block(2, 10), test_block(3, 11)],
            )
            .await?;
        storage.save(Collection::Blocks, &[test_block(2, 10)]).await?;

        let stored: Vec<TimeBlock> = storage.load(Collection::Blocks).await?;
        assert_eq!(stored, vec![test_block(2, 10)]);

        let raw = std::fs::read_to_string(dir.path().join(Collection::Blocks.file_name()))?;
        assert_eq!(raw.lines().count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_skips_corrupted_lines() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonStorage::new(dir.path().to_owned())?;

        let mut contents = serde_json::to_string(&test_block(1, 9))?;
        contents.push('\n');
        contents += "{\"id\": 2, \"title\": \"cut of";
        contents.push('\n');
        contents.push('\n');
        contents += &serde_json::to_string(&test_block(3, 11))?;

        let mut file =
            std::fs::File::create(dir.path().join(Collection::Blocks.file_name()))?;
        file.write_all(contents.as_bytes())?;
        drop(file);

        let stored: Vec<TimeBlock> = storage.load(Collection::Blocks).await?;
        assert_eq!(stored, vec![test_block(1, 9), test_block(3, 11)]);
        Ok(())
    }
}
