//! Durable key-value store abstraction
//!
//! The session layer persists a handful of string entries so that a session
//! survives a restart of the client. This module defines the [`KeyValueStore`]
//! contract together with an in-memory backend and a JSON file backend. The
//! Redis backend lives in [`crate::cache`].

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// String key-value storage that outlives the process
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a key-value pair, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Write several entries together.
    ///
    /// Backends that can write atomically override this; the default writes
    /// the entries one by one.
    async fn set_many(&self, entries: &[(&str, &str)]) -> StoreResult<()> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Delete several keys together
    async fn delete_many(&self, keys: &[&str]) -> StoreResult<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }
}

/// Process-local store, mostly useful for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> StoreResult<()> {
        let mut map = self.entries.write().await;
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn delete_many(&self, keys: &[&str]) -> StoreResult<()> {
        let mut map = self.entries.write().await;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Store backed by a single JSON document on disk.
///
/// Every write rewrites the whole document through a temporary file and an
/// atomic rename, so readers never observe a half-written file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Create a file store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> StoreResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(StoreError::Corrupted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let document = serde_json::to_string_pretty(map).map_err(StoreError::Corrupted)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = fs::File::create(&tmp_path).await?;
        tmp_file.write_all(document.as_bytes()).await?;
        tmp_file.sync_all().await?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).await?;
        debug!("Wrote {} entries to {}", map.len(), self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> StoreResult<PathBuf> {
        let file_name = self.path.file_name().ok_or_else(|| {
            StoreError::Configuration(format!(
                "Store path has no file name: {}",
                self.path.display()
            ))
        })?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        Ok(self.path.with_file_name(tmp_name))
    }

    async fn update<F>(&self, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) + Send,
    {
        let _guard = self.lock.lock().await;

        let mut map = match self.read_map().await {
            Ok(map) => map,
            Err(StoreError::Corrupted(e)) => {
                warn!(
                    "Discarding corrupted store document {}: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };

        apply(&mut map);
        self.write_map(&map).await
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        Ok(map.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
        .await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.update(|map| {
            map.remove(key);
        })
        .await
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> StoreResult<()> {
        self.update(|map| {
            for (key, value) in entries {
                map.insert(key.to_string(), value.to_string());
            }
        })
        .await
    }

    async fn delete_many(&self, keys: &[&str]) -> StoreResult<()> {
        self.update(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_set_get_delete() -> StoreResult<()> {
        let store = MemoryStore::new();

        store.set("user", "alice").await?;
        assert_eq!(store.get("user").await?, Some("alice".to_string()));

        store.delete("user").await?;
        assert_eq!(store.get("user").await?, None);

        // Deleting again is harmless
        store.delete("user").await?;
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_store_batch_operations() -> StoreResult<()> {
        let store = MemoryStore::new();

        store
            .set_many(&[("user", "{}"), ("token", "abc"), ("lastActivity", "1")])
            .await?;
        assert_eq!(store.len().await, 3);

        store.delete_many(&["user", "token", "lastActivity"]).await?;
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() -> StoreResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::new(&path);
        store.set_many(&[("user", "{\"id\":\"1\"}"), ("token", "t")]).await?;

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("token").await?, Some("t".to_string()));
        assert_eq!(
            reopened.get("user").await?,
            Some("{\"id\":\"1\"}".to_string())
        );
        assert_eq!(reopened.get("missing").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_store_missing_file_reads_empty() -> StoreResult<()> {
        let dir = tempfile::tempdir()?;
        let store = FileStore::new(dir.path().join("absent.json"));

        assert_eq!(store.get("user").await?, None);
        store.delete_many(&["user", "token"]).await?;
        assert_eq!(store.get("user").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_store_corrupted_document() -> StoreResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json")?;

        let store = FileStore::new(&path);
        assert!(matches!(
            store.get("user").await,
            Err(StoreError::Corrupted(_))
        ));

        // A write replaces the corrupted document
        store.set("token", "fresh").await?;
        assert_eq!(store.get("token").await?, Some("fresh".to_string()));
        Ok(())
    }
}
