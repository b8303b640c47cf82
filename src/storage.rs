//! Persisted key/value storage
//!
//! The cache owns a namespace inside a [`KeyValueStore`]; other data may
//! live next to it in the same store and must survive cache maintenance.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Async key/value storage area
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or overwrite `key`
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove the given keys, returning how many existed
    async fn remove(&self, keys: &[String]) -> Result<usize>;

    /// Every key currently stored, in sorted order
    async fn keys(&self) -> Result<Vec<String>>;

    /// Serialized size of every entry in the store
    async fn bytes_in_use(&self) -> Result<u64>;
}

fn entry_size(key: &str, value: &Value) -> u64 {
    let value_len = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
    (key.len() + value_len) as u64
}

fn remove_from(map: &mut BTreeMap<String, Value>, keys: &[String]) -> usize {
    keys.iter().filter(|key| map.remove(key.as_str()).is_some()).count()
}

/// In-process store, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<usize> {
        Ok(remove_from(&mut *self.entries.lock().await, keys))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }

    async fn bytes_in_use(&self) -> Result<u64> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().map(|(k, v)| entry_size(k, v)).sum())
    }
}

/// Store backed by a single JSON object file
///
/// The file is read once on open; every mutation rewrites it atomically
/// before returning, so a completed `set` is visible to the next process.
/// A failed write leaves the in-memory view unchanged.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`
    ///
    /// A missing file is an empty store. So is one that fails to parse: the next
    /// write replaces it.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt store file, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = entries.len(), "opened store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// `cache.json` in the platform cache directory
    pub async fn open_default() -> Result<Self> {
        Self::open(crate::settings::default_cache_dir().join("cache.json")).await
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let json = serde_json::to_vec(entries)?;
        write_atomic(&self.path, &json).await
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value);
        self.persist(&updated).await?;
        *entries = updated;
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let mut updated = entries.clone();
        let removed = remove_from(&mut updated, keys);
        if removed > 0 {
            self.persist(&updated).await?;
            *entries = updated;
        }
        Ok(removed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }

    async fn bytes_in_use(&self) -> Result<u64> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().map(|(k, v)| entry_size(k, v)).sum())
    }
}

/// Write a file via temp file + rename, creating parent directories
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    tokio::fs::write(&temp, contents).await?;
    tokio::fs::rename(&temp, path).await?;
    Ok(())
}
