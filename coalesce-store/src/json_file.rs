//! JSON file-backed store implementation.
//!
//! Each named instance lives in `<dir>/<name>.json`. The whole map is
//! loaded on open and written through on every mutation: the new contents
//! go to a temporary file first, which then replaces the old one, so a
//! crash mid-write never leaves a truncated store behind.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::{StoreError, StoreResult};
use crate::traits::KeyValueStore;

/// Store name used when the caller does not pick one
pub const DEFAULT_STORE_NAME: &str = "data";

/// Persistent KeyValueStore backed by a single JSON document
#[derive(Debug)]
pub struct JsonFileStore<V> {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, V>>,
}

impl<V> JsonFileStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Opens (or creates) the store named `name` inside `dir`.
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub async fn open(dir: impl AsRef<Path>, name: &str) -> StoreResult<Self> {
        validate_name(name)?;
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io(dir, e))?;

        let path = dir.join(format!("{name}.json"));
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened store");
        Ok(Self { path, entries: RwLock::new(entries) })
    }

    /// Opens the store named [`DEFAULT_STORE_NAME`] inside `dir`.
    pub async fn open_default(dir: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(dir, DEFAULT_STORE_NAME).await
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, V>) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

fn validate_name(name: &str) -> StoreResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StoreError::InvalidName { name: name.to_string() });
    }
    Ok(())
}

#[async_trait]
impl<V> KeyValueStore<V> for JsonFileStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> StoreResult<Option<V>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: V) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        let previous = entries.insert(key.to_string(), value);

        if let Err(err) = self.persist(&entries).await {
            // Keep memory in line with what is on disk
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<Option<V>> {
        let mut entries = self.entries.write().await;
        let Some(removed) = entries.remove(key) else {
            return Ok(None);
        };

        if let Err(err) = self.persist(&entries).await {
            entries.insert(key.to_string(), removed);
            return Err(err);
        }
        Ok(Some(removed))
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("data").is_ok());
        assert!(validate_name("fonts-v2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
    }

    #[tokio::test]
    async fn test_open_creates_nothing_until_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<u32> = JsonFileStore::open_default(dir.path()).await.unwrap();

        assert_eq!(store.path(), dir.path().join("data.json"));
        assert!(!store.path().exists());

        store.set("k", 1).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), b"{not json").unwrap();

        let result: StoreResult<JsonFileStore<u32>> = JsonFileStore::open_default(dir.path()).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
