//! Key-value storage as a single JSON document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use parley_core::gateway::KvStore;
use parley_types::error::StoreError;

/// `storage.json` inside a conversation directory.
///
/// The whole map is read and rewritten on every operation; the values a
/// model remembers are small and the simplicity beats partial updates.
/// Keys iterate in sorted order, which keeps the storage-key list in the
/// prompt stable across turns.
pub struct FileKvStore {
    path: PathBuf,
}

impl FileKvStore {
    pub fn new(conversation_dir: &Path) -> Self {
        Self {
            path: conversation_dir.join("storage.json"),
        }
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => {
                return Err(StoreError::NotReadable(format!(
                    "couldn't read {}: {err}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_str(&content).map_err(|err| {
            StoreError::NotReadable(format!("couldn't parse {}: {err}", self.path.display()))
        })
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                StoreError::NotWritable(format!("couldn't create {}: {err}", parent.display()))
            })?;
        }
        let content = serde_json::to_string(map).map_err(|err| {
            StoreError::NotWritable(format!("couldn't encode storage map: {err}"))
        })?;
        tokio::fs::write(&self.path, content).await.map_err(|err| {
            StoreError::NotWritable(format!("couldn't write {}: {err}", self.path.display()))
        })
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read_map().await?.into_keys().collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_map().await?.remove(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}
