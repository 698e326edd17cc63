//! In-memory store twins for ephemeral runs.
//!
//! Same contracts as the file-backed stores, with a mutex-guarded map
//! instead of a directory. Nothing survives the process.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use parley_core::gateway::{BlobStore, ConversationStore, KvStore};
use parley_types::conversation::ConversationRecord;
use parley_types::error::StoreError;

/// Key-value and blob storage that lives and dies with the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::NotReadable("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.guard()?.keys().cloned().collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.guard()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.guard()?.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.guard()?.remove(key);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        KvStore::list(self).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        KvStore::put(self, key, value).await
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        KvStore::read(self, key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        KvStore::delete(self, key).await
    }
}

/// Conversation store for `--ephemeral` runs. Records never touch disk.
#[derive(Default)]
pub struct MemoryConversationStore {
    records: Mutex<BTreeMap<String, ConversationRecord>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, ConversationRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::NotReadable("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn load(&self, id: &str) -> Result<ConversationRecord, StoreError> {
        self.guard()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotReadable(format!("no conversation `{id}`")))
    }

    async fn save(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        self.guard()?.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.guard()?.keys().cloned().collect())
    }
}
