//! Conversation records as pretty-printed JSON documents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use parley_core::gateway::ConversationStore;
use parley_types::conversation::ConversationRecord;
use parley_types::error::StoreError;

const RECORD_FILE: &str = "conversation.json";

/// `{data_dir}/conversations/{id}/conversation.json`.
pub struct FileConversationStore {
    root: PathBuf,
}

impl FileConversationStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: super::conversations_root(data_dir),
        }
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        // Conversation ids become directory names; anything that walks the
        // filesystem is rejected.
        if id.is_empty() || id.contains("..") || id.contains('/') || id.contains('\\') {
            return Err(StoreError::AccessDenied(id.to_string()));
        }
        Ok(self.root.join(id).join(RECORD_FILE))
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn load(&self, id: &str) -> Result<ConversationRecord, StoreError> {
        let path = self.record_path(id)?;
        let content = tokio::fs::read_to_string(&path).await.map_err(|err| {
            StoreError::NotReadable(format!("couldn't read {}: {err}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|err| {
            StoreError::NotReadable(format!("couldn't parse {}: {err}", path.display()))
        })
    }

    async fn save(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                StoreError::NotWritable(format!("couldn't create {}: {err}", parent.display()))
            })?;
        }
        let content = serde_json::to_string_pretty(record).map_err(|err| {
            StoreError::NotWritable(format!("couldn't encode conversation: {err}"))
        })?;
        tokio::fs::write(&path, content).await.map_err(|err| {
            StoreError::NotWritable(format!("couldn't write {}: {err}", path.display()))
        })
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(err) => {
                return Err(StoreError::NotReadable(format!(
                    "couldn't list {}: {err}",
                    self.root.display()
                )));
            }
        };
        while let Some(entry) = entries.next_entry().await.map_err(|err| {
            StoreError::NotReadable(format!("couldn't list {}: {err}", self.root.display()))
        })? {
            // Only directories that actually hold a record count
            if entry.path().join(RECORD_FILE).is_file() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
