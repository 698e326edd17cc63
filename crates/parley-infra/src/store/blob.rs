//! Blob storage as plain files in a conversation-scoped directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use parley_core::gateway::BlobStore;
use parley_types::error::StoreError;

/// The `files/` directory inside a conversation directory.
///
/// Blob names may contain subdirectories but never parent-directory
/// traversal; any name containing `..` is rejected before touching disk.
pub struct FileBlobStore {
    base: PathBuf,
}

impl FileBlobStore {
    pub fn new(conversation_dir: &Path) -> Self {
        Self {
            base: conversation_dir.join("files"),
        }
    }

    fn checked_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.contains("..") || Path::new(key).is_absolute() {
            return Err(StoreError::AccessDenied(key.to_string()));
        }
        Ok(self.base.join(key))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut pending = vec![self.base.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    return Err(StoreError::NotReadable(format!(
                        "couldn't list {}: {err}",
                        dir.display()
                    )));
                }
            };
            while let Some(entry) = entries.next_entry().await.map_err(|err| {
                StoreError::NotReadable(format!("couldn't list {}: {err}", dir.display()))
            })? {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.base) {
                    names.push(relative.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.checked_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                StoreError::NotWritable(format!("couldn't create {}: {err}", parent.display()))
            })?;
        }
        tokio::fs::write(&path, value).await.map_err(|err| {
            StoreError::NotWritable(format!("couldn't write {}: {err}", path.display()))
        })
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.checked_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::NotReadable(format!(
                "couldn't read {}: {err}",
                path.display()
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.checked_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::NotWritable(format!(
                "couldn't delete {}: {err}",
                path.display()
            ))),
        }
    }
}
