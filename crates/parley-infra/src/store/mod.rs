//! File-backed persistence under the data directory.
//!
//! Everything belonging to one conversation lives in one directory:
//!
//! ```text
//! {data_dir}/conversations/{id}/
//!   conversation.json   message history and participants
//!   storage.json        key-value storage
//!   files/              blob storage
//! ```
//!
//! The stores are conversation-scoped: each instance is constructed for
//! one conversation directory, so keys and files from different
//! conversations can never collide.

pub mod blob;
pub mod conversation;
pub mod kv;
pub mod memory;

pub use blob::FileBlobStore;
pub use conversation::FileConversationStore;
pub use kv::FileKvStore;
pub use memory::{MemoryConversationStore, MemoryStore};

use std::path::{Path, PathBuf};

/// The root directory for all conversations.
pub fn conversations_root(data_dir: &Path) -> PathBuf {
    data_dir.join("conversations")
}

/// The directory for one conversation.
pub fn conversation_dir(data_dir: &Path, id: &str) -> PathBuf {
    conversations_root(data_dir).join(id)
}
