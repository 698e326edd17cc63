//! Live conversation context.
//!
//! A [`ConversationContext`] is the persisted [`ConversationRecord`] plus
//! the live handles that are re-attached on load: the conversation-scoped
//! stores and the application settings. The engine is the single writer;
//! no other component holds a mutable alias across turns.

use std::sync::Arc;

use parley_types::config::Settings;
use parley_types::conversation::ConversationRecord;
use parley_types::message::ChatMessage;

use crate::gateway::{BlobStore, KvStore};

/// All state for one running conversation.
pub struct ConversationContext {
    /// The persistable part: id, participants, message history.
    pub record: ConversationRecord,
    /// Key-value store scoped to this conversation.
    pub kv: Arc<dyn KvStore>,
    /// Blob store scoped to this conversation.
    pub blobs: Arc<dyn BlobStore>,
    /// Application settings.
    pub settings: Arc<Settings>,
}

impl ConversationContext {
    /// Attach live handles to a (loaded or fresh) record.
    pub fn new(
        record: ConversationRecord,
        kv: Arc<dyn KvStore>,
        blobs: Arc<dyn BlobStore>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            record,
            kv,
            blobs,
            settings,
        }
    }

    /// Append one message to the history. Insertion order is chronological
    /// order; entries are never reordered or removed during a session.
    pub fn append(&mut self, message: ChatMessage) {
        self.record.history.push(message);
    }

    /// The conversation id.
    pub fn id(&self) -> &str {
        &self.record.id
    }
}
