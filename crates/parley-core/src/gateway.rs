//! Gateway traits consumed by the conversation engine.
//!
//! These are the seams between the deterministic core and the outside
//! world: the model API, the human at the terminal, and the persistence
//! backends. Implementations live in `parley-infra` and `parley-cli`.
//!
//! All traits are object-safe (`async_trait`) because the conversation
//! context and the command registry hold them behind `dyn`.

use async_trait::async_trait;

use parley_types::conversation::ConversationRecord;
use parley_types::error::{HumanIoError, LlmError, StoreError};

/// Default system-role instruction when no capability supplies an override.
pub const DEFAULT_PERSONA: &str = "Assistant is a helpful, friendly and knowledgeable agent. \
The assistant always answers exactly in the format specified. \
The assistant does not respond twice with the same answer.";

/// A client for one-shot model completions.
///
/// One system-role instruction plus one user-role message, a fixed low
/// sampling temperature, exactly one textual completion back. No streaming.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a completion request and return the completion text.
    ///
    /// `system` overrides the default persona when given.
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String, LlmError>;
}

/// The human at the other end of the conversation.
///
/// All prompts the engine or dispatcher address to the human go through
/// this contract; nothing else in the core writes to a terminal.
#[async_trait]
pub trait HumanIo: Send + Sync {
    /// Ask a free-text question and block until the human answers.
    async fn ask(&self, prompt: &str) -> Result<String, HumanIoError>;

    /// Ask a question with a fixed set of options, repeating until the
    /// human picks one of them. Empty input selects `default`.
    async fn ask_choice(
        &self,
        prompt: &str,
        options: &[&str],
        default: &str,
    ) -> Result<String, HumanIoError>;

    /// Show a message to the human.
    async fn tell(&self, message: &str);
}

/// Persistence for conversation records.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load the record for a conversation id.
    async fn load(&self, id: &str) -> Result<ConversationRecord, StoreError>;

    /// Persist a record, replacing any previous version.
    async fn save(&self, record: &ConversationRecord) -> Result<(), StoreError>;

    /// Ids of all persisted conversations.
    async fn list_ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Conversation-scoped key-value storage.
///
/// An implementation is constructed for one conversation id; keys from
/// different conversations never collide.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// All keys currently present, in stable order.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Store a value under a key (upsert).
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Read the value for a key, or `None` if absent.
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove a key. No-op if absent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Conversation-scoped storage for named text blobs.
///
/// Same surface as [`KvStore`] but intended for file-like content.
/// Implementations must reject keys containing parent-directory traversal.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// All blob names currently present.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Write a blob, replacing any previous content.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Read a blob, or `None` if absent.
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove a blob.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
