//! In-memory test doubles for the gateway traits.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use parley_types::config::Settings;
use parley_types::conversation::ConversationRecord;
use parley_types::error::{HumanIoError, LlmError, StoreError};

use crate::context::ConversationContext;
use crate::gateway::{BlobStore, ChatClient, ConversationStore, HumanIo, KvStore};

/// Map-backed store usable as both a key-value and a blob store.
pub struct MemoryStore(Mutex<BTreeMap<String, String>>);

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(BTreeMap::new())))
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.0.lock().unwrap().keys().cloned().collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.0
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.0.lock().unwrap().remove(key);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.0.lock().unwrap().keys().cloned().collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.0
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.0.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Human that replays scripted answers and records everything it is shown.
///
/// `ask_choice` maps an empty scripted answer to the default choice, the
/// same way an interactive prompt maps an empty line. When the script is
/// exhausted, `ask` fails with [`HumanIoError::NoResponse`] and
/// `ask_choice` falls back to the default.
pub struct ScriptedHuman {
    answers: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<String>>,
    pub told: Mutex<Vec<String>>,
}

impl ScriptedHuman {
    pub fn new(answers: Vec<&str>) -> Arc<Self> {
        let mut answers: Vec<String> = answers.into_iter().map(str::to_string).collect();
        answers.reverse();
        Arc::new(Self {
            answers: Mutex::new(answers),
            prompts: Mutex::new(Vec::new()),
            told: Mutex::new(Vec::new()),
        })
    }

    fn next_answer(&self) -> Option<String> {
        self.answers.lock().unwrap().pop()
    }
}

#[async_trait]
impl HumanIo for ScriptedHuman {
    async fn ask(&self, prompt: &str) -> Result<String, HumanIoError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.next_answer().ok_or(HumanIoError::NoResponse)
    }

    async fn ask_choice(
        &self,
        prompt: &str,
        _options: &[&str],
        default: &str,
    ) -> Result<String, HumanIoError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.next_answer() {
            Some(answer) if answer.is_empty() => Ok(default.to_string()),
            Some(answer) => Ok(answer),
            None => Ok(default.to_string()),
        }
    }

    async fn tell(&self, message: &str) {
        self.told.lock().unwrap().push(message.to_string());
    }
}

/// Chat client that replays scripted completions and records prompts.
pub struct ScriptedChat {
    replies: Mutex<Vec<String>>,
    echo: Option<String>,
    calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<&str>) -> Arc<Self> {
        let mut replies: Vec<String> = replies.into_iter().map(str::to_string).collect();
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            echo: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// A client that answers every request with the same text.
    pub fn echo(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(Vec::new()),
            echo: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(&self, _system: Option<&str>, user: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(user.to_string());
        if let Some(reply) = self.replies.lock().unwrap().pop() {
            return Ok(reply);
        }
        match &self.echo {
            Some(reply) => Ok(reply.clone()),
            None => Err(LlmError::Network("no scripted reply left".to_string())),
        }
    }
}

/// Map-backed conversation store.
pub struct MemoryConversations(Mutex<BTreeMap<String, ConversationRecord>>);

impl MemoryConversations {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(BTreeMap::new())))
    }

    pub fn get(&self, id: &str) -> Option<ConversationRecord> {
        self.0.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversations {
    async fn load(&self, id: &str) -> Result<ConversationRecord, StoreError> {
        self.0
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotReadable(format!("no conversation `{id}`")))
    }

    async fn save(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        self.0
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.0.lock().unwrap().keys().cloned().collect())
    }
}

/// A fresh context over in-memory stores.
pub fn memory_context(settings: Settings) -> (ConversationContext, Arc<MemoryStore>, Arc<MemoryStore>) {
    let kv = MemoryStore::new();
    let blobs = MemoryStore::new();
    let record = ConversationRecord::new("conv-test", "assistant", "sam");
    let ctx = ConversationContext::new(record, kv.clone(), blobs.clone(), Arc::new(settings));
    (ctx, kv, blobs)
}
