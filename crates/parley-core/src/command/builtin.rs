//! Built-in capabilities that only need the conversation context.
//!
//! Everything here works against the gateways already hanging off the
//! context (stores, the human, the model), so these commands are available
//! in every installation. Capabilities with their own outbound HTTP
//! (web search, website reading, news) live in the infrastructure crate.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;

use parley_types::command::{ArgKind, ArgSpec};
use parley_types::error::{CapabilityError, HumanIoError, StoreError};
use parley_types::message::ChatMessage;

use crate::command::{BoundArgs, Capability, CommandRegistry};
use crate::context::ConversationContext;
use crate::gateway::{ChatClient, HumanIo};

/// Register every built-in capability in catalogue order.
///
/// `human` answers `ask_human` questions; `agent` serves `ask_ai_agent`
/// side-queries.
pub fn register_builtins(
    registry: &mut CommandRegistry,
    human: Arc<dyn HumanIo>,
    agent: Arc<dyn ChatClient>,
) {
    registry.register(Arc::new(Answer));
    registry.register(Arc::new(AskHuman { human }));
    registry.register(Arc::new(StorageRead));
    registry.register(Arc::new(StorageWrite));
    registry.register(Arc::new(StorageDelete));
    registry.register(Arc::new(ReadFile));
    registry.register(Arc::new(WriteFile));
    registry.register(Arc::new(ListFiles));
    registry.register(Arc::new(GetDatetime));
    registry.register(Arc::new(ReadConversationHistory));
    registry.register(Arc::new(AskAiAgent { agent }));
}

fn store_failure(err: StoreError) -> CapabilityError {
    CapabilityError::Internal(err.to_string())
}

/// Deliver a final answer to the human.
///
/// The engine intercepts this command before dispatch; executing it just
/// echoes the answer so a direct invocation still behaves sensibly.
pub struct Answer;

#[async_trait]
impl Capability for Answer {
    fn name(&self) -> &'static str {
        "answer"
    }

    fn description(&self) -> &'static str {
        "Provide a final answer."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required(
            "answer",
            ArgKind::String,
            "the answer or result you want to provide",
        )]
    }

    async fn execute(
        &self,
        _ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        Ok(args.str("answer")?.to_string())
    }
}

/// Ask the human a question mid-plan.
pub struct AskHuman {
    human: Arc<dyn HumanIo>,
}

#[async_trait]
impl Capability for AskHuman {
    fn name(&self) -> &'static str {
        "ask_human"
    }

    fn description(&self) -> &'static str {
        "Ask the user a specific question. The question must be very precise and not be broad. \
         Do only ask if you don't know the answer or have no other way to find it."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![
            ArgSpec::required("question", ArgKind::String, "the question to ask"),
            ArgSpec::optional(
                "human",
                ArgKind::String,
                "the human to ask a question (may also be `all`)",
            ),
        ]
    }

    async fn execute(
        &self,
        _ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let question = args.str("question")?;
        match self.human.ask(&format!("Question from bot: {question}")).await {
            Ok(answer) => Ok(answer),
            Err(HumanIoError::NoResponse) => Err(CapabilityError::Failed {
                reply: "The human did not want to answer the question.".to_string(),
                detail: "empty response from human interaction".to_string(),
            }),
            Err(err @ HumanIoError::Unavailable(_)) => Err(CapabilityError::Failed {
                reply: "Sorry, I can't ask a human for an answer at the moment.".to_string(),
                detail: format!("human interaction could not be performed: {err}"),
            }),
        }
    }
}

/// Read a value from the key-value storage.
pub struct StorageRead;

#[async_trait]
impl Capability for StorageRead {
    fn name(&self) -> &'static str {
        "storage_read"
    }

    fn description(&self) -> &'static str {
        "Reads a value from the storage."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required("key", ArgKind::String, "the storage key")]
    }

    async fn execute(
        &self,
        ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let key = args.str("key")?;
        let value = ctx.kv.read(key).await.map_err(store_failure)?;
        Ok(value.unwrap_or_else(|| "N/A".to_string()))
    }
}

/// Write a value to the key-value storage.
pub struct StorageWrite;

#[async_trait]
impl Capability for StorageWrite {
    fn name(&self) -> &'static str {
        "storage_write"
    }

    fn description(&self) -> &'static str {
        "Writes a value to the storage. Use this to remember long term information."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![
            ArgSpec::required(
                "key",
                ArgKind::String,
                "The storage key. You should be able to make sense of this.",
            ),
            ArgSpec::required("value", ArgKind::String, "the value to store"),
        ]
    }

    fn needs_confirmation(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let key = args.str("key")?;
        let value = args.str("value")?;
        ctx.kv.put(key, value).await.map_err(store_failure)?;
        Ok(format!("Added {key} with value {value} to storage."))
    }
}

/// Delete a value from the key-value storage.
pub struct StorageDelete;

#[async_trait]
impl Capability for StorageDelete {
    fn name(&self) -> &'static str {
        "storage_delete"
    }

    fn description(&self) -> &'static str {
        "Deletes a value from the storage."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required("key", ArgKind::String, "the key to delete")]
    }

    fn needs_confirmation(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let key = args.str("key")?;
        let keys = ctx.kv.list().await.map_err(store_failure)?;
        if !keys.iter().any(|k| k == key) {
            return Ok(format!("Key {key} not found."));
        }
        ctx.kv.delete(key).await.map_err(store_failure)?;
        Ok(format!("{key} deleted."))
    }
}

fn blob_failure(file_name: &str, action: &str, err: StoreError) -> CapabilityError {
    match err {
        StoreError::AccessDenied(_) => {
            let message = format!("Not allowed to access `{file_name}`");
            CapabilityError::failed(message)
        }
        other => CapabilityError::Failed {
            reply: format!("Error {action} file `{file_name}`"),
            detail: format!("error {action} file `{file_name}`: {other}"),
        },
    }
}

/// Read a file from the blob storage.
pub struct ReadFile;

#[async_trait]
impl Capability for ReadFile {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Reads a file from storage."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required("file_name", ArgKind::String, "the file name")]
    }

    fn needs_confirmation(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let file_name = args.str("file_name")?;
        match ctx.blobs.read(file_name).await {
            Ok(None) => Ok("File not found.".to_string()),
            Ok(Some(content)) if content.is_empty() => Ok("Empty file.".to_string()),
            Ok(Some(content)) => Ok(content),
            Err(err) => Err(blob_failure(file_name, "reading", err)),
        }
    }
}

/// Write a file to the blob storage.
pub struct WriteFile;

#[async_trait]
impl Capability for WriteFile {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Writes a file to the file storage."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![
            ArgSpec::required("file_name", ArgKind::String, "the file name"),
            ArgSpec::required("file_content", ArgKind::String, "content to write to file"),
        ]
    }

    fn needs_confirmation(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let file_name = args.str("file_name")?;
        let file_content = args.str("file_content")?;
        ctx.blobs
            .put(file_name, file_content)
            .await
            .map_err(|err| blob_failure(file_name, "writing", err))?;
        Ok(format!("File `{file_name}` written."))
    }
}

/// List the files in the blob storage.
pub struct ListFiles;

#[async_trait]
impl Capability for ListFiles {
    fn name(&self) -> &'static str {
        "list_files"
    }

    fn description(&self) -> &'static str {
        "Lists all files in the file storage. You can receive all files we created during the conversation."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        Vec::new()
    }

    fn needs_confirmation(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &ConversationContext,
        _args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let files = ctx.blobs.list().await.map_err(|err| CapabilityError::Failed {
            reply: "Error listing file storage".to_string(),
            detail: format!("error reading file storage: {err}"),
        })?;
        if files.is_empty() {
            Ok("No files found.".to_string())
        } else {
            Ok(format!("Files found: {}", files.join(", ")))
        }
    }
}

/// Tell the model what time it is.
pub struct GetDatetime;

#[async_trait]
impl Capability for GetDatetime {
    fn name(&self) -> &'static str {
        "get_datetime"
    }

    fn description(&self) -> &'static str {
        "Provides the current date and time"
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        Vec::new()
    }

    async fn execute(
        &self,
        _ctx: &ConversationContext,
        _args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        Ok(format!(
            "The current date is: `{}`",
            Local::now().format("%d/%m/%Y at %H:%M:%S")
        ))
    }
}

/// Retrieve one history entry by index.
pub struct ReadConversationHistory;

#[async_trait]
impl Capability for ReadConversationHistory {
    fn name(&self) -> &'static str {
        "read_conversation_history"
    }

    fn description(&self) -> &'static str {
        "Reads / retrieves an old message of the conversation by its index. Only use this if you \
         don't have the information you need and you are sure we talked about this."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required(
            "index",
            ArgKind::Integer,
            "the index of the message to read / retrieve",
        )]
    }

    async fn execute(
        &self,
        ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let index = args.int("index")?;
        if index < 0 {
            return Ok("Index must be positive.".to_string());
        }
        let history = &ctx.record.history;
        let Some(message) = history.get(index as usize) else {
            return Ok(format!(
                "Index out of range. As of now, we only have {} messages in the message history.",
                history.len()
            ));
        };

        let header = format!("Message at index #{index}:\n");
        match message {
            ChatMessage::User(msg) => Ok(format!(
                "{header}User message from user `{}`: \n{}\n with additional info: {}",
                msg.author,
                msg.response,
                msg.additional_info.as_deref().unwrap_or("None")
            )),
            ChatMessage::Bot(response) => {
                let rendered = serde_json::to_string(response)
                    .map_err(|err| CapabilityError::Internal(err.to_string()))?;
                Ok(format!("{header}This was a message provided by you:\n{rendered}\n"))
            }
        }
    }
}

const AGENT_PERSONA: &str =
    "Knowledgeable Assistant that answers questions as precisely as possible.";

/// Side-query a model outside the running conversation.
pub struct AskAiAgent {
    agent: Arc<dyn ChatClient>,
}

#[async_trait]
impl Capability for AskAiAgent {
    fn name(&self) -> &'static str {
        "ask_ai_agent"
    }

    fn description(&self) -> &'static str {
        "Ask an AI agent (like ChatGPT) a question. Can be used to gather general information \
         and reasoning about a topic. The agent is smart and very useful in reasoning and \
         providing knowledge."
    }

    fn arguments(&self) -> Vec<ArgSpec> {
        vec![ArgSpec::required(
            "prompt",
            ArgKind::String,
            "the prompt / question to ask the bot",
        )]
    }

    fn needs_confirmation(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        _ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError> {
        let prompt = args.str("prompt")?;
        self.agent
            .complete(Some(AGENT_PERSONA), prompt)
            .await
            .map_err(|err| CapabilityError::Failed {
                reply: "Sorry, I can't ask a bot for an answer at the moment.".to_string(),
                detail: format!("agent side-query failed: {err}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::config::Settings;
    use parley_types::message::{BotResponse, UserMessage};
    use serde_json::{json, Map, Value};

    use crate::testutil::{memory_context, ScriptedChat, ScriptedHuman};

    fn bound(capability: &dyn Capability, pairs: &[(&str, Value)]) -> BoundArgs {
        let raw: Map<String, Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        crate::command::bind_arguments(&capability.arguments(), &raw).unwrap()
    }

    #[tokio::test]
    async fn test_answer_echoes_the_answer() {
        let (ctx, _, _) = memory_context(Settings::default());
        let args = bound(&Answer, &[("answer", json!("42"))]);
        assert_eq!(Answer.execute(&ctx, &args).await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_ask_human_relays_question_and_answer() {
        let human = ScriptedHuman::new(vec!["blue"]);
        let capability = AskHuman {
            human: human.clone(),
        };
        let (ctx, _, _) = memory_context(Settings::default());
        let args = bound(&capability, &[("question", json!("Favourite colour?"))]);

        let outcome = capability.execute(&ctx, &args).await.unwrap();
        assert_eq!(outcome, "blue");
        assert_eq!(
            human.prompts.lock().unwrap()[0],
            "Question from bot: Favourite colour?"
        );
    }

    #[tokio::test]
    async fn test_ask_human_without_response_fails_softly() {
        let capability = AskHuman {
            human: ScriptedHuman::new(vec![]),
        };
        let (ctx, _, _) = memory_context(Settings::default());
        let args = bound(&capability, &[("question", json!("Anyone there?"))]);

        let err = capability.execute(&ctx, &args).await.unwrap_err();
        match err {
            CapabilityError::Failed { reply, .. } => {
                assert_eq!(reply, "The human did not want to answer the question.")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_storage_read_absent_key_is_na() {
        let (ctx, _, _) = memory_context(Settings::default());
        let args = bound(&StorageRead, &[("key", json!("city"))]);
        assert_eq!(StorageRead.execute(&ctx, &args).await.unwrap(), "N/A");
    }

    #[tokio::test]
    async fn test_storage_write_then_read() {
        let (ctx, kv, _) = memory_context(Settings::default());
        let args = bound(
            &StorageWrite,
            &[("key", json!("city")), ("value", json!("Lisbon"))],
        );
        let outcome = StorageWrite.execute(&ctx, &args).await.unwrap();
        assert_eq!(outcome, "Added city with value Lisbon to storage.");
        assert_eq!(
            crate::gateway::KvStore::read(kv.as_ref(), "city").await.unwrap().as_deref(),
            Some("Lisbon")
        );

        let args = bound(&StorageRead, &[("key", json!("city"))]);
        assert_eq!(StorageRead.execute(&ctx, &args).await.unwrap(), "Lisbon");
    }

    #[tokio::test]
    async fn test_storage_delete_reports_missing_key() {
        let (ctx, _, _) = memory_context(Settings::default());
        let args = bound(&StorageDelete, &[("key", json!("ghost"))]);
        assert_eq!(
            StorageDelete.execute(&ctx, &args).await.unwrap(),
            "Key ghost not found."
        );
    }

    #[tokio::test]
    async fn test_storage_delete_removes_key() {
        let (ctx, _, _) = memory_context(Settings::default());
        ctx.kv.put("city", "Lisbon").await.unwrap();
        let args = bound(&StorageDelete, &[("key", json!("city"))]);
        assert_eq!(
            StorageDelete.execute(&ctx, &args).await.unwrap(),
            "city deleted."
        );
        assert!(ctx.kv.read("city").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_file_distinguishes_missing_and_empty() {
        let (ctx, _, _) = memory_context(Settings::default());
        let args = bound(&ReadFile, &[("file_name", json!("notes.txt"))]);
        assert_eq!(
            ReadFile.execute(&ctx, &args).await.unwrap(),
            "File not found."
        );

        ctx.blobs.put("notes.txt", "").await.unwrap();
        assert_eq!(ReadFile.execute(&ctx, &args).await.unwrap(), "Empty file.");

        ctx.blobs.put("notes.txt", "buy milk").await.unwrap();
        assert_eq!(ReadFile.execute(&ctx, &args).await.unwrap(), "buy milk");
    }

    #[tokio::test]
    async fn test_write_file_persists_content() {
        let (ctx, _, blobs) = memory_context(Settings::default());
        let args = bound(
            &WriteFile,
            &[
                ("file_name", json!("plan.md")),
                ("file_content", json!("# Plan")),
            ],
        );
        assert_eq!(
            WriteFile.execute(&ctx, &args).await.unwrap(),
            "File `plan.md` written."
        );
        assert_eq!(
            crate::gateway::BlobStore::read(blobs.as_ref(), "plan.md")
                .await
                .unwrap()
                .as_deref(),
            Some("# Plan")
        );
    }

    #[tokio::test]
    async fn test_list_files_outcomes() {
        let (ctx, _, _) = memory_context(Settings::default());
        let args = bound(&ListFiles, &[]);
        assert_eq!(
            ListFiles.execute(&ctx, &args).await.unwrap(),
            "No files found."
        );

        ctx.blobs.put("a.txt", "x").await.unwrap();
        ctx.blobs.put("b.txt", "y").await.unwrap();
        assert_eq!(
            ListFiles.execute(&ctx, &args).await.unwrap(),
            "Files found: a.txt, b.txt"
        );
    }

    #[tokio::test]
    async fn test_get_datetime_renders_the_clock() {
        let (ctx, _, _) = memory_context(Settings::default());
        let outcome = GetDatetime.execute(&ctx, &bound(&GetDatetime, &[])).await.unwrap();
        assert!(outcome.starts_with("The current date is: `"));
        assert!(outcome.contains(" at "));
    }

    #[tokio::test]
    async fn test_read_history_bounds() {
        let (mut ctx, _, _) = memory_context(Settings::default());
        ctx.append(ChatMessage::User(UserMessage {
            author: "sam".to_string(),
            response: "hello".to_string(),
            additional_info: None,
        }));

        let negative = bound(&ReadConversationHistory, &[("index", json!(-1))]);
        assert_eq!(
            ReadConversationHistory.execute(&ctx, &negative).await.unwrap(),
            "Index must be positive."
        );

        let beyond = bound(&ReadConversationHistory, &[("index", json!(7))]);
        assert_eq!(
            ReadConversationHistory.execute(&ctx, &beyond).await.unwrap(),
            "Index out of range. As of now, we only have 1 messages in the message history."
        );
    }

    #[tokio::test]
    async fn test_read_history_renders_both_kinds() {
        let (mut ctx, _, _) = memory_context(Settings::default());
        ctx.append(ChatMessage::User(UserMessage {
            author: "sam".to_string(),
            response: "remember the milk".to_string(),
            additional_info: Some("grocery context".to_string()),
        }));
        ctx.append(ChatMessage::Bot(BotResponse::new("get_datetime", Map::new())));

        let first = bound(&ReadConversationHistory, &[("index", json!(0))]);
        let outcome = ReadConversationHistory.execute(&ctx, &first).await.unwrap();
        assert!(outcome.contains("Message at index #0:"));
        assert!(outcome.contains("User message from user `sam`"));
        assert!(outcome.contains("grocery context"));

        let second = bound(&ReadConversationHistory, &[("index", json!(1))]);
        let outcome = ReadConversationHistory.execute(&ctx, &second).await.unwrap();
        assert!(outcome.contains("This was a message provided by you:"));
        assert!(outcome.contains("get_datetime"));
    }

    #[tokio::test]
    async fn test_ask_ai_agent_relays_completion() {
        let agent = ScriptedChat::new(vec!["Paris is the capital of France."]);
        let capability = AskAiAgent {
            agent: agent.clone(),
        };
        let (ctx, _, _) = memory_context(Settings::default());
        let args = bound(&capability, &[("prompt", json!("Capital of France?"))]);

        let outcome = capability.execute(&ctx, &args).await.unwrap();
        assert_eq!(outcome, "Paris is the capital of France.");
        assert_eq!(agent.prompts.lock().unwrap()[0], "Capital of France?");
    }

    #[tokio::test]
    async fn test_ask_ai_agent_failure_is_soft() {
        let capability = AskAiAgent {
            agent: ScriptedChat::new(vec![]),
        };
        let (ctx, _, _) = memory_context(Settings::default());
        let args = bound(&capability, &[("prompt", json!("Anything?"))]);

        let err = capability.execute(&ctx, &args).await.unwrap_err();
        match err {
            CapabilityError::Failed { reply, .. } => {
                assert_eq!(reply, "Sorry, I can't ask a bot for an answer at the moment.")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_register_builtins_catalogue_order() {
        let mut registry = CommandRegistry::new();
        register_builtins(
            &mut registry,
            ScriptedHuman::new(vec![]),
            ScriptedChat::new(vec![]),
        );
        for name in [
            "answer",
            "ask_human",
            "storage_read",
            "storage_write",
            "storage_delete",
            "read_file",
            "write_file",
            "list_files",
            "get_datetime",
            "read_conversation_history",
            "ask_ai_agent",
        ] {
            assert!(registry.get(name).is_some(), "missing builtin `{name}`");
        }
    }
}
