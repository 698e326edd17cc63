//! Conversation message types for Parley.
//!
//! A conversation history is an ordered sequence of [`ChatMessage`] entries.
//! The two message kinds are distinguished by shape in the persisted JSON
//! (a bot entry carries `command`, a user entry carries `author` and
//! `response`), so the enum serializes untagged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Command name a bot uses to deliver a final answer to the human.
///
/// The engine skips dispatch for this command and asks the human for a
/// direct reply instead.
pub const ANSWER_COMMAND: &str = "answer";

/// Reserved command name signaling that the model output could not be
/// interpreted even after repair. Carries a diagnostic in its `message`
/// argument for both the human and the model to see.
pub const RESPONSE_ERROR_COMMAND: &str = "response_error";

/// A message authored by a human participant.
///
/// Immutable once created and appended to the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    /// Name of the participant who authored the message.
    pub author: String,
    /// The response text (a command outcome or a direct reply).
    pub response: String,
    /// Optional free-text context the human attached to the turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

/// A structured response produced by the model (possibly after repair).
///
/// Immutable once created and appended to the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotResponse {
    /// The command the bot wants to invoke. Never empty.
    pub command: String,
    /// Arguments for the command, keyed by argument name. May be empty.
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// The bot's stated plan, if it provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Planned next steps, in order. May be empty.
    #[serde(default)]
    pub steps: Vec<String>,
    /// When this response was created.
    pub created_at: DateTime<Utc>,
}

impl BotResponse {
    /// Create a response with the given command and arguments, no plan and
    /// no steps, timestamped now.
    pub fn new(command: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            command: command.into(),
            arguments,
            plan: None,
            steps: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// One entry in a conversation history.
///
/// Untagged: the persisted document distinguishes the variants by shape,
/// not by a discriminator field. Bot entries are tried first because they
/// carry the required `command` field that user entries never have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatMessage {
    Bot(BotResponse),
    User(UserMessage),
}

impl ChatMessage {
    /// The display name to attribute this entry to when rendering history.
    pub fn author<'a>(&'a self, bot_name: &'a str) -> &'a str {
        match self {
            ChatMessage::Bot(_) => bot_name,
            ChatMessage::User(msg) => &msg.author,
        }
    }
}
