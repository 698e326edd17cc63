//! Persisted conversation document for Parley.
//!
//! One [`ConversationRecord`] per conversation id. Live handles (stores,
//! settings) are never persisted; they are re-attached when the record is
//! loaded back into a conversation context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::ChatMessage;

/// The persisted state of a single conversation.
///
/// The message history is append-only within a session and its insertion
/// order is the chronological order. Whose turn it is follows from the
/// shape of the last entry; no turn field is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Stable identifier, chosen by the user or generated.
    pub id: String,
    /// Display name of the bot.
    pub bot_name: String,
    /// Names of the human participants, in join order.
    pub participants: Vec<String>,
    /// The participant currently driving the user turns.
    pub active_participant: String,
    /// Ordered message history.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl ConversationRecord {
    /// Create a fresh record with an empty history.
    pub fn new(id: impl Into<String>, bot_name: impl Into<String>, participant: impl Into<String>) -> Self {
        let participant = participant.into();
        Self {
            id: id.into(),
            bot_name: bot_name.into(),
            participants: vec![participant.clone()],
            active_participant: participant,
            history: Vec::new(),
        }
    }

    /// Generate a conversation id when the user did not supply one.
    pub fn generate_id() -> String {
        Uuid::now_v7().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{BotResponse, UserMessage};
    use serde_json::Map;

    #[test]
    fn test_new_record_has_empty_history() {
        let record = ConversationRecord::new("trip-planning", "assistant", "ada");
        assert_eq!(record.id, "trip-planning");
        assert_eq!(record.participants, vec!["ada".to_string()]);
        assert_eq!(record.active_participant, "ada");
        assert!(record.history.is_empty());
    }

    #[test]
    fn test_record_roundtrip_preserves_history_order() {
        let mut record = ConversationRecord::new("trip-planning", "assistant", "ada");
        record.history.push(ChatMessage::Bot(BotResponse::new(
            "get_datetime",
            Map::new(),
        )));
        record.history.push(ChatMessage::User(UserMessage {
            author: "ada".to_string(),
            response: "The current date is: `10/01/2026 at 09:30:00`".to_string(),
            additional_info: None,
        }));
        record.history.push(ChatMessage::Bot(BotResponse::new(
            "answer",
            Map::new(),
        )));

        let json_str = serde_json::to_string_pretty(&record).unwrap();
        let parsed: ConversationRecord = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed, record);
        assert!(matches!(parsed.history[0], ChatMessage::Bot(_)));
        assert!(matches!(parsed.history[1], ChatMessage::User(_)));
        assert!(matches!(parsed.history[2], ChatMessage::Bot(_)));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ConversationRecord::generate_id(), ConversationRecord::generate_id());
    }
}
