//! Response interpreter: coerces raw model output into a [`BotResponse`].
//!
//! The model is asked to answer with a single JSON object, but in practice
//! the text that comes back is often decorated, truncated, double-encoded,
//! or plain prose. The interpreter first tries a strict decode, then walks
//! a bounded repair loop of local heuristics and (as a last resort) a
//! model-assisted repair request. It never fails outward: when every
//! attempt is exhausted it returns the reserved error response carrying a
//! diagnostic with the last text seen.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, warn};

use parley_types::message::{BotResponse, ANSWER_COMMAND, RESPONSE_ERROR_COMMAND};

use crate::gateway::ChatClient;

/// Instruction sent along with a broken payload for model-assisted repair.
const REPAIR_INSTRUCTION: &str = "The following snippet is a broken JSON document:\n\
{broken}\n\n\
Please repair it into valid JSON.\n\
Importantly: do *only* answer with a valid JSON structure. \
No other messages and no textual explanations allowed!";

/// Parses and repairs raw model output.
pub struct Interpreter {
    repair_client: Arc<dyn ChatClient>,
    max_attempts: u32,
}

impl Interpreter {
    /// Create an interpreter with the given repair channel and attempt
    /// ceiling for the repair loop.
    pub fn new(repair_client: Arc<dyn ChatClient>, max_attempts: u32) -> Self {
        Self {
            repair_client,
            max_attempts,
        }
    }

    /// Interpret raw model output as a structured response.
    ///
    /// Always returns a response. On unrecoverable failure the result has
    /// command [`RESPONSE_ERROR_COMMAND`] and a `message` argument
    /// embedding the last raw text seen.
    pub async fn interpret(&self, raw: &str) -> BotResponse {
        let original = raw.trim().to_string();
        let mut candidate = original.clone();
        let mut attempts: u32 = 0;

        loop {
            if let Some(response) = decode_candidate(&candidate) {
                if attempts > 0 {
                    info!(attempts, "repaired model response into valid structure");
                }
                return response;
            }

            // No brace pair at all: the model most likely answered in prose
            // without wrapping it in a command. Treat the whole text as its
            // final answer.
            let Some((slice, dangling)) = bracket_slice(&candidate) else {
                info!("model output contains no command structure, interpreting it as a direct answer");
                return answer_response(&candidate);
            };

            match serde_json::from_str::<Value>(slice) {
                Ok(value) => {
                    let value = first_if_array(value);
                    let has_command = value
                        .get("command")
                        .and_then(Value::as_str)
                        .is_some_and(|c| !c.is_empty());

                    if has_command {
                        if let Some(response) = decode_value(value) {
                            if !dangling.trim().is_empty() {
                                warn!(dangling = %dangling.trim(), "discarding text outside the command object");
                            }
                            return response;
                        }
                    } else if dangling.trim().len() > 1 {
                        // The payload decodes but carries no usable command,
                        // and there is real text around it. Wrap the original
                        // text as an answer (the full raw response, not just
                        // the dangling portion).
                        warn!("decoded payload has no usable command, wrapping the raw text as an answer");
                        return answer_response(&original);
                    }
                }
                Err(_) => {
                    // Double-encoded payloads show up as escaped quotes
                    // inside the slice. Unescape once and retry.
                    if slice.contains("\\\"") {
                        let unescaped = slice.replace("\\\"", "\"");
                        if let Some(response) = decode_candidate(&unescaped) {
                            info!("repaired double-encoded response");
                            return response;
                        }
                    }
                }
            }

            // Local heuristics are exhausted: ask the model to repair its
            // own output. One request per loop iteration, bounded overall.
            if attempts >= self.max_attempts {
                warn!(attempts, "repair attempt ceiling reached, giving up");
                return error_response(&candidate);
            }
            attempts += 1;

            match self.request_repair(&candidate).await {
                Ok(repaired) => {
                    info!(attempt = attempts, "received model-assisted repair candidate");
                    candidate = repaired.trim().to_string();
                }
                Err(err) => {
                    warn!(error = %err, "model-assisted repair request failed");
                    return error_response(&candidate);
                }
            }
        }
    }

    /// Issue a single model-assisted repair request.
    async fn request_repair(&self, broken: &str) -> Result<String, parley_types::error::LlmError> {
        let prompt = REPAIR_INSTRUCTION.replace("{broken}", broken);
        self.repair_client.complete(None, &prompt).await
    }
}

/// Strict decode of a full candidate text into a response.
///
/// Accepts a JSON object with a non-empty `command` field; `arguments` may
/// be aliased as `args`; `plan` is optional; `steps` defaults to empty and
/// accepts either a list of strings or a single string. An array payload
/// yields its first element (the model tried to queue several commands).
fn decode_candidate(text: &str) -> Option<BotResponse> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    let value = first_if_array(value);
    if !value
        .get("command")
        .and_then(Value::as_str)
        .is_some_and(|c| !c.is_empty())
    {
        return None;
    }
    decode_value(value)
}

/// Build a response from an already-parsed JSON object.
fn decode_value(value: Value) -> Option<BotResponse> {
    let object = value.as_object()?;
    let command = object.get("command")?.as_str()?.to_string();
    if command.is_empty() {
        return None;
    }

    let arguments = match object.get("arguments").or_else(|| object.get("args")) {
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return None,
        None => Map::new(),
    };

    let plan = object
        .get("plan")
        .and_then(Value::as_str)
        .map(str::to_string);

    let steps = match object.get("steps") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    };

    Some(BotResponse {
        command,
        arguments,
        plan,
        steps,
        created_at: Utc::now(),
    })
}

/// Take the first element of an array payload, warning about the rest.
fn first_if_array(value: Value) -> Value {
    match value {
        Value::Array(mut items) if !items.is_empty() => {
            warn!("model returned a list of commands, taking only the first element");
            items.swap_remove(0)
        }
        other => other,
    }
}

/// Locate the substring from the first `{` to the last `}`.
///
/// Returns the slice plus the concatenated text before and after it.
/// This is a heuristic outer-bracket match, not balanced-bracket parsing:
/// brace characters inside string values can make it mis-extract. That is
/// a known, accepted limitation of the repair path.
fn bracket_slice(text: &str) -> Option<(&str, String)> {
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if last < first {
        return None;
    }
    let slice = &text[first..=last];
    let before = text[..first].trim();
    let after = text[last + 1..].trim();
    let dangling = if before.is_empty() || after.is_empty() {
        format!("{before}{after}")
    } else {
        format!("{before}.{after}")
    };
    Some((slice, dangling))
}

/// Wrap free text as a final answer.
fn answer_response(text: &str) -> BotResponse {
    let mut arguments = Map::new();
    arguments.insert("answer".to_string(), Value::String(text.to_string()));
    BotResponse {
        command: ANSWER_COMMAND.to_string(),
        arguments,
        plan: Some("Recover the plan".to_string()),
        steps: vec![
            "Repair the current prompt".to_string(),
            "Continue conversation where we left off".to_string(),
        ],
        created_at: Utc::now(),
    }
}

/// The reserved error response returned when repair is exhausted.
fn error_response(last_raw: &str) -> BotResponse {
    let mut arguments = Map::new();
    arguments.insert(
        "message".to_string(),
        Value::String(format!(
            "You returned an invalid response: `{last_raw}`, which I could not fix! \
             *Always* respond in the described format!"
        )),
    );
    BotResponse {
        command: RESPONSE_ERROR_COMMAND.to_string(),
        arguments,
        plan: Some("try to recover the conversation".to_string()),
        steps: vec![
            "Fix message".to_string(),
            "Continue conversation where we left off".to_string(),
        ],
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedChat;

    fn interpreter_with(client: Arc<ScriptedChat>) -> (Interpreter, Arc<ScriptedChat>) {
        (Interpreter::new(client.clone(), 3), client)
    }

    #[tokio::test]
    async fn test_valid_json_round_trips() {
        let (interpreter, client) = interpreter_with(ScriptedChat::new(vec![]));
        let raw = r#"{"command":"storage_write","arguments":{"key":"city","value":"Lisbon"},"plan":"remember the city","steps":["confirm"]}"#;
        let response = interpreter.interpret(raw).await;
        assert_eq!(response.command, "storage_write");
        assert_eq!(response.arguments["key"], "city");
        assert_eq!(response.arguments["value"], "Lisbon");
        assert_eq!(response.plan.as_deref(), Some("remember the city"));
        assert_eq!(response.steps, vec!["confirm".to_string()]);
        // No repair channel traffic for a clean decode
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_args_alias_is_accepted() {
        let (interpreter, _) = interpreter_with(ScriptedChat::new(vec![]));
        let response = interpreter
            .interpret(r#"{"command":"storage_read","args":{"key":"city"}}"#)
            .await;
        assert_eq!(response.command, "storage_read");
        assert_eq!(response.arguments["key"], "city");
    }

    #[tokio::test]
    async fn test_steps_accept_a_single_string() {
        let (interpreter, _) = interpreter_with(ScriptedChat::new(vec![]));
        let response = interpreter
            .interpret(r#"{"command":"answer","arguments":{"answer":"42"},"steps":"done"}"#)
            .await;
        assert_eq!(response.steps, vec!["done".to_string()]);
    }

    #[tokio::test]
    async fn test_array_payload_takes_first_element() {
        let (interpreter, _) = interpreter_with(ScriptedChat::new(vec![]));
        let raw = r#"[{"command":"get_datetime"},{"command":"answer","arguments":{"answer":"x"}}]"#;
        let response = interpreter.interpret(raw).await;
        assert_eq!(response.command, "get_datetime");
    }

    #[tokio::test]
    async fn test_prose_without_braces_becomes_an_answer() {
        let (interpreter, client) = interpreter_with(ScriptedChat::new(vec![]));
        let response = interpreter.interpret("Hello, the answer is 42.").await;
        assert_eq!(response.command, ANSWER_COMMAND);
        assert_eq!(response.arguments["answer"], "Hello, the answer is 42.");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_decorated_json_is_sliced_out() {
        let (interpreter, client) = interpreter_with(ScriptedChat::new(vec![]));
        let raw = r#"Sure! {"command":"answer","arguments":{"answer":"42"}} Thanks!"#;
        let response = interpreter.interpret(raw).await;
        assert_eq!(response.command, "answer");
        assert_eq!(response.arguments["answer"], "42");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_command_without_dangling_text_exhausts_repair() {
        // The repair channel keeps echoing the same broken payload, so the
        // loop must stop at the configured ceiling and return the reserved
        // error response instead of raising or recursing forever.
        let broken = r#"{"command":"","plan":"x"}"#;
        let (interpreter, client) = interpreter_with(ScriptedChat::echo(broken));
        let response = interpreter.interpret(broken).await;
        assert_eq!(response.command, RESPONSE_ERROR_COMMAND);
        let message = response.arguments["message"].as_str().unwrap();
        assert!(message.contains(broken));
        // Exactly max_attempts repair requests were issued
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_command_with_dangling_text_wraps_the_raw_text() {
        let (interpreter, client) = interpreter_with(ScriptedChat::new(vec![]));
        let raw = r#"I think we should talk. {"command":"","plan":"x"}"#;
        let response = interpreter.interpret(raw).await;
        assert_eq!(response.command, ANSWER_COMMAND);
        // The full raw text is wrapped, not just the dangling portion
        assert_eq!(response.arguments["answer"], raw);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_double_encoded_payload_is_unescaped() {
        let (interpreter, client) = interpreter_with(ScriptedChat::new(vec![]));
        let raw = r#"{\"command\":\"answer\",\"arguments\":{\"answer\":\"42\"}}"#;
        let response = interpreter.interpret(raw).await;
        assert_eq!(response.command, "answer");
        assert_eq!(response.arguments["answer"], "42");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_assisted_repair_is_accepted() {
        let (interpreter, client) = interpreter_with(ScriptedChat::new(vec![
            r#"{"command":"answer","arguments":{"answer":"fixed"}}"#,
        ]));
        // Broken beyond local heuristics: braces present, not decodable,
        // no escaped quotes.
        let response = interpreter.interpret(r#"{command: answer}"#).await;
        assert_eq!(response.command, "answer");
        assert_eq!(response.arguments["answer"], "fixed");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_repair_channel_yields_error_response() {
        let (interpreter, client) = interpreter_with(ScriptedChat::new(vec![]));
        let response = interpreter.interpret(r#"{command: answer}"#).await;
        assert_eq!(response.command, RESPONSE_ERROR_COMMAND);
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn test_bracket_slice_is_a_documented_heuristic() {
        // Braces inside string values defeat the outer-bracket match; the
        // slice runs from the first `{` to the last `}` regardless.
        let text = r#"note {"command":"answer","arguments":{"answer":"a } b"}} tail"#;
        let (slice, dangling) = bracket_slice(text).unwrap();
        assert!(slice.starts_with('{'));
        assert!(slice.ends_with('}'));
        assert_eq!(dangling, "note.tail");
    }

    #[test]
    fn test_bracket_slice_requires_a_pair() {
        assert!(bracket_slice("no braces at all").is_none());
        assert!(bracket_slice("only } reversed {").is_none());
        assert!(bracket_slice("only { open").is_none());
    }
}
