//! Prompt assembly for the conversation engine.
//!
//! Every model turn is a single rendered prompt: instructions, the command
//! catalogue, the storage keys, a token-bounded window of recent history,
//! the latest user message, and a reminder of the plan the model committed
//! to. The history window grows backwards from the most recent entry until
//! the token budget is hit, then is emitted in chronological order.

use chrono::Local;
use serde_json::to_string as to_json;

use parley_types::config::Settings;
use parley_types::conversation::ConversationRecord;
use parley_types::message::ChatMessage;

/// The response shape the model is asked to reproduce verbatim.
pub const RESPONSE_TEMPLATE: &str = r#"{"command": "the_command", "arguments": {"the":"parameters", ... }, "plan": "the effect you want to achieve with your current execution steps", "steps": ["details", "of", "steps", "you", "want", "to", "do"]}"#;

const QUERY_TEMPLATE: &str = "\
- The date and time when sending this message is: {curr_date}.
- You are in a room with the following human(s): {human_names}.
- You will be supplied with a part of the recent conversation history (as working memory) and the current prompt.
- As you don't have too much working memory you are encouraged to save important information in your long term memory using the commands given to you.
- You can only execute one command at a time, so you will have to plan your next steps carefully and remember them.
- If you can, try to answer questions on your own.
- Avoid executing the same command twice in a row.

Your general task is to help the human(s).

You can execute the following commands as desired. Every answer of yours has to be a JSON object invoking exactly one of those functions:
----BEGIN COMMANDS----
{commands}
----END COMMANDS----
The result of invoking a functionality will be given back to you.

Also, you have access to the following storage keys: {memory_keys}

We have the following conversation history (with #{n_history} entries total).
You should incorporate the following information for your answer if useful:
----BEGIN Conversation History----
{history}
----END Conversation History----

The result of the last command of yours was:
{current_prompt}
Additional Information provided (if any):
{additional_info}

To remind you:
Your plan was: `{plan}`!
Your next planned steps were:
{next_steps}!
---- Your Instructions ----
Always plan your next steps carefully step by step and execute them one by one. Add the remaining steps you would have to do to achieve the plan to your response in the template given below. Don't put the next steps into an answer directly but put it in the json structure in the key `steps`.

*ALWAYS* respond with a JSON object in the following exact format (given as template):
----BEGIN TEMPLATE---
{base_command}
----END TEMPLATE---
";

/// Estimate the token count of a text.
///
/// A flat characters-over-four approximation. Close enough for bounding
/// the history window; exactness does not matter here.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4 + 1
}

/// Render the full prompt for the next model turn.
///
/// `commands_block` is the pre-rendered command catalogue (one entry per
/// allowed command) and `storage_keys` the keys currently present in the
/// conversation's key-value store.
pub fn build_prompt(
    record: &ConversationRecord,
    storage_keys: &[String],
    commands_block: &str,
    settings: &Settings,
) -> String {
    let history = &record.history;

    let memory_keys = if storage_keys.is_empty() {
        "None".to_string()
    } else {
        storage_keys.join(", ")
    };

    // Latest entry is the current prompt (the human's message or a command
    // result); everything before it is candidate working memory.
    let (current_prompt, additional_info) = match history.last() {
        Some(ChatMessage::User(msg)) => (
            format!("User ({}): {}", msg.author, msg.response),
            msg.additional_info.clone().unwrap_or_else(|| "None".to_string()),
        ),
        _ => ("None".to_string(), "None".to_string()),
    };

    // The model's previous response carries the plan being reminded about.
    let (plan, next_steps) = match history.len().checked_sub(2).and_then(|i| history.get(i)) {
        Some(ChatMessage::Bot(response)) => {
            let plan = response
                .plan
                .clone()
                .unwrap_or_else(|| "None".to_string());
            let steps = if response.steps.len() > 1 {
                response.steps[1..].join("\n-")
            } else {
                "None".to_string()
            };
            (plan, steps)
        }
        _ => (
            "Initiate a conversation".to_string(),
            "Greet the human".to_string(),
        ),
    };

    QUERY_TEMPLATE
        .replace(
            "{curr_date}",
            &Local::now().format("%d/%m/%Y at %H:%M:%S").to_string(),
        )
        .replace("{human_names}", &record.participants.join(", "))
        .replace("{commands}", commands_block)
        .replace("{memory_keys}", &memory_keys)
        .replace("{n_history}", &history.len().to_string())
        .replace(
            "{history}",
            &history_window(record, settings.max_history_tokens as usize),
        )
        .replace("{current_prompt}", &current_prompt)
        .replace("{additional_info}", &additional_info)
        .replace("{plan}", &plan)
        .replace("{next_steps}", &next_steps)
        .replace("{base_command}", RESPONSE_TEMPLATE)
}

/// Render the bounded history window.
///
/// Walks backwards from the second-to-last entry, keeping entries while the
/// rendered block stays within `max_tokens`, then emits the kept entries in
/// chronological order. The latest entry is excluded because it appears
/// separately as the current prompt.
fn history_window(record: &ConversationRecord, max_tokens: usize) -> String {
    let history = &record.history;
    if history.len() < 2 {
        return String::new();
    }

    let mut kept: Vec<String> = Vec::new();
    for (index, message) in history[..history.len() - 1].iter().enumerate().rev() {
        let body = match message {
            ChatMessage::User(msg) => msg.response.clone(),
            // Serialization of a response never fails; fall back to the
            // command name alone if it somehow does.
            ChatMessage::Bot(response) => {
                to_json(response).unwrap_or_else(|_| response.command.clone())
            }
        };
        let author = message.author(&record.bot_name).to_string();
        kept.push(render_entry(index + 1, &author, &body));

        let block = render_window(&kept);
        if estimate_tokens(&block) > max_tokens {
            kept.pop();
            break;
        }
    }

    kept.reverse();
    render_window(&kept)
}

fn render_window(entries: &[String]) -> String {
    entries.join("\n")
}

fn render_entry(index: usize, author: &str, body: &str) -> String {
    format!(
        "----BEGIN History Entry #{index}----\n{author}: {body}\n----END History Entry #{index}----"
    )
}
