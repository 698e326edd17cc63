//! Configuration types for Parley.
//!
//! [`Settings`] represents the `config.toml` under the data directory.
//! Every field has a default so a missing or partial file still yields a
//! usable configuration.

use serde::{Deserialize, Serialize};

/// Application settings for a Parley process.
///
/// Loaded from `{data_dir}/config.toml`. API keys are not part of the
/// settings file; they come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Model identifier used for completions and for model-assisted repair.
    #[serde(default = "default_model")]
    pub model: String,

    /// Display name of the bot in prompts and transcripts.
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Commands the model is allowed to invoke in this installation.
    /// Commands outside this list are treated as unknown by the dispatcher.
    #[serde(default = "default_allowed_commands")]
    pub allowed_commands: Vec<String>,

    /// Ceiling for the interpreter's repair loop. Once this many repair
    /// attempts have been consumed the interpreter gives up and returns
    /// the reserved error response.
    #[serde(default = "default_max_repair_attempts")]
    pub max_repair_attempts: u32,

    /// Token budget for the trailing conversation history included in a
    /// prompt. History entries beyond the budget are dropped oldest-first.
    #[serde(default = "default_max_history_tokens")]
    pub max_history_tokens: u32,

    /// Number of results a web search should aim to return.
    #[serde(default = "default_search_results")]
    pub search_results: u32,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_bot_name() -> String {
    "assistant".to_string()
}

fn default_allowed_commands() -> Vec<String> {
    [
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
        "search_web",
        "read_website",
        "news_api",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_max_repair_attempts() -> u32 {
    3
}

fn default_max_history_tokens() -> u32 {
    1_500
}

fn default_search_results() -> u32 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: default_model(),
            bot_name: default_bot_name(),
            allowed_commands: default_allowed_commands(),
            max_repair_attempts: default_max_repair_attempts(),
            max_history_tokens: default_max_history_tokens(),
            search_results: default_search_results(),
        }
    }
}

impl Settings {
    /// Whether the allow-list permits the given command.
    pub fn is_allowed(&self, command: &str) -> bool {
        self.allowed_commands.iter().any(|c| c == command)
    }
}
