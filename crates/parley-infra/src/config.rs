//! Configuration loading.
//!
//! Settings come from `{data_dir}/config.toml` and fall back to defaults
//! when the file is missing or malformed; a broken config file must never
//! keep the assistant from starting. API keys are deliberately not part
//! of the file, they are read from the environment.

use std::path::{Path, PathBuf};

use parley_types::config::Settings;

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable holding the NewsAPI key.
pub const NEWSAPI_KEY_VAR: &str = "NEWSAPI_KEY";

/// The default data directory, `~/.parley`.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parley")
}

/// Load settings from `{data_dir}/config.toml`.
///
/// A missing file yields [`Settings::default()`]; a malformed file is
/// logged and also yields the defaults.
pub async fn load_settings(data_dir: &Path) -> Settings {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, using defaults", config_path.display());
            return Settings::default();
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}, using defaults", config_path.display());
            return Settings::default();
        }
    };

    match toml::from_str::<Settings>(&content) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(
                "failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            Settings::default()
        }
    }
}

/// API credentials pulled from the environment.
///
/// Both keys are optional at load time; whoever needs one decides whether
/// its absence is fatal (the chat client) or a soft failure (news).
#[derive(Clone)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub newsapi: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self {
            openai: non_empty(std::env::var(OPENAI_API_KEY_VAR).ok()),
            newsapi: non_empty(std::env::var(NEWSAPI_KEY_VAR).ok()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_config_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.max_repair_attempts, 3);
    }

    #[tokio::test]
    async fn test_partial_config_file_is_merged_with_defaults() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
model = "gpt-4o"
bot_name = "parley"
"#,
        )
        .await
        .unwrap();

        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.bot_name, "parley");
        assert_eq!(settings.max_history_tokens, 1_500);
    }

    #[tokio::test]
    async fn test_malformed_config_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "model = [not toml")
            .await
            .unwrap();

        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.model, "gpt-4o-mini");
    }

    #[test]
    fn test_blank_keys_are_treated_as_absent() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("sk-x".to_string())), Some("sk-x".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
