//! Terminal implementation of the human I/O gateway.
//!
//! All interaction goes through dialoguer prompts and the console crate.
//! dialoguer is blocking, so every prompt runs on the blocking pool.

use async_trait::async_trait;
use console::style;

use parley_core::gateway::HumanIo;
use parley_types::error::HumanIoError;

/// [`HumanIo`] backed by the terminal.
pub struct ConsoleIo {
    term: console::Term,
}

impl ConsoleIo {
    pub fn new() -> Self {
        Self {
            term: console::Term::stdout(),
        }
    }
}

impl Default for ConsoleIo {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one dialoguer prompt on the blocking pool.
async fn prompt_line(prompt: String) -> Result<String, HumanIoError> {
    tokio::task::spawn_blocking(move || {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
    })
    .await
    .map_err(|err| HumanIoError::Unavailable(format!("prompt task failed: {err}")))?
    .map_err(|err| HumanIoError::Unavailable(format!("terminal prompt failed: {err}")))
}

#[async_trait]
impl HumanIo for ConsoleIo {
    async fn ask(&self, prompt: &str) -> Result<String, HumanIoError> {
        let answer = prompt_line(prompt.trim_end().to_string()).await?;
        if answer.trim().is_empty() {
            return Err(HumanIoError::NoResponse);
        }
        Ok(answer)
    }

    async fn ask_choice(
        &self,
        prompt: &str,
        options: &[&str],
        default: &str,
    ) -> Result<String, HumanIoError> {
        let rendered = format!("{prompt} ({})", options.join("/"));
        loop {
            let answer = prompt_line(rendered.clone()).await?;
            let answer = answer.trim().to_lowercase();
            if answer.is_empty() {
                return Ok(default.to_string());
            }
            if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(&answer)) {
                return Ok(option.to_string());
            }
            let _ = self
                .term
                .write_line(&format!("Please answer one of: {}", options.join(", ")));
        }
    }

    async fn tell(&self, message: &str) {
        if self.term.write_line(message).is_err() {
            // Terminal is gone; tracing is the only channel left
            tracing::info!(message, "console write failed");
        }
    }
}

/// Print an error the way the rest of the CLI styles output.
pub fn print_error(message: &str) {
    eprintln!("  {} {message}", style("!").red().bold());
}
