//! Spinner decoration around the model client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

use parley_core::gateway::ChatClient;
use parley_types::error::LlmError;

/// [`ChatClient`] decorator that shows a spinner while a completion is
/// in flight. Purely cosmetic; every call is forwarded unchanged.
pub struct SpinnerChat {
    inner: Arc<dyn ChatClient>,
}

impl SpinnerChat {
    pub fn new(inner: Arc<dyn ChatClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ChatClient for SpinnerChat {
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String, LlmError> {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(80));

        let result = self.inner.complete(system, user).await;
        spinner.finish_and_clear();
        result
    }
}
