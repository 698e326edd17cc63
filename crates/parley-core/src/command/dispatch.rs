//! Command dispatch.
//!
//! The dispatcher turns an interpreted [`BotResponse`] into an outcome
//! text for the next turn. It is total: allow-list violations, unknown
//! commands, declined confirmations, binding failures and execution
//! failures all come back as outcome text, never as an error.

use std::sync::Arc;

use tracing::{error, warn};

use parley_types::error::CapabilityError;
use parley_types::message::BotResponse;

use crate::command::{bind_arguments, CommandRegistry};
use crate::context::ConversationContext;
use crate::gateway::HumanIo;

/// Outcome for a command that is unknown or not on the allow-list.
///
/// The same text in both cases: the model gets no signal about which
/// commands exist but are withheld.
pub const INVALID_COMMAND: &str = "Invalid command.";

/// Outcome when the human declines a confirmation.
pub const FORBIDDEN_BY_USER: &str = "Command execution forbidden by user.";

const CONFIRM_PROMPT: &str = "Do you want to execute this command?";

/// Executes interpreted responses against the command registry.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    human: Arc<dyn HumanIo>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, human: Arc<dyn HumanIo>) -> Self {
        Self { registry, human }
    }

    /// Execute one interpreted response and return the outcome text.
    pub async fn dispatch(&self, ctx: &ConversationContext, response: &BotResponse) -> String {
        let command = response.command.as_str();

        if !ctx.settings.is_allowed(command) {
            warn!(command, "model tried to execute a disallowed command");
            return INVALID_COMMAND.to_string();
        }

        let Some(capability) = self.registry.get(command) else {
            warn!(command, "model tried to execute an unknown command");
            return INVALID_COMMAND.to_string();
        };

        if capability.needs_confirmation() && !self.confirm(command).await {
            return FORBIDDEN_BY_USER.to_string();
        }

        let args = match bind_arguments(&capability.arguments(), &response.arguments) {
            Ok(args) => args,
            Err(err) => {
                warn!(command, error = %err, "argument binding failed");
                return format!("Error while executing command: {err}");
            }
        };

        match capability.execute(ctx, &args).await {
            Ok(outcome) => outcome,
            Err(CapabilityError::Failed { reply, detail }) => {
                error!(command, detail, "command execution failed");
                reply
            }
            Err(CapabilityError::Internal(detail)) => {
                error!(command, detail, "command execution failed unexpectedly");
                format!("Unknown error executing `{command}`.")
            }
        }
    }

    /// Ask the human to approve the invocation. Anything other than an
    /// explicit "yes" counts as declined, including I/O failure.
    async fn confirm(&self, command: &str) -> bool {
        match self
            .human
            .ask_choice(CONFIRM_PROMPT, &["yes", "no"], "no")
            .await
        {
            Ok(answer) => answer == "yes",
            Err(err) => {
                warn!(command, error = %err, "confirmation unavailable, treating as declined");
                false
            }
        }
    }
}
