//! The turn-taking conversation engine.
//!
//! A conversation alternates strictly between a bot turn (render the
//! prompt, call the model, interpret the reply) and a user turn (show the
//! interpreted response, execute its command, collect the human's input).
//! Whose turn it is follows from the shape of the last history entry, so
//! a reloaded conversation resumes exactly where it stopped. The record
//! is persisted after every appended message.

use std::sync::Arc;

use tracing::{debug, error, warn};

use parley_types::config::Settings;
use parley_types::conversation::ConversationRecord;
use parley_types::message::{
    BotResponse, ChatMessage, UserMessage, ANSWER_COMMAND, RESPONSE_ERROR_COMMAND,
};

use crate::command::dispatch::Dispatcher;
use crate::command::CommandRegistry;
use crate::context::ConversationContext;
use crate::gateway::{ChatClient, ConversationStore, HumanIo};
use crate::interpreter::Interpreter;
use crate::prompt;

/// Whose move the next transition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Query the model next.
    Bot,
    /// Execute the model's last command and collect human input next.
    User,
}

impl Turn {
    /// Derive the turn from the history: a trailing bot entry means the
    /// human side moves, anything else (including an empty history) means
    /// the model moves.
    pub fn of(record: &ConversationRecord) -> Turn {
        match record.history.last() {
            Some(ChatMessage::Bot(_)) => Turn::User,
            _ => Turn::Bot,
        }
    }
}

/// Whether the loop keeps going after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Drives one conversation to completion.
pub struct Engine {
    chat: Arc<dyn ChatClient>,
    human: Arc<dyn HumanIo>,
    store: Arc<dyn ConversationStore>,
    registry: Arc<CommandRegistry>,
    dispatcher: Dispatcher,
    interpreter: Interpreter,
}

impl Engine {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        human: Arc<dyn HumanIo>,
        store: Arc<dyn ConversationStore>,
        registry: Arc<CommandRegistry>,
        settings: &Settings,
    ) -> Self {
        let interpreter = Interpreter::new(chat.clone(), settings.max_repair_attempts);
        let dispatcher = Dispatcher::new(registry.clone(), human.clone());
        Self {
            chat,
            human,
            store,
            registry,
            dispatcher,
            interpreter,
        }
    }

    /// Run transitions until the human quits.
    pub async fn run(&self, ctx: &mut ConversationContext) {
        self.human
            .tell(&format!(
                "Hello {}! Conversation {} started!",
                ctx.record.participants.join(" and "),
                ctx.id()
            ))
            .await;
        if !ctx.record.history.is_empty() {
            self.human
                .tell(&format!(
                    "This conversation already has {} messages",
                    ctx.record.history.len()
                ))
                .await;
        }

        loop {
            if self.step(ctx).await == Flow::Quit {
                return;
            }
        }
    }

    /// Execute exactly one transition.
    pub async fn step(&self, ctx: &mut ConversationContext) -> Flow {
        match Turn::of(&ctx.record) {
            Turn::Bot => self.bot_turn(ctx).await,
            Turn::User => self.user_turn(ctx).await,
        }
    }

    async fn bot_turn(&self, ctx: &mut ConversationContext) -> Flow {
        if ctx.record.history.is_empty() {
            self.human.tell("I will start a new conversation.").await;
        }

        // An unreadable key index degrades the prompt, nothing more.
        let keys = match ctx.kv.list().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "could not list storage keys for the prompt");
                Vec::new()
            }
        };
        let catalogue = self.registry.catalogue(&ctx.settings);
        let query = prompt::build_prompt(&ctx.record, &keys, &catalogue, &ctx.settings);
        self.human
            .tell(&format!(
                "Transmitting query with {} tokens",
                prompt::estimate_tokens(&query)
            ))
            .await;

        let raw = match self.chat.complete(None, &query).await {
            Ok(raw) => raw,
            Err(err) => {
                error!(error = %err, "model request failed");
                self.human
                    .tell("Error while talking to AI. Please try again.")
                    .await;
                return match self.human.ask_choice("Try again?", &["yes", "no"], "no").await {
                    Ok(answer) if answer == "yes" => Flow::Continue,
                    _ => Flow::Quit,
                };
            }
        };

        self.human
            .tell(&format!(
                "Received a response with {} tokens",
                prompt::estimate_tokens(&raw)
            ))
            .await;

        let response = self.interpreter.interpret(&raw).await;
        ctx.append(ChatMessage::Bot(response));
        self.persist(ctx).await;
        Flow::Continue
    }

    async fn user_turn(&self, ctx: &mut ConversationContext) -> Flow {
        // Turn derivation guarantees the last entry is a bot response.
        let Some(ChatMessage::Bot(response)) = ctx.record.history.last().cloned() else {
            return Flow::Continue;
        };

        self.present(&response).await;

        let (message, additional_info) = if response.command == RESPONSE_ERROR_COMMAND {
            self.human
                .tell(
                    "Error while talking to AI. You might want to remind it to respond in the \
                     proper format or ask it to repair the last response. Please try again.",
                )
                .await;
            match self.human.ask("Feedback to AI: ").await {
                Ok(feedback) => (feedback, None),
                Err(err) => {
                    warn!(error = %err, "no feedback from human, ending the session");
                    return Flow::Quit;
                }
            }
        } else if response.command == ANSWER_COMMAND {
            // Final answers are not fed back; the human takes the floor.
            let answer = response
                .arguments
                .get("answer")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            self.human
                .tell(&format!("Command response: {answer}."))
                .await;
            let prompt = format!(
                "You received an answer. Add a response for {}: ",
                ctx.record.bot_name
            );
            match self.human.ask(&prompt).await {
                Ok(reply) => (reply, None),
                Err(err) => {
                    warn!(error = %err, "no reply from human, ending the session");
                    return Flow::Quit;
                }
            }
        } else {
            let outcome = self.dispatcher.dispatch(ctx, &response).await;
            self.human
                .tell(&format!("Command response: {outcome}."))
                .await;
            let prompt = format!(
                "Ready to send response. Add an additional message for {} \
                 (if you like, leave blank if no info): ",
                ctx.record.bot_name
            );
            let additional = match self.human.ask(&prompt).await {
                Ok(text) => {
                    let text = text.trim();
                    // "no" is what people type instead of leaving it blank
                    if text.is_empty() || text == "no" {
                        None
                    } else {
                        Some(text.to_string())
                    }
                }
                Err(err) => {
                    warn!(error = %err, "could not collect additional info");
                    None
                }
            };
            (outcome, additional)
        };

        ctx.append(ChatMessage::User(UserMessage {
            author: ctx.record.active_participant.clone(),
            response: message,
            additional_info,
        }));
        self.persist(ctx).await;
        Flow::Continue
    }

    /// Persist the record after an append.
    ///
    /// A failed save never aborts the conversation: the human is warned,
    /// the in-memory history keeps the turn, and the next successful save
    /// writes the whole record.
    async fn persist(&self, ctx: &ConversationContext) {
        debug!(conversation = %ctx.id(), "saving conversation");
        if let Err(err) = self.store.save(&ctx.record).await {
            error!(conversation = %ctx.id(), error = %err, "failed to save the conversation");
            self.human
                .tell(&format!(
                    "Warning: could not save the conversation ({err}). \
                     The conversation continues in memory and will be saved with the next turn."
                ))
                .await;
        }
    }

    /// Show the interpreted response to the human.
    async fn present(&self, response: &BotResponse) {
        let arguments = serde_json::to_string(&response.arguments).unwrap_or_default();
        self.human.tell("Response from AI: ").await;
        self.human
            .tell(&format!("Command: {}", response.command))
            .await;
        self.human.tell(&format!("Arguments: {arguments}")).await;
        self.human
            .tell(&format!("Plan: {}", response.plan.as_deref().unwrap_or("None")))
            .await;
        self.human
            .tell(&format!("Steps:\n- {}", response.steps.join("\n- ")))
            .await;
    }
}
