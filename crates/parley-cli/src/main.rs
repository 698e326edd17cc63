//! Parley terminal entry point.
//!
//! Binary name: `parley`
//!
//! Parses CLI arguments, sets up tracing, loads config and API keys, picks
//! or creates a conversation, then hands control to the conversation
//! engine until the human quits.

mod cli;
mod console;
mod spinner;

use std::sync::Arc;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use parley_core::command::builtin::register_builtins;
use parley_core::command::CommandRegistry;
use parley_core::context::ConversationContext;
use parley_core::engine::Engine;
use parley_core::gateway::{BlobStore, ChatClient, ConversationStore, KvStore};
use parley_infra::config::{self, ApiKeys, OPENAI_API_KEY_VAR};
use parley_infra::llm::OpenAiChatClient;
use parley_infra::store::{
    self, FileBlobStore, FileConversationStore, FileKvStore, MemoryConversationStore, MemoryStore,
};
use parley_infra::web::register_web;
use parley_types::config::Settings;
use parley_types::conversation::ConversationRecord;
use parley_types::error::StoreError;

use cli::{Cli, Commands};
use console::ConsoleIo;
use spinner::SpinnerChat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,parley=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Shell completions don't need config or stores
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parley", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(config::default_data_dir);
    let settings = Arc::new(config::load_settings(&data_dir).await);
    let store: Arc<dyn ConversationStore> = if cli.ephemeral {
        Arc::new(MemoryConversationStore::new())
    } else {
        Arc::new(FileConversationStore::new(&data_dir))
    };

    if let Some(Commands::List) = &cli.command {
        for id in store.list_ids().await? {
            println!("{id}");
        }
        return Ok(());
    }

    let keys = ApiKeys::from_env();
    let Some(openai_key) = keys.openai.clone() else {
        anyhow::bail!("{OPENAI_API_KEY_VAR} is not set. Export it before starting a conversation.");
    };

    let record = select_conversation(&cli, store.as_ref(), &settings).await?;

    let (kv, blobs): (Arc<dyn KvStore>, Arc<dyn BlobStore>) = if cli.ephemeral {
        (Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    } else {
        let conversation_dir = store::conversation_dir(&data_dir, &record.id);
        (
            Arc::new(FileKvStore::new(&conversation_dir)),
            Arc::new(FileBlobStore::new(&conversation_dir)),
        )
    };

    let http = parley_infra::web::http_client()?;
    let model_client = Arc::new(OpenAiChatClient::new(
        http.clone(),
        openai_key,
        settings.model.clone(),
    ));
    let chat: Arc<dyn ChatClient> = Arc::new(SpinnerChat::new(model_client));
    let human = Arc::new(ConsoleIo::new());

    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry, human.clone(), chat.clone());
    register_web(&mut registry, http, keys.newsapi.clone());

    let engine = Engine::new(
        chat,
        human,
        store,
        Arc::new(registry),
        &settings,
    );
    let mut ctx = ConversationContext::new(record, kv, blobs, settings);
    engine.run(&mut ctx).await;
    Ok(())
}

/// Pick an existing conversation or create a fresh one.
async fn select_conversation(
    cli: &Cli,
    store: &dyn ConversationStore,
    settings: &Settings,
) -> anyhow::Result<ConversationRecord> {
    if let Some(id) = &cli.conversation {
        return match store.load(id).await {
            Ok(record) => Ok(record),
            Err(StoreError::NotReadable(_)) => create_conversation(store, settings, Some(id)).await,
            Err(err) => Err(err.into()),
        };
    }

    let ids = store.list_ids().await?;
    if !ids.is_empty() {
        let resume = dialoguer::Confirm::new()
            .with_prompt("Do you want to continue an existing conversation?")
            .default(true)
            .interact()?;
        if resume {
            let index = dialoguer::Select::new()
                .with_prompt("Which conversation?")
                .items(&ids)
                .default(0)
                .interact()?;
            match store.load(&ids[index]).await {
                Ok(record) => return Ok(record),
                Err(err) => {
                    console::print_error(&format!(
                        "Could not load conversation `{}`: {err}. Starting a new one.",
                        ids[index]
                    ));
                }
            }
        }
    }
    create_conversation(store, settings, None).await
}

/// Ask for the participant's name, create and persist a fresh record.
async fn create_conversation(
    store: &dyn ConversationStore,
    settings: &Settings,
    id: Option<&str>,
) -> anyhow::Result<ConversationRecord> {
    let name: String = dialoguer::Input::new()
        .with_prompt("What is your name?")
        .interact_text()?;
    let id = match id {
        Some(id) => id.to_string(),
        None => {
            let chosen: String = dialoguer::Input::new()
                .with_prompt("Conversation id (leave blank to generate one)")
                .allow_empty(true)
                .interact_text()?;
            if chosen.trim().is_empty() {
                ConversationRecord::generate_id()
            } else {
                chosen.trim().to_string()
            }
        }
    };

    let record = ConversationRecord::new(id, settings.bot_name.clone(), name.trim());
    store.save(&record).await?;
    Ok(record)
}
