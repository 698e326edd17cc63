//! CLI argument definitions for the `parley` binary.
//!
//! Uses clap derive macros. Without a subcommand the binary starts (or
//! resumes) a conversation; subcommands cover the non-interactive bits.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Converse with an AI assistant that can run commands.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
pub struct Cli {
    /// Data directory holding config and conversations (default: ~/.parley).
    #[arg(long, global = true, env = "PARLEY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Resume this conversation id instead of asking.
    #[arg(short, long)]
    pub conversation: Option<String>,

    /// Keep the conversation in memory only; nothing is written to disk.
    #[arg(long)]
    pub ephemeral: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the ids of all stored conversations.
    #[command(alias = "ls")]
    List,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
