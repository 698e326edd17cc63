//! Shared domain types for Parley.
//!
//! This crate contains the core domain types used across the Parley
//! orchestrator: conversation messages, command argument contracts,
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod command;
pub mod config;
pub mod conversation;
pub mod error;
pub mod message;
