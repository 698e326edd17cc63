//! Conversation orchestration for Parley.
//!
//! This crate defines the "ports" (gateway traits) that the infrastructure
//! layer implements, plus the three components built on top of them: the
//! response interpreter, the command registry/dispatcher, and the
//! conversation engine. It depends only on `parley-types` -- never on
//! `parley-infra` or any HTTP/filesystem crate.

pub mod command;
pub mod context;
pub mod engine;
pub mod gateway;
pub mod interpreter;
pub mod prompt;

#[cfg(test)]
pub(crate) mod testutil;
