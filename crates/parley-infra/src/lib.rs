//! Infrastructure adapters for Parley.
//!
//! Implements the gateway traits from `parley-core` against the real
//! world: file-backed persistence under the data directory, the OpenAI
//! chat completions API, and the web-facing capabilities (search, page
//! reading, news).

pub mod config;
pub mod llm;
pub mod store;
pub mod web;
