//! Model API clients.

pub mod openai;

pub use openai::OpenAiChatClient;
