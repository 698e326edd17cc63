use thiserror::Error;

use crate::command::ArgKind;

/// Structured failures from binding raw arguments against a capability's
/// argument specs. These are distinguishable conditions, not generic text;
/// the dispatcher renders them into outcome messages for the model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("argument `{name}` is missing")]
    MissingArgument { name: String },

    #[error("argument `{name}` has the wrong type (expected {expected}, found {found})")]
    ArgumentType {
        name: String,
        expected: ArgKind,
        found: String,
    },
}

/// Failure raised by a capability's execute body.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// A failure with two independent messages: `reply` is safe to relay
    /// to the model as the outcome text, `detail` is for operator logs only.
    #[error("{detail}")]
    Failed { reply: String, detail: String },

    /// Anything the capability could not express as a model-safe failure.
    /// The dispatcher converts this to a generic outcome at its boundary.
    #[error("{0}")]
    Internal(String),
}

impl CapabilityError {
    /// Convenience constructor for a failure whose model-visible reply and
    /// operator detail are the same text.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Failed {
            reply: message.clone(),
            detail: message,
        }
    }
}

/// Errors from talking to the model API.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connection refused, timeout, DNS).
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("model API returned status {status}: {body}")]
    Http { status: u16, body: String },

    /// The API answered 200 but the expected envelope fields are missing.
    #[error("malformed model API response: {0}")]
    Envelope(String),
}

/// Errors from the persistence gateways (conversation, key-value, blob).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store not readable: {0}")]
    NotReadable(String),

    #[error("store not writable: {0}")]
    NotWritable(String),

    /// The key failed the access policy (e.g. parent-directory traversal).
    #[error("access to key `{0}` is not allowed")]
    AccessDenied(String),
}

/// Errors from the human I/O gateway.
#[derive(Debug, Error)]
pub enum HumanIoError {
    #[error("human interaction is not available: {0}")]
    Unavailable(String),

    #[error("the human did not provide a response")]
    NoResponse,
}
