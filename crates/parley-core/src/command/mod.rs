//! Command registry and capability contract.
//!
//! A capability is one operation the model may invoke by name. The
//! registry holds the capabilities in registration order and renders the
//! catalogue block for the prompt. Argument binding happens before
//! execution: raw JSON arguments are checked against the capability's
//! declared specs, so an execute body only ever sees typed values.

pub mod builtin;
pub mod dispatch;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use parley_types::command::{json_kind_name, ArgSpec, ArgValue};
use parley_types::config::Settings;
use parley_types::error::{CapabilityError, CommandError};

use crate::context::ConversationContext;

/// One named operation the model can invoke.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The command name the model uses to invoke this capability.
    fn name(&self) -> &'static str;

    /// One-line description for the command catalogue in the prompt.
    fn description(&self) -> &'static str;

    /// The arguments this capability accepts, in catalogue order.
    fn arguments(&self) -> Vec<ArgSpec>;

    /// Whether the human must approve each invocation before it runs.
    fn needs_confirmation(&self) -> bool {
        false
    }

    /// Run the capability with already-bound arguments.
    ///
    /// The returned text becomes the command outcome fed back to the model
    /// on the next turn.
    async fn execute(
        &self,
        ctx: &ConversationContext,
        args: &BoundArgs,
    ) -> Result<String, CapabilityError>;
}

/// Typed arguments produced by [`bind_arguments`].
///
/// The accessors taking a required argument's name return an internal
/// error if binding did not populate it; with a correct spec list that
/// cannot happen.
#[derive(Debug, Default)]
pub struct BoundArgs(HashMap<String, ArgValue>);

impl BoundArgs {
    /// A required string argument.
    pub fn str(&self, name: &str) -> Result<&str, CapabilityError> {
        self.opt_str(name)
            .ok_or_else(|| CapabilityError::Internal(format!("bound argument `{name}` missing")))
    }

    /// An optional string argument.
    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(ArgValue::as_str)
    }

    /// A required integer argument.
    pub fn int(&self, name: &str) -> Result<i64, CapabilityError> {
        self.opt_int(name)
            .ok_or_else(|| CapabilityError::Internal(format!("bound argument `{name}` missing")))
    }

    /// An optional integer argument.
    pub fn opt_int(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(ArgValue::as_int)
    }

    /// An optional boolean argument.
    pub fn opt_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(ArgValue::as_bool)
    }
}

/// Bind raw JSON arguments against a capability's declared specs.
///
/// Required arguments must be present; present arguments must carry the
/// declared kind. Arguments the capability never declared are ignored.
pub fn bind_arguments(
    specs: &[ArgSpec],
    raw: &Map<String, Value>,
) -> Result<BoundArgs, CommandError> {
    let mut bound = HashMap::new();
    for spec in specs {
        let Some(value) = raw.get(&spec.name) else {
            if spec.required {
                return Err(CommandError::MissingArgument {
                    name: spec.name.clone(),
                });
            }
            continue;
        };
        let typed = ArgValue::from_json(spec.kind, value).ok_or_else(|| {
            CommandError::ArgumentType {
                name: spec.name.clone(),
                expected: spec.kind,
                found: json_kind_name(value).to_string(),
            }
        })?;
        bound.insert(spec.name.clone(), typed);
    }
    Ok(BoundArgs(bound))
}

/// The set of capabilities available to a conversation, in a stable order.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Capability>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability. Registration order is catalogue order.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.commands.push(capability);
    }

    /// Look up a capability by command name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.commands.iter().find(|c| c.name() == name)
    }

    /// Render the command catalogue block for the prompt, restricted to
    /// the allow-list in `settings`.
    pub fn catalogue(&self, settings: &Settings) -> String {
        let mut out = String::new();
        for capability in &self.commands {
            if !settings.is_allowed(capability.name()) {
                continue;
            }
            out.push_str(&format!(
                "- `{}` - ({})\n",
                capability.name(),
                capability.description()
            ));
            let arguments = capability.arguments();
            if arguments.is_empty() {
                out.push_str("No args.\n");
            } else {
                out.push_str("Args:\n");
                for spec in &arguments {
                    out.push_str(&format!(
                        "  {} ({}) - {} ({})\n",
                        spec.name,
                        spec.kind,
                        spec.help,
                        if spec.required { "required" } else { "optional" }
                    ));
                }
            }
        }
        out
    }
}
