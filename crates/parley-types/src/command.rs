//! Command argument contracts for Parley.
//!
//! Every registered capability declares an ordered list of [`ArgSpec`]s.
//! Binding converts the raw JSON arguments a model supplied into typed
//! [`ArgValue`]s, with structured failures for missing and mistyped
//! arguments (see `CommandError` in [`crate::error`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The closed set of primitive kinds a command argument can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    String,
    Integer,
    Boolean,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::String => write!(f, "string"),
            ArgKind::Integer => write!(f, "integer"),
            ArgKind::Boolean => write!(f, "boolean"),
        }
    }
}

impl FromStr for ArgKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(ArgKind::String),
            "integer" => Ok(ArgKind::Integer),
            "boolean" => Ok(ArgKind::Boolean),
            other => Err(format!("invalid argument kind: '{other}'")),
        }
    }
}

/// Declaration of a single argument a capability accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgSpec {
    /// Argument name as the model must supply it.
    pub name: String,
    /// Primitive kind the supplied value must have.
    pub kind: ArgKind,
    /// Help text shown to the model in the command catalog.
    pub help: String,
    /// Whether the argument must be present.
    pub required: bool,
}

impl ArgSpec {
    /// Declare a required argument.
    pub fn required(name: impl Into<String>, kind: ArgKind, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            help: help.into(),
            required: true,
        }
    }

    /// Declare an optional argument.
    pub fn optional(name: impl Into<String>, kind: ArgKind, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            help: help.into(),
            required: false,
        }
    }
}

/// A typed argument value produced by binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl ArgValue {
    /// Convert a raw JSON value into a typed value of the given kind.
    ///
    /// Returns `None` when the JSON value does not carry that kind. The
    /// conversion is strict: no coercion between kinds, and a boolean never
    /// counts as an integer.
    pub fn from_json(kind: ArgKind, value: &Value) -> Option<Self> {
        match (kind, value) {
            (ArgKind::String, Value::String(s)) => Some(ArgValue::Str(s.clone())),
            (ArgKind::Integer, Value::Number(n)) => n.as_i64().map(ArgValue::Int),
            (ArgKind::Boolean, Value::Bool(b)) => Some(ArgValue::Bool(*b)),
            _ => None,
        }
    }

    /// The string content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The boolean content, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Name of the JSON type a raw value carries, for mismatch diagnostics.
pub fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.as_i64().is_some() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
