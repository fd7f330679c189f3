use std::collections::BTreeMap;

use parrot_core::Value;

use crate::ReplayDiagnostic;

/// Error raised by a target from [`Target::invoke`] or
/// [`Target::set_attribute`].
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct InvokeError {
    message: String,
}

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn unknown_operation(operation: &str) -> Self {
        Self::new(format!("unknown operation {operation:?}"))
    }

    pub fn unknown_attribute(attribute: &str) -> Self {
        Self::new(format!("unknown attribute {attribute:?}"))
    }
}

/// One declared parameter of an operation: a name plus an optional default.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn defaulted(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// The registry entry for one interceptable operation: its name and ordered
/// parameter list, built once from the target's [`Target::operations`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperationSpec {
    pub name: String,
    pub params: Vec<ParamSpec>,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter without a default value.
    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSpec::required(name));
        self
    }

    /// Append a parameter carrying a default value.
    pub fn with_defaulted(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(ParamSpec::defaulted(name, default));
        self
    }
}

/// The capabilities a recordable object exposes to the runtime.
///
/// `operations` is the reflection capability the default interception set is
/// built from; `invoke` is the generic dispatch handle every recorded or
/// replayed call goes through; `attributes` and `set_attribute` back the
/// snapshot and state-initialization mechanisms. Attributes are only ever
/// [`Value`]-typed by construction, so operations can never leak into a
/// snapshot.
pub trait Target {
    /// Enumerate the operations this target exposes, with their ordered
    /// parameter names and defaults.
    fn operations(&self) -> Vec<OperationSpec>;

    /// Invoke `operation` with fully resolved positional arguments.
    fn invoke(&mut self, operation: &str, args: &[Value]) -> Result<Option<Value>, InvokeError>;

    /// The current attribute values of this target.
    fn attributes(&self) -> BTreeMap<String, Value>;

    /// Assign one attribute; used when replaying the initial-state delta.
    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), InvokeError>;

    /// Called once when a replayed command fails. The default reports the
    /// diagnostic and lets the engine halt; implementors may use the
    /// diagnostic's snapshots and line index to build a resumed artifact.
    fn on_replay_error(&mut self, diagnostic: &ReplayDiagnostic) {
        tracing::error!(
            line = diagnostic.line_index,
            command = %diagnostic.command,
            "{}",
            diagnostic.message
        );
    }
}
