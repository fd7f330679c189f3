//! Runtime types for recording and replaying operation calls.
//!
//! The [`Proxy`] wraps a [`Target`] so that selected operations are appended
//! to a [`CallLedger`] on invocation. The ledger, together with an attribute
//! [`Snapshot`] delta, serializes into a textual [`Artifact`] that the
//! [`Replay`] engine parses and drives against a freshly constructed
//! instance.

mod artifact;
mod ledger;
mod proxy;
mod replay;
mod snapshot;
mod target;

// Re-exports
pub use artifact::{Artifact, ArtifactError, SaveConfig, ARTIFACT_EXTENSION};
pub use ledger::{CallLedger, CallRecord};
pub use proxy::{ContextScope, Mode, Proxy, ProxyError, SetupConfig, DEFAULT_CONTEXT};
pub use replay::{Command, Commands, Replay, ReplayDiagnostic, ReplayError, ReplayReport};
pub use snapshot::Snapshot;
pub use target::{InvokeError, OperationSpec, ParamSpec, Target};

pub use parrot_core::{Value, ValueError};
