//! Parrot records the calls made to an object behind a transparent proxy and
//! serializes them into a human-readable replay artifact that can later
//! rebuild the same state on a fresh instance.
//!
//! The [`runtime::Proxy`] wraps any [`runtime::Target`] implementation,
//! appending intercepted calls to a ledger. Saving the ledger produces an
//! [`runtime::Artifact`]: an indentation-structured text file carrying the
//! call sequence, a constructor expression and the minimal initial-state
//! delta. The [`runtime::Replay`] engine parses an artifact and drives it
//! against a live target, producing a resumable diagnostic on failure.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]

pub use parrot_core as core;
pub use parrot_runtime as runtime;

#[cfg(feature = "runner")]
pub mod runner;

/// Convenience re-exports for the common recording and replaying workflow.
pub mod prelude {
    pub use crate::core::{Value, ValueError};
    pub use crate::runtime::{
        Artifact, ArtifactError, CallLedger, CallRecord, Command, ContextScope, InvokeError,
        Mode, OperationSpec, ParamSpec, Proxy, ProxyError, Replay, ReplayDiagnostic, ReplayError,
        ReplayReport, SaveConfig, SetupConfig, Snapshot, Target,
    };
}
