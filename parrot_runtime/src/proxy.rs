use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use parrot_core::Value;

use crate::{
    artifact::{Artifact, ArtifactError, SaveConfig},
    ledger::{CallLedger, CallRecord},
    replay::{Replay, ReplayError, ReplayReport},
    snapshot::Snapshot,
    target::{InvokeError, OperationSpec, Target},
};

/// Context recorded for calls made outside any [`Proxy::enter`] scope.
pub const DEFAULT_CONTEXT: &str = "main";

#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("operation {0:?} is not registered for interception")]
    UnknownOperation(String),

    #[error("operation {operation:?} is missing a value for parameter {parameter:?}")]
    MissingArgument {
        operation: String,
        parameter: String,
    },

    #[error("operation {operation:?} takes {expected} arguments but {given} were supplied")]
    TooManyArguments {
        operation: String,
        expected: usize,
        given: usize,
    },

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// How an intercepted call behaves beyond being recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Record only; the calls run when the saved artifact is replayed.
    #[default]
    Deferred,
    /// Record and invoke the real operation immediately.
    Concurrent,
    /// Record only; the caller never intends immediate dispatch.
    ScriptOnly,
}

/// Interception configuration for [`Proxy::setup`].
///
/// The default include set is every operation whose name does not start with
/// an underscore; the default exclude set is the underscore-prefixed ones.
/// An explicit exclude list replaces that default with exactly the supplied
/// names.
#[derive(Debug, Default)]
pub struct SetupConfig {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub mode: Mode,
}

impl SetupConfig {
    pub fn with_include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// Wraps a [`Target`] so that calls to its registered operations are
/// appended to an owned [`CallLedger`], and, in [`Mode::Concurrent`], also
/// dispatched to the real operation.
pub struct Proxy<T: Target> {
    target: T,
    registry: BTreeMap<String, OperationSpec>,
    ledger: CallLedger,
    baseline: Snapshot,
    context: Vec<String>,
    mode: Mode,
    /// Set while a pass-through invocation is in flight; a nested call must
    /// not record itself.
    dispatching: bool,
}

impl<T: Target> Proxy<T> {
    /// Build the operation registry from the target's declared operations
    /// and take the baseline attribute snapshot.
    pub fn setup(target: T, config: SetupConfig) -> Self {
        let declared = target.operations();
        let include = config.include.unwrap_or_else(|| {
            declared
                .iter()
                .filter(|op| !op.name.starts_with('_'))
                .map(|op| op.name.clone())
                .collect()
        });
        let exclude = config.exclude.unwrap_or_else(|| {
            declared
                .iter()
                .filter(|op| op.name.starts_with('_'))
                .map(|op| op.name.clone())
                .collect()
        });
        let registry: BTreeMap<String, OperationSpec> = declared
            .into_iter()
            .filter(|op| include.contains(&op.name) && !exclude.contains(&op.name))
            .map(|op| (op.name.clone(), op))
            .collect();
        let baseline = Snapshot::capture(&target);
        tracing::debug!(
            operations = registry.len(),
            attributes = baseline.len(),
            mode = ?config.mode,
            "proxy installed"
        );
        Self {
            target,
            registry,
            ledger: CallLedger::default(),
            baseline,
            context: Vec::new(),
            mode: config.mode,
            dispatching: false,
        }
    }

    /// Push a caller-context frame; the frame pops when the returned scope
    /// drops. The scope dereferences to the proxy, so calls and nested
    /// scopes go through it.
    pub fn enter(&mut self, frame: impl Into<String>) -> ContextScope<'_, T> {
        self.context.push(frame.into());
        ContextScope { proxy: self }
    }

    /// Record a call to `operation` with positional `args`; unfilled
    /// trailing parameters resolve to their declared defaults.
    ///
    /// In [`Mode::Concurrent`] the real operation is additionally invoked
    /// and its result returned; the other modes return `Ok(None)` without
    /// dispatching. Recording never blocks on argument content: values the
    /// artifact cannot carry are recorded as-is and fail later, at
    /// serialization.
    pub fn call(&mut self, operation: &str, args: &[Value]) -> Result<Option<Value>, ProxyError> {
        let spec = self
            .registry
            .get(operation)
            .cloned()
            .ok_or_else(|| ProxyError::UnknownOperation(operation.to_owned()))?;

        if self.dispatching {
            // Re-entered from inside a pass-through invocation: dispatch
            // without recording so the inner call never self-logs. The
            // target still only ever sees fully resolved arguments.
            return if self.mode == Mode::Concurrent {
                let resolved = resolve_args(&spec, args)?;
                self.target.invoke(operation, &resolved).map_err(Into::into)
            } else {
                Ok(None)
            };
        }

        let resolved = resolve_args(&spec, args)?;
        let context = if self.context.is_empty() {
            vec![DEFAULT_CONTEXT.to_owned()]
        } else {
            self.context.clone()
        };
        tracing::trace!(operation, args = resolved.len(), context = ?context, "recording call");
        self.ledger.push(CallRecord {
            context,
            operation: spec.name.clone(),
            arg_names: spec.params.iter().map(|p| p.name.clone()).collect(),
            arg_values: resolved.clone(),
        });

        if self.mode == Mode::Concurrent {
            self.dispatching = true;
            let result = self.target.invoke(operation, &resolved);
            self.dispatching = false;
            result.map_err(Into::into)
        } else {
            Ok(None)
        }
    }

    /// Serialize the ledger to a replay artifact at `path`, taking the
    /// fresh-instance state for the delta from `fresh`. The ledger is
    /// cleared only after the write succeeds; on failure it is left intact
    /// so the caller may retry.
    pub fn save_with_fresh(
        &mut self,
        path: impl AsRef<Path>,
        fresh: &Snapshot,
        config: &SaveConfig,
    ) -> Result<Artifact, ArtifactError> {
        let delta = self.baseline.diff(fresh);
        let constructor = config
            .constructor
            .clone()
            .unwrap_or_else(|| format!("{}()", short_type_name::<T>()));
        let artifact = Artifact::build(self.ledger.records(), &delta, &constructor, config)?;
        artifact.write(path)?;
        self.ledger.clear();
        Ok(artifact)
    }

    pub fn ledger(&self) -> &CallLedger {
        &self.ledger
    }

    pub fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Operation names registered for interception, in name order.
    pub fn registered(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Direct access to the wrapped target; calls made through this are not
    /// recorded.
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }
}

impl<T: Target + Default> Proxy<T> {
    /// [`Proxy::save_with_fresh`] against a default-constructed instance.
    pub fn save(
        &mut self,
        path: impl AsRef<Path>,
        config: &SaveConfig,
    ) -> Result<Artifact, ArtifactError> {
        let fresh = Snapshot::capture(&T::default());
        self.save_with_fresh(path, &fresh, config)
    }

    /// Save, then immediately parse the artifact back and replay it against
    /// a freshly constructed instance.
    pub fn save_and_run(
        &mut self,
        path: impl AsRef<Path>,
        config: &SaveConfig,
    ) -> Result<ReplayReport, ReplayError> {
        let artifact = self.save(path, config)?;
        let mut fresh = T::default();
        Replay::new(&artifact).run(&mut fresh)
    }
}

fn resolve_args(spec: &OperationSpec, args: &[Value]) -> Result<Vec<Value>, ProxyError> {
    if args.len() > spec.params.len() {
        return Err(ProxyError::TooManyArguments {
            operation: spec.name.clone(),
            expected: spec.params.len(),
            given: args.len(),
        });
    }
    let mut resolved = args.to_vec();
    for param in &spec.params[args.len()..] {
        let default = param
            .default
            .clone()
            .ok_or_else(|| ProxyError::MissingArgument {
                operation: spec.name.clone(),
                parameter: param.name.clone(),
            })?;
        resolved.push(default);
    }
    Ok(resolved)
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

/// RAII guard for one caller-context frame; see [`Proxy::enter`].
pub struct ContextScope<'a, T: Target> {
    proxy: &'a mut Proxy<T>,
}

impl<T: Target> Deref for ContextScope<'_, T> {
    type Target = Proxy<T>;

    fn deref(&self) -> &Proxy<T> {
        self.proxy
    }
}

impl<T: Target> DerefMut for ContextScope<'_, T> {
    fn deref_mut(&mut self) -> &mut Proxy<T> {
        self.proxy
    }
}

impl<T: Target> Drop for ContextScope<'_, T> {
    fn drop(&mut self) {
        self.proxy.context.pop();
    }
}
