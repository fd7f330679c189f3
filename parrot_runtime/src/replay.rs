//! The replay engine: parses an artifact body by indentation depth and
//! drives the decoded call sequence against a live target.

use itertools::Itertools;
use parrot_core::{parse_prefix, Value, CLOSE_SENTINEL, OPEN_SENTINEL};

use crate::{
    artifact::{Artifact, ArtifactError},
    snapshot::Snapshot,
    target::Target,
};

/// Produced exactly once per failed replay command.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayDiagnostic {
    pub message: String,
    /// Body line index of the failing command.
    pub line_index: usize,
    /// The failing statement, rendered as text.
    pub command: String,
    /// Attribute snapshot taken once at run start.
    pub vars_at_start: Snapshot,
    /// Attribute snapshot taken immediately after the failure.
    pub vars_at_failure: Snapshot,
}

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("{}", .0.message)]
    Command(Box<ReplayDiagnostic>),
}

impl ReplayError {
    /// The diagnostic of a failed command, if that is what this error is.
    pub fn diagnostic(&self) -> Option<&ReplayDiagnostic> {
        match self {
            ReplayError::Command(diag) => Some(diag),
            ReplayError::Artifact(_) => None,
        }
    }
}

/// Outcome of a completed replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Commands dispatched to the target.
    pub executed: usize,
    /// Commands before the artifact's start line, parsed but not
    /// dispatched.
    pub skipped: usize,
}

/// One executable statement decoded from an artifact body.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub line_index: usize,
    pub context: Vec<String>,
    pub operation: String,
    pub values: Vec<Value>,
}

impl Command {
    /// The statement in textual form, for diagnostics.
    pub fn statement(&self) -> String {
        format!(
            "obj.{}({})",
            self.operation,
            self.values.iter().map(|v| v.to_string()).join(", ")
        )
    }
}

/// Iterator over the commands of an artifact body.
///
/// Classification is by indentation depth: lines shallower than two indent
/// units are context headers, lines at the recorded argument column are
/// values lines for the current operation, everything between is an
/// operation line.
pub struct Commands<'a> {
    artifact: &'a Artifact,
    line: usize,
    context: Vec<String>,
    operation: Option<String>,
}

impl<'a> Commands<'a> {
    pub fn new(artifact: &'a Artifact) -> Self {
        Self {
            artifact,
            line: 0,
            context: vec![crate::proxy::DEFAULT_CONTEXT.to_owned()],
            operation: None,
        }
    }

    fn fail(&mut self, error: ArtifactError) -> Option<Result<Command, ArtifactError>> {
        self.line = self.artifact.body.len();
        Some(Err(error))
    }
}

impl Iterator for Commands<'_> {
    type Item = Result<Command, ArtifactError>;

    fn next(&mut self) -> Option<Self::Item> {
        let artifact = self.artifact;
        let body = &artifact.body;
        while self.line < body.len() {
            let index = self.line;
            let raw = body[index].as_str();
            let text = raw.trim_start();
            if text.is_empty() {
                self.line += 1;
                continue;
            }
            let depth = raw.len() - text.len();

            if depth >= artifact.col {
                let Some(operation) = self.operation.clone() else {
                    return self.fail(ArtifactError::Line {
                        index,
                        reason: "values line without a preceding operation line".to_owned(),
                    });
                };
                match parse_values(body, index, artifact.col) {
                    Ok((values, next)) => {
                        self.line = next;
                        return Some(Ok(Command {
                            line_index: index,
                            context: self.context.clone(),
                            operation,
                            values,
                        }));
                    }
                    Err(error) => return self.fail(error),
                }
            } else if depth >= artifact.indent * 2 {
                let Some(paren) = text.find('(') else {
                    return self.fail(ArtifactError::Line {
                        index,
                        reason: format!("operation line without parentheses: {text:?}"),
                    });
                };
                let operation = text[..paren].trim().to_owned();
                self.operation = Some(operation.clone());
                self.line += 1;
                if text.trim_end() == format!("{operation}()") {
                    // A zero-argument line is itself one call.
                    return Some(Ok(Command {
                        line_index: index,
                        context: self.context.clone(),
                        operation,
                        values: Vec::new(),
                    }));
                }
            } else {
                tracing::info!(line = index, context = %text, "processing context");
                self.context = text.split('.').map(str::to_owned).collect();
                self.operation = None;
                self.line += 1;
            }
        }
        None
    }
}

/// Parse the argument values starting on body line `start` at column `col`,
/// consuming any verbatim sentinel blocks. Returns the values and the index
/// of the next unconsumed line.
fn parse_values(
    body: &[String],
    start: usize,
    col: usize,
) -> Result<(Vec<Value>, usize), ArtifactError> {
    let mut values = Vec::new();
    let mut line_idx = start;
    let mut rest: &str = body[start].get(col..).unwrap_or("");
    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        if let Some(after) = trimmed.strip_prefix(OPEN_SENTINEL) {
            if !after.trim().is_empty() {
                return Err(ArtifactError::Line {
                    index: line_idx,
                    reason: "content after an opening sentinel".to_owned(),
                });
            }
            let opened_at = line_idx;
            let mut block: Vec<&str> = Vec::new();
            loop {
                line_idx += 1;
                let Some(line) = body.get(line_idx) else {
                    return Err(ArtifactError::UnterminatedBlock { index: opened_at });
                };
                if line.trim_start().starts_with(CLOSE_SENTINEL) {
                    break;
                }
                block.push(line);
            }
            values.push(Value::Str(block.join("\n")));
            let after_close = body[line_idx]
                .trim_start()
                .strip_prefix(CLOSE_SENTINEL)
                .unwrap_or_default()
                .trim_start();
            rest = after_close.strip_prefix(',').unwrap_or(after_close);
            continue;
        }
        let (value, used) = parse_prefix(trimmed).map_err(|error| ArtifactError::Line {
            index: line_idx,
            reason: error.to_string(),
        })?;
        values.push(value);
        let after = trimmed[used..].trim_start();
        rest = after.strip_prefix(',').unwrap_or(after);
    }
    Ok((values, line_idx + 1))
}

/// Execution phases of one replay run.
enum Phase {
    ParsingLine,
    BuildingCommand(Command),
    Executing(Command),
    Aborted(Box<ReplayDiagnostic>),
    Done,
}

/// Drives the command sequence of one [`Artifact`] against a live target.
///
/// Owns no state beyond the lifetime of one run.
pub struct Replay<'a> {
    artifact: &'a Artifact,
}

impl<'a> Replay<'a> {
    pub fn new(artifact: &'a Artifact) -> Self {
        Self { artifact }
    }

    /// Apply the artifact's initial-state assignments, then execute its
    /// command sequence from the recorded start line.
    ///
    /// On a command failure the target's error-handling capability is
    /// consulted once with the diagnostic, and the run halts with
    /// [`ReplayError::Command`].
    #[tracing::instrument(skip(self, target), fields(start = self.artifact.start))]
    pub fn run<T: Target>(&self, target: &mut T) -> Result<ReplayReport, ReplayError> {
        self.apply_state_init(target);
        let vars_at_start = Snapshot::capture(target);

        let mut report = ReplayReport::default();
        let mut commands = Commands::new(self.artifact);
        let mut phase = Phase::ParsingLine;
        loop {
            phase = match phase {
                Phase::ParsingLine => match commands.next() {
                    None => Phase::Done,
                    Some(Ok(command)) => Phase::BuildingCommand(command),
                    Some(Err(error)) => return Err(error.into()),
                },
                Phase::BuildingCommand(command) => {
                    if command.line_index < self.artifact.start {
                        tracing::debug!(line = command.line_index, "skipping completed command");
                        report.skipped += 1;
                        Phase::ParsingLine
                    } else {
                        Phase::Executing(command)
                    }
                }
                Phase::Executing(command) => {
                    tracing::debug!(line = command.line_index, command = %command.statement(), "executing");
                    match target.invoke(&command.operation, &command.values) {
                        Ok(_) => {
                            report.executed += 1;
                            Phase::ParsingLine
                        }
                        Err(error) => {
                            let diagnostic =
                                diagnose(&command, &error.to_string(), vars_at_start.clone(), target);
                            target.on_replay_error(&diagnostic);
                            Phase::Aborted(Box::new(diagnostic))
                        }
                    }
                }
                Phase::Aborted(diagnostic) => return Err(ReplayError::Command(diagnostic)),
                Phase::Done => {
                    tracing::info!(executed = report.executed, skipped = report.skipped, "replay finished");
                    return Ok(report);
                }
            };
        }
    }

    fn apply_state_init<T: Target>(&self, target: &mut T) {
        for (name, encoded) in &self.artifact.state_init {
            match Value::decode(encoded) {
                Ok(value) => {
                    if let Err(error) = target.set_attribute(name, value) {
                        tracing::warn!(attribute = %name, %error, "failed to set attribute");
                    }
                }
                Err(error) => {
                    tracing::warn!(attribute = %name, %error, "failed to decode attribute initializer");
                }
            }
        }
    }
}

fn diagnose<T: Target>(
    command: &Command,
    error: &str,
    vars_at_start: Snapshot,
    target: &T,
) -> ReplayDiagnostic {
    let statement = command.statement();
    let shown: String = if statement.chars().count() > 80 {
        let head: String = statement.chars().take(80).collect();
        format!("{head}...")
    } else {
        statement.clone()
    };
    ReplayDiagnostic {
        message: format!(
            "Error processing command {} :: {shown} ({error})",
            command.line_index
        ),
        line_index: command.line_index,
        command: statement,
        vars_at_start,
        vars_at_failure: Snapshot::capture(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifact::SaveConfig,
        ledger::CallRecord,
        target::{InvokeError, OperationSpec},
    };
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Counter {
        count: i64,
        log: Vec<String>,
        fail_on: Option<String>,
        seen_diagnostic: Option<ReplayDiagnostic>,
    }

    impl Target for Counter {
        fn operations(&self) -> Vec<OperationSpec> {
            vec![
                OperationSpec::new("incr").with_defaulted("by", 1i64),
                OperationSpec::new("label").with_required("text"),
            ]
        }

        fn invoke(&mut self, operation: &str, args: &[Value]) -> Result<Option<Value>, InvokeError> {
            if self.fail_on.as_deref() == Some(operation) {
                return Err(InvokeError::new("injected failure"));
            }
            match operation {
                "incr" => {
                    if let Some(Value::Int(by)) = args.first() {
                        self.count += by;
                    }
                    self.log.push(format!("incr({})", args.len()));
                    Ok(Some(Value::Int(self.count)))
                }
                "label" => {
                    self.log.push(format!("label:{}", args[0]));
                    Ok(None)
                }
                other => Err(InvokeError::unknown_operation(other)),
            }
        }

        fn attributes(&self) -> BTreeMap<String, Value> {
            BTreeMap::from([("count".to_owned(), Value::Int(self.count))])
        }

        fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), InvokeError> {
            match (name, value) {
                ("count", Value::Int(i)) => {
                    self.count = i;
                    Ok(())
                }
                _ => Err(InvokeError::unknown_attribute(name)),
            }
        }

        fn on_replay_error(&mut self, diagnostic: &ReplayDiagnostic) {
            self.seen_diagnostic = Some(diagnostic.clone());
        }
    }

    fn record(op: &str, names: &[&str], values: &[Value]) -> CallRecord {
        CallRecord {
            context: vec!["main".to_owned()],
            operation: op.to_owned(),
            arg_names: names.iter().map(|s| s.to_string()).collect(),
            arg_values: values.to_vec(),
        }
    }

    fn artifact_for(records: &[CallRecord], delta: &[(String, String)]) -> Artifact {
        Artifact::build(records, delta, "Counter()", &SaveConfig::default()).unwrap()
    }

    #[test]
    fn commands_round_trip_the_recorded_sequence() {
        let records = [
            record("incr", &["by"], &[Value::Int(1)]),
            record("incr", &["by"], &[Value::Int(5)]),
            record("label", &["text"], &[Value::from("a, b")]),
        ];
        let artifact = artifact_for(&records, &[]);
        let commands = artifact.commands().unwrap();
        let got: Vec<_> = commands
            .iter()
            .map(|c| (c.operation.as_str(), c.values.clone()))
            .collect();
        let want: Vec<_> = records
            .iter()
            .map(|r| (r.operation.as_str(), r.arg_values.clone()))
            .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn multi_line_string_survives_parsing() {
        let records = [record(
            "label",
            &["text"],
            &[Value::from("cruel,\n World")],
        )];
        let artifact = artifact_for(&records, &[]);
        let commands = artifact.commands().unwrap();
        assert_eq!(commands[0].values, [Value::from("cruel,\n World")]);
    }

    #[test]
    fn run_applies_state_init_then_executes() {
        let records = [record("incr", &["by"], &[Value::Int(2)])];
        let delta = vec![("count".to_owned(), "10".to_owned())];
        let artifact = artifact_for(&records, &delta);
        let mut target = Counter::default();
        let report = Replay::new(&artifact).run(&mut target).unwrap();
        assert_eq!(report.executed, 1);
        assert_eq!(target.count, 12);
    }

    #[test]
    fn bad_state_assignment_is_skipped_not_fatal() {
        let records = [record("incr", &["by"], &[Value::Int(1)])];
        let delta = vec![
            ("bogus".to_owned(), "1".to_owned()),
            ("count".to_owned(), "5".to_owned()),
        ];
        let artifact = artifact_for(&records, &delta);
        let mut target = Counter::default();
        Replay::new(&artifact).run(&mut target).unwrap();
        assert_eq!(target.count, 6);
    }

    #[test]
    fn failure_produces_one_diagnostic_and_halts() {
        let records = [
            record("incr", &["by"], &[Value::Int(3)]),
            record("label", &["text"], &[Value::from("x")]),
            record("incr", &["by"], &[Value::Int(4)]),
        ];
        let artifact = artifact_for(&records, &[]);
        let mut target = Counter {
            fail_on: Some("label".to_owned()),
            ..Counter::default()
        };
        let err = Replay::new(&artifact).run(&mut target).unwrap_err();
        let diag = err.diagnostic().expect("command diagnostic");
        assert_eq!(diag.command, "obj.label('x')");
        assert!(diag.message.contains("injected failure"));
        // The failing invocation never ran, so only the first incr landed.
        assert_eq!(target.count, 3);
        assert_eq!(diag.vars_at_start.get("count"), Some("0"));
        assert_eq!(diag.vars_at_failure.get("count"), Some("3"));
        assert!(target.seen_diagnostic.is_some());
    }

    #[test]
    fn resumed_artifact_skips_completed_commands() {
        let records = [
            record("incr", &["by"], &[Value::Int(3)]),
            record("label", &["text"], &[Value::from("x")]),
            record("incr", &["by"], &[Value::Int(4)]),
        ];
        let artifact = artifact_for(&records, &[]);
        let mut target = Counter {
            fail_on: Some("label".to_owned()),
            ..Counter::default()
        };
        let err = Replay::new(&artifact).run(&mut target).unwrap_err();
        let diag = err.diagnostic().unwrap().clone();

        let resumed = artifact.resumed(&diag);
        // Only the attribute that changed between the two snapshots is
        // re-initialized.
        assert_eq!(resumed.state_init, vec![("count".to_owned(), "3".to_owned())]);

        let mut fresh = Counter::default();
        let report = Replay::new(&resumed).run(&mut fresh).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.executed, 2);
        assert_eq!(fresh.count, 3 + 4);
        assert_eq!(fresh.log, ["label:'x'", "incr(1)"]);
    }

    #[test]
    fn values_line_without_header_is_an_error() {
        let mut artifact = artifact_for(&[record("incr", &["by"], &[Value::Int(1)])], &[]);
        // Drop the context and header lines, leaving a bare values line.
        artifact.body.drain(..2);
        let err = artifact.commands().unwrap_err();
        assert!(matches!(err, ArtifactError::Line { .. }));
    }
}
