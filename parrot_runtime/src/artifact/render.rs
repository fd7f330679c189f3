//! Rendering of a ledger into the artifact's textual layout.

use parrot_core::{Value, CLOSE_SENTINEL, DOC_MARKER, OPEN_SENTINEL};

use super::{Artifact, ArtifactError, SaveConfig};
use crate::ledger::CallRecord;

pub(super) fn build(
    records: &[CallRecord],
    delta: &[(String, String)],
    constructor: &str,
    config: &SaveConfig,
) -> Result<Artifact, ArtifactError> {
    let indent = config.indent;
    let max_name = records.iter().map(|r| r.operation.len()).max().unwrap_or(0);
    let col = indent * 2 + max_name + 5;

    let mut body: Vec<String> = Vec::new();
    let mut last_context = String::new();
    let mut last_operation = String::new();
    for record in records {
        let context = record.context.join(".");
        if context != last_context {
            body.push(format!("{}{}", " ".repeat(indent), context));
            last_context = context;
            last_operation.clear();
        }
        if record.arg_values.is_empty() {
            // Zero-argument calls carry no values line, so each call emits
            // its own operation line.
            body.push(format!("{}{}()", " ".repeat(indent * 2), record.operation));
            last_operation.clear();
            continue;
        }
        if record.operation != last_operation {
            body.push(render_header(record, indent, col, config.width));
            last_operation = record.operation.clone();
        }
        render_values(record, col, config.width, &mut body)?;
    }

    Ok(Artifact {
        body,
        constructor: constructor.to_owned(),
        state_init: delta.to_vec(),
        preamble: config.imports.clone(),
        col,
        indent,
        start: 0,
    })
}

pub(super) fn to_text(artifact: &Artifact) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(artifact.body.len() + 16);
    lines.push(DOC_MARKER.to_owned());
    lines.push(String::new());
    lines.extend(artifact.body.iter().cloned());
    lines.push(String::new());
    lines.push(DOC_MARKER.to_owned());
    lines.push(String::new());
    if !artifact.preamble.is_empty() {
        lines.extend(artifact.preamble.lines().map(str::to_owned));
        lines.push(String::new());
    }
    lines.push(format!("obj = {}", artifact.constructor));
    for (name, encoded) in &artifact.state_init {
        lines.push(format!("obj.{name} = {encoded}"));
    }
    lines.push(String::new());
    lines.push(format!("col = {}", artifact.col));
    lines.push(format!("tab = {}", artifact.indent));
    lines.push(format!("start = {}", artifact.start));
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn pad(token: String, width: usize) -> String {
    format!("{token:<width$}")
}

/// Close an argument run: strip the alignment padding and the trailing
/// comma.
fn finish(mut line: String) -> String {
    line.truncate(line.trim_end().len());
    if line.ends_with(',') {
        line.pop();
    }
    line
}

fn render_header(record: &CallRecord, indent: usize, col: usize, width: usize) -> String {
    let prefix = format!("{}{}(", " ".repeat(indent * 2), record.operation);
    let mut line = format!("{prefix:<col$}");
    for name in &record.arg_names {
        line.push_str(&pad(format!("{name},"), width));
    }
    let mut line = finish(line);
    line.push(')');
    line
}

fn render_values(
    record: &CallRecord,
    col: usize,
    width: usize,
    body: &mut Vec<String>,
) -> Result<(), ArtifactError> {
    let mut line = " ".repeat(col);
    for (index, value) in record.arg_values.iter().enumerate() {
        if let Value::Str(s) = value {
            if s.contains('\n') {
                reject_reserved(record, index, s)?;
                line.push_str(OPEN_SENTINEL);
                body.push(line);
                body.extend(s.split('\n').map(str::to_owned));
                line = " ".repeat(col);
                line.push_str(&pad(format!("{CLOSE_SENTINEL},"), width));
                continue;
            }
        }
        let encoded = value
            .encode()
            .map_err(|source| ArtifactError::Argument {
                operation: record.operation.clone(),
                argument: index,
                source,
            })?;
        line.push_str(&pad(format!("{encoded},"), width));
    }
    body.push(finish(line));
    Ok(())
}

fn reject_reserved(record: &CallRecord, index: usize, s: &str) -> Result<(), ArtifactError> {
    for token in [OPEN_SENTINEL, CLOSE_SENTINEL, DOC_MARKER] {
        if s.contains(token) {
            return Err(ArtifactError::Argument {
                operation: record.operation.clone(),
                argument: index,
                source: parrot_core::ValueError::ReservedToken { token },
            });
        }
    }
    Ok(())
}
