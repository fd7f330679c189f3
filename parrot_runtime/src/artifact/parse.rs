//! Parsing an artifact back from its textual form.

use parrot_core::DOC_MARKER;

use super::{Artifact, ArtifactError};

pub(super) fn parse(text: &str) -> Result<Artifact, ArtifactError> {
    let lines: Vec<&str> = text.lines().collect();
    let open = lines
        .iter()
        .position(|l| l.trim() == DOC_MARKER)
        .ok_or(ArtifactError::MissingDocBlock)?;
    let close = lines[open + 1..]
        .iter()
        .position(|l| l.trim() == DOC_MARKER)
        .map(|i| i + open + 1)
        .ok_or(ArtifactError::MissingDocBlock)?;

    // Strip the blank padding lines the renderer emits around the body, but
    // keep interior blanks so recorded line indices stay stable.
    let mut body: Vec<&str> = lines[open + 1..close].to_vec();
    while body.first().is_some_and(|l| l.trim().is_empty()) {
        body.remove(0);
    }
    while body.last().is_some_and(|l| l.trim().is_empty()) {
        body.pop();
    }

    let mut constructor = None;
    let mut state_init = Vec::new();
    let mut preamble_lines: Vec<&str> = Vec::new();
    let mut col = None;
    let mut indent = None;
    let mut start = 0;
    for (offset, line) in lines[close + 1..].iter().enumerate() {
        let index = close + 1 + offset;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            match key {
                "obj" => {
                    constructor = Some(value.to_owned());
                    continue;
                }
                "col" => {
                    col = Some(parse_directive(index, key, value)?);
                    continue;
                }
                "tab" => {
                    indent = Some(parse_directive(index, key, value)?);
                    continue;
                }
                "start" => {
                    start = parse_directive(index, key, value)?;
                    continue;
                }
                _ => {
                    if let Some(name) = key.strip_prefix("obj.") {
                        state_init.push((name.trim().to_owned(), value.to_owned()));
                        continue;
                    }
                }
            }
        }
        // Anything else is setup text carried verbatim.
        preamble_lines.push(line);
    }

    Ok(Artifact {
        body: body.into_iter().map(str::to_owned).collect(),
        constructor: constructor.ok_or(ArtifactError::MissingDirective("obj"))?,
        state_init,
        preamble: preamble_lines.join("\n"),
        col: col.ok_or(ArtifactError::MissingDirective("col"))?,
        indent: indent.unwrap_or(4),
        start,
    })
}

fn parse_directive(index: usize, key: &str, value: &str) -> Result<usize, ArtifactError> {
    value.parse().map_err(|_| ArtifactError::Line {
        index,
        reason: format!("directive `{key}` is not a number: {value:?}"),
    })
}
