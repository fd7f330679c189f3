//! The textual replay-artifact format.
//!
//! An artifact is a plain-text file: a documentation block (bracketed by the
//! `"""` marker) holding the rendered call sequence, followed by setup lines
//! the replay engine recognizes (`obj = <constructor>`, one `obj.<name> =
//! <value>` line per initial-state assignment) and the driver directives
//! `col`, `tab` and `start`. The body is parsed by indentation depth alone:
//! depth 1 is a context header, depth 2 an operation line, depth 3 (at the
//! recorded column) a values line. The column width computed at
//! serialization time is recorded in the file so parsing uses exactly the
//! same offset.

mod parse;
mod render;

use std::path::{Path, PathBuf};

use parrot_core::ValueError;

use crate::{
    ledger::CallRecord,
    replay::{Command, Commands, ReplayDiagnostic},
};

/// File suffix every saved artifact is normalized to.
pub const ARTIFACT_EXTENSION: &str = "replay";

#[derive(thiserror::Error, Debug)]
pub enum ArtifactError {
    #[error("argument {argument} of operation {operation:?} cannot be serialized: {source}")]
    Argument {
        operation: String,
        argument: usize,
        source: ValueError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("artifact has no documentation block")]
    MissingDocBlock,

    #[error("artifact is missing the `{0}` directive")]
    MissingDirective(&'static str),

    #[error("malformed body line {index}: {reason}")]
    Line { index: usize, reason: String },

    #[error("unterminated multi-line block opened at body line {index}")]
    UnterminatedBlock { index: usize },
}

/// Rendering options for [`Artifact::build`].
#[derive(Debug, Clone)]
pub struct SaveConfig {
    /// Constructor expression for the fresh instance; defaults to the
    /// target type's name followed by `()`.
    pub constructor: Option<String>,
    /// Free setup text emitted verbatim between the documentation block and
    /// the constructor statement.
    pub imports: String,
    /// Column width of one rendered argument.
    pub width: usize,
    /// Spaces per indentation level in the documentation block.
    pub indent: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            constructor: None,
            imports: String::new(),
            width: 30,
            indent: 4,
        }
    }
}

impl SaveConfig {
    pub fn with_constructor(mut self, constructor: impl Into<String>) -> Self {
        self.constructor = Some(constructor.into());
        self
    }

    pub fn with_imports(mut self, imports: impl Into<String>) -> Self {
        self.imports = imports.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}

/// A parsed or freshly rendered replay artifact.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Artifact {
    pub(crate) body: Vec<String>,
    pub constructor: String,
    /// Attribute assignments applied before replay, in emission order; the
    /// second element is the canonically encoded value.
    pub state_init: Vec<(String, String)>,
    /// Setup text carried verbatim between the documentation block and the
    /// constructor statement.
    pub preamble: String,
    /// Argument column offset of depth-3 lines.
    pub col: usize,
    /// Spaces per indentation level.
    pub indent: usize,
    /// First body line index the replay engine executes.
    pub start: usize,
}

impl Artifact {
    /// Render a ledger plus an initial-state delta into an artifact.
    pub fn build(
        records: &[CallRecord],
        delta: &[(String, String)],
        constructor: &str,
        config: &SaveConfig,
    ) -> Result<Self, ArtifactError> {
        render::build(records, delta, constructor, config)
    }

    /// Parse an artifact back from its textual form.
    pub fn parse(text: &str) -> Result<Self, ArtifactError> {
        parse::parse(text)
    }

    /// The full textual form, suitable for writing to disk and for
    /// [`Artifact::parse`].
    pub fn to_text(&self) -> String {
        render::to_text(self)
    }

    /// Write the artifact to `path`, normalizing the extension to
    /// [`ARTIFACT_EXTENSION`]. Returns the path actually written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<PathBuf, ArtifactError> {
        let mut path = path.as_ref().to_path_buf();
        path.set_extension(ARTIFACT_EXTENSION);
        std::fs::write(&path, self.to_text())?;
        tracing::info!(path = %path.display(), lines = self.body.len(), "wrote replay artifact");
        Ok(path)
    }

    /// The documentation-block lines, without the markers.
    pub fn body(&self) -> &[String] {
        &self.body
    }

    /// Parse the body into the ordered call sequence it encodes.
    pub fn commands(&self) -> Result<Vec<Command>, ArtifactError> {
        Commands::new(self).collect()
    }

    /// Build the resume artifact for a failed replay: same body, execution
    /// starting at the failing line, and a state initialization restricted
    /// to the attributes that changed between the run-start and
    /// failure-time snapshots.
    pub fn resumed(&self, diagnostic: &ReplayDiagnostic) -> Artifact {
        let state_init = diagnostic
            .vars_at_failure
            .iter()
            .filter(|(name, encoded)| diagnostic.vars_at_start.get(name) != Some(*encoded))
            .map(|(name, encoded)| (name.to_owned(), encoded.to_owned()))
            .collect();
        Artifact {
            body: self.body.clone(),
            constructor: self.constructor.clone(),
            state_init,
            preamble: self.preamble.clone(),
            col: self.col,
            indent: self.indent,
            start: diagnostic.line_index,
        }
    }
}
