//! Command-line entry points for replaying saved artifacts.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use crate::runtime::{Artifact, Replay, ReplayReport, Target};

#[derive(clap::Parser)]
pub struct Args {
    /// Path to the replay artifact.
    pub artifact: PathBuf,

    /// Body line index to start execution at, overriding the artifact's
    /// recorded `start` directive.
    #[arg(long)]
    pub start: Option<usize>,
}

/// Load the artifact at `path` and replay it against a default-constructed
/// target.
pub fn run_artifact<T: Target + Default>(
    path: impl AsRef<Path>,
    start: Option<usize>,
) -> anyhow::Result<ReplayReport> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading artifact {}", path.display()))?;
    let mut artifact = Artifact::parse(&text)
        .with_context(|| format!("parsing artifact {}", path.display()))?;
    if let Some(start) = start {
        artifact.start = start;
    }
    let mut target = T::default();
    Replay::new(&artifact)
        .run(&mut target)
        .context("replay failed")
}

/// [`run_artifact`] with the artifact path and options parsed from the
/// command line.
pub fn run_from_args<T: Target + Default>() -> anyhow::Result<ReplayReport> {
    let args = Args::parse();
    run_artifact::<T>(&args.artifact, args.start)
}

/// Hand the artifact at `path` to an external interpreter program, returning
/// its captured standard output. The output is returned even when the
/// program exits nonzero, so callers can surface partial progress.
pub fn exec_artifact(program: &str, path: impl AsRef<Path>) -> std::io::Result<String> {
    let output = std::process::Command::new(program)
        .arg(path.as_ref())
        .output()?;
    if !output.status.success() {
        tracing::warn!(status = %output.status, program, "artifact interpreter exited nonzero");
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
