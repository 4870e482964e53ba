// src/report.rs

//! Non-fatal diagnostics and the end-of-run summary.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{error, warn};

use crate::errors::{CompileError, LinkError, ProbeUnavailable, RecordError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Something worth telling the operator that did not abort the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A compilable file sits directly in the sources root and belongs to no target.
    StraySource { path: PathBuf },
    /// A sources subdirectory that cannot be classified as a target.
    MalformedTargetDir { dir: PathBuf, reason: String },
    /// A target directory without any compilable source.
    EmptyTarget { target: String },
    ProbeUnavailable(ProbeUnavailable),
    /// A dependency record could not be used; the object is rebuilt.
    CorruptRecord(RecordError),
    CompileFailed(CompileError),
    LinkFailed(LinkError),
    /// A target was not linked because one of its inputs failed.
    TargetSkipped { target: String, reason: String },
    PublishFailed { target: String, reason: String },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::CompileFailed(_)
            | Diagnostic::LinkFailed(_)
            | Diagnostic::TargetSkipped { .. } => Severity::Error,
            _ => Severity::Warning,
        }
    }

    /// Emit this diagnostic as a tracing event.
    pub fn log(&self) {
        match self.severity() {
            Severity::Error => error!("{self}"),
            Severity::Warning => warn!("{self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::StraySource { path } => {
                write!(f, "source {:?} is not inside a target directory; ignored", path)
            }
            Diagnostic::MalformedTargetDir { dir, reason } => {
                write!(f, "skipping directory {:?}: {reason}", dir)
            }
            Diagnostic::EmptyTarget { target } => {
                write!(f, "skipping target '{target}': no compilable sources")
            }
            Diagnostic::ProbeUnavailable(e) => write!(f, "{e}"),
            Diagnostic::CorruptRecord(e) => write!(f, "{e}; forcing recompile"),
            Diagnostic::CompileFailed(e) => write!(f, "{e}"),
            Diagnostic::LinkFailed(e) => write!(f, "{e}"),
            Diagnostic::TargetSkipped { target, reason } => {
                write!(f, "target '{target}' not linked: {reason}")
            }
            Diagnostic::PublishFailed { target, reason } => {
                write!(f, "could not publish '{target}': {reason}")
            }
        }
    }
}

/// Outcome of one `build` invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Sources compiled successfully in this run.
    pub compiled: Vec<PathBuf>,
    /// Targets linked successfully in this run.
    pub linked: Vec<String>,
    /// Targets that needed no work.
    pub up_to_date: Vec<String>,
    /// Failed targets and the first reason recorded for each.
    pub failed_targets: BTreeMap<String, String>,
    /// Number of compile actions started (successful or not).
    pub compile_actions: usize,
    /// Number of link actions started (successful or not).
    pub link_actions: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when Ctrl-C stopped the run early.
    pub interrupted: bool,
}

impl BuildReport {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }

    pub fn fail_target(&mut self, target: &str, reason: impl Into<String>) {
        self.failed_targets
            .entry(target.to_string())
            .or_insert_with(|| reason.into());
    }

    /// Total compile + link actions started.
    pub fn actions(&self) -> usize {
        self.compile_actions + self.link_actions
    }

    pub fn is_success(&self) -> bool {
        self.failed_targets.is_empty() && !self.interrupted
    }

    /// Process exit status: 0 on full success, 1 if any target failed.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Human-readable summary on stdout.
    pub fn print_summary(&self) {
        let warnings = self
            .diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
            .count();

        println!(
            "dirbuild: {} compiled, {} linked, {} up to date, {} failed, {} warning(s)",
            self.compiled.len(),
            self.linked.len(),
            self.up_to_date.len(),
            self.failed_targets.len(),
            warnings
        );

        for (target, reason) in &self.failed_targets {
            println!("  FAILED {target}: {reason}");
        }
        for diagnostic in self.diagnostics.iter().filter(|d| d.severity() == Severity::Warning) {
            println!("  warning: {diagnostic}");
        }
        if self.interrupted {
            println!("  build interrupted");
        }
    }
}
