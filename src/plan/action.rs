// src/plan/action.rs

//! Compile and link requests plus their scheduling envelope.

use std::fmt;
use std::path::PathBuf;

use crate::deps::command_signature;
use crate::types::{Language, TargetKind};

/// Index of an action inside one [`super::BuildPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(pub usize);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything needed to compile one source into one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub source: PathBuf,
    pub object: PathBuf,
    pub record: PathBuf,
    pub language: Language,
    pub program: String,
    pub include_paths: Vec<PathBuf>,
    /// Configured flags followed by probe flags.
    pub flags: Vec<String>,
}

impl CompileRequest {
    /// Full argument vector for a gcc/clang-compatible driver.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.flags.clone();
        args.extend(
            self.include_paths
                .iter()
                .map(|p| format!("-I{}", p.display())),
        );
        args.extend([
            "-MMD".to_string(),
            "-MF".to_string(),
            self.record.display().to_string(),
            "-MT".to_string(),
            self.object.display().to_string(),
            "-c".to_string(),
            self.source.display().to_string(),
            "-o".to_string(),
            self.object.display().to_string(),
        ]);
        args
    }

    /// Fingerprint stored in the record after a successful compile.
    pub fn signature(&self) -> String {
        command_signature(&self.program, &self.args())
    }
}

/// Everything needed to link one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub target: String,
    pub kind: TargetKind,
    pub program: String,
    pub objects: Vec<PathBuf>,
    pub library_paths: Vec<PathBuf>,
    pub flags: Vec<String>,
    pub libs: Vec<String>,
    pub artifact: PathBuf,
}

impl LinkRequest {
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.kind.is_library() {
            args.push("-shared".to_string());
        }
        args.push("-o".to_string());
        args.push(self.artifact.display().to_string());
        args.extend(self.objects.iter().map(|o| o.display().to_string()));
        args.extend(
            self.library_paths
                .iter()
                .map(|p| format!("-L{}", p.display())),
        );
        args.extend(self.flags.iter().cloned());
        args.extend(self.libs.iter().map(|l| format!("-l{l}")));
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Compile(CompileRequest),
    Link(LinkRequest),
}

/// An action plus its ordering constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAction {
    pub id: ActionId,
    pub kind: ActionKind,
    /// Actions that must succeed first; if one fails, this one fails too.
    pub requires: Vec<ActionId>,
    /// Actions that must merely have finished first, whatever their outcome.
    pub after: Vec<ActionId>,
}

impl ScheduledAction {
    pub fn is_compile(&self) -> bool {
        matches!(self.kind, ActionKind::Compile(_))
    }

    /// Short human label: the source for compiles, the target for links.
    pub fn label(&self) -> String {
        match &self.kind {
            ActionKind::Compile(c) => c.source.display().to_string(),
            ActionKind::Link(l) => l.target.clone(),
        }
    }
}

impl fmt::Display for ScheduledAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Compile(c) => write!(f, "{} {}", c.program, c.args().join(" ")),
            ActionKind::Link(l) => write!(f, "{} {}", l.program, l.args().join(" ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile() -> CompileRequest {
        CompileRequest {
            source: PathBuf::from("src/app/main.c"),
            object: PathBuf::from("build/obj/app/main.c.o"),
            record: PathBuf::from("build/obj/app/main.c.d"),
            language: Language::C,
            program: "cc".to_string(),
            include_paths: vec![PathBuf::from("include/app")],
            flags: vec!["-O2".to_string()],
        }
    }

    #[test]
    fn compile_args_write_record_and_object() {
        let args = compile().args();
        assert_eq!(args[0], "-O2");
        assert_eq!(args[1], "-Iinclude/app");
        assert!(
            args.windows(2)
                .any(|w| w[0] == "-MF" && w[1] == "build/obj/app/main.c.d")
        );
        assert_eq!(args.last().map(String::as_str), Some("build/obj/app/main.c.o"));
    }

    #[test]
    fn signature_changes_with_flags() {
        let a = compile();
        let mut b = compile();
        b.flags.push("-DDEBUG".to_string());
        assert_ne!(a.signature(), b.signature());
        assert_eq!(a.signature(), compile().signature());
    }

    #[test]
    fn library_links_shared() {
        let link = LinkRequest {
            target: "math_lib".to_string(),
            kind: TargetKind::Library,
            program: "cc".to_string(),
            objects: vec![PathBuf::from("a.o")],
            library_paths: vec![],
            flags: vec![],
            libs: vec!["m".to_string()],
            artifact: PathBuf::from("build/bin/libmath.so"),
        };
        assert_eq!(
            link.args(),
            vec!["-shared", "-o", "build/bin/libmath.so", "a.o", "-lm"]
        );
    }
}
