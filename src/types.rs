// src/types.rs

use std::fmt;
use std::path::Path;

/// Source language, decided purely by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    C,
    Cxx,
    /// Assembly, preprocessed and assembled through the C driver.
    Asm,
}

impl Language {
    /// Classify a path by its extension. Returns `None` for anything that is
    /// not a compilable source (headers included).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "c" => Some(Language::C),
            "cc" | "cpp" | "cxx" | "c++" | "C" => Some(Language::Cxx),
            "s" | "S" => Some(Language::Asm),
            _ => None,
        }
    }

    /// Suffix appended (never substituted) to the source file name to form
    /// the object file name.
    pub fn object_suffix(self) -> &'static str {
        match self {
            Language::C | Language::Cxx | Language::Asm => "o",
        }
    }

    pub fn is_cxx(self) -> bool {
        matches!(self, Language::Cxx)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::C => "c",
            Language::Cxx => "c++",
            Language::Asm => "asm",
        };
        f.write_str(s)
    }
}

/// What a target directory produces.
///
/// - `Executable`: every source subdirectory not carrying the library suffix.
/// - `Library`: a shared library; the directory name ends with the reserved
///   suffix (`_lib` by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Executable,
    Library,
}

impl TargetKind {
    pub fn is_library(self) -> bool {
        matches!(self, TargetKind::Library)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Executable => f.write_str("executable"),
            TargetKind::Library => f.write_str("library"),
        }
    }
}
