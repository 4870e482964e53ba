// src/graph/node.rs

//! Node and edge payloads of the build graph, plus the pure path mappings
//! (source -> object, object -> record, target -> artifact).

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::scan::SourceFile;
use crate::types::{Language, TargetKind};

/// Object compiled from exactly one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFile {
    pub path: PathBuf,
    pub source: PathBuf,
    pub language: Language,
    /// Dependency record written next to the object by the compiler.
    pub record: PathBuf,
    /// True for members of the common pool.
    pub common: bool,
}

/// An executable or library built from one sources subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub kind: TargetKind,
    pub dir: PathBuf,
    pub artifact: PathBuf,
}

impl Target {
    /// Name of the convenience link published at the project root.
    pub fn link_name(&self) -> String {
        self.artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

#[derive(Debug, Clone)]
pub enum BuildNode {
    Source(SourceFile),
    Object(ObjectFile),
    /// The single shared pool of common objects.
    CommonPool,
    Target(Target),
}

impl fmt::Display for BuildNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildNode::Source(s) => write!(f, "{}", s.path.display()),
            BuildNode::Object(o) => write!(f, "{}", o.path.display()),
            BuildNode::CommonPool => f.write_str("<common pool>"),
            BuildNode::Target(t) => write!(f, "{} ({})", t.name, t.kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEdge {
    /// source -> object
    Compiles,
    /// object -> target that exclusively owns it
    Owns,
    /// common object -> common pool
    Pools,
    /// common pool -> target
    Shares,
}

impl fmt::Display for BuildEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildEdge::Compiles => "compiles",
            BuildEdge::Owns => "owns",
            BuildEdge::Pools => "pools",
            BuildEdge::Shares => "shares",
        };
        f.write_str(s)
    }
}

fn append_extension(path: PathBuf, suffix: &str) -> PathBuf {
    let mut os: OsString = path.into_os_string();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}

/// Map a source path to its object path.
///
/// The object mirrors the source's position under the sources root and keeps
/// the full source file name, with the language suffix appended:
/// `src/app/main.c` -> `build/obj/app/main.c.o`. Returns `None` for paths
/// outside the sources root.
pub fn object_path(config: &BuildConfig, source: &Path, language: Language) -> Option<PathBuf> {
    let rel = source.strip_prefix(config.sources_root()).ok()?;
    Some(append_extension(
        config.objects_root().join(rel),
        language.object_suffix(),
    ))
}

/// Inverse of [`object_path`].
pub fn source_path(config: &BuildConfig, object: &Path) -> Option<PathBuf> {
    let rel = object.strip_prefix(config.objects_root()).ok()?;
    let name = rel.file_name()?.to_str()?;
    let stem = name.rsplit_once('.').map(|(stem, _)| stem)?;
    Language::from_path(Path::new(stem))?;
    Some(config.sources_root().join(rel.with_file_name(stem)))
}

/// Dependency record path for an object: `main.c.o` -> `main.c.d`.
pub fn record_path(object: &Path) -> PathBuf {
    object.with_extension("d")
}

/// Artifact path for a target.
///
/// - executables: `<artifacts>/<name>` plus the platform executable suffix
/// - libraries: `<artifacts>/<dll prefix><name minus suffix><dll suffix>`
pub fn artifact_path(config: &BuildConfig, name: &str, kind: TargetKind) -> PathBuf {
    use std::env::consts::{DLL_PREFIX, DLL_SUFFIX, EXE_SUFFIX};

    let file = match kind {
        TargetKind::Executable => format!("{name}{EXE_SUFFIX}"),
        TargetKind::Library => {
            let stem = name
                .strip_suffix(config.layout.library_suffix.as_str())
                .unwrap_or(name);
            format!("{DLL_PREFIX}{stem}{DLL_SUFFIX}")
        }
    };
    config.artifacts_root().join(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawBuildConfig;

    fn config() -> BuildConfig {
        BuildConfig::from_raw(".", RawBuildConfig::default()).unwrap()
    }

    #[test]
    fn object_path_appends_suffix() {
        let cfg = config();
        let obj = object_path(&cfg, Path::new("./src/app/main.c"), Language::C).unwrap();
        assert_eq!(obj, PathBuf::from("./build/obj/app/main.c.o"));
        assert_eq!(record_path(&obj), PathBuf::from("./build/obj/app/main.c.d"));
    }

    #[test]
    fn same_stem_different_language_does_not_collide() {
        let cfg = config();
        let c = object_path(&cfg, Path::new("./src/app/x.c"), Language::C).unwrap();
        let cpp = object_path(&cfg, Path::new("./src/app/x.cpp"), Language::Cxx).unwrap();
        assert_ne!(c, cpp);
    }

    #[test]
    fn mapping_is_reversible() {
        let cfg = config();
        let src = PathBuf::from("./src/common/net/io.cpp");
        let obj = object_path(&cfg, &src, Language::Cxx).unwrap();
        assert_eq!(source_path(&cfg, &obj), Some(src));
    }

    #[test]
    fn outside_sources_has_no_object() {
        let cfg = config();
        assert_eq!(object_path(&cfg, Path::new("./tools/gen.c"), Language::C), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn library_artifact_drops_suffix() {
        let cfg = config();
        assert_eq!(
            artifact_path(&cfg, "math_lib", TargetKind::Library),
            PathBuf::from("./build/bin/libmath.so")
        );
        assert_eq!(
            artifact_path(&cfg, "app", TargetKind::Executable),
            PathBuf::from("./build/bin/app")
        );
    }
}
