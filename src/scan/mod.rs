// src/scan/mod.rs

//! Project scanner.
//!
//! Turns the directory convention into plain data:
//!
//! ```text
//! src/common/**      -> common pool sources
//! src/<name>/**      -> sources of executable target <name>
//! src/<name>_lib/**  -> sources of library target <name>_lib
//! include/<dir>      -> include path
//! lib/<dir>          -> library search path
//! ```
//!
//! Scanning only reads the filesystem. A missing or unreadable sources root
//! is fatal; missing include/library roots simply yield no paths.

pub mod patterns;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::errors::{DirbuildError, Result};
use crate::fs::FileSystem;
use crate::report::Diagnostic;
use crate::types::{Language, TargetKind};

pub use patterns::ExcludeSet;

/// A compilable source discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
    /// Name of the depth-1 directory under the sources root that contains
    /// this file, or `None` for files directly in the sources root.
    pub owner: Option<String>,
}

/// A depth-1 sources subdirectory that is a target candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDir {
    pub name: String,
    pub kind: TargetKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectScan {
    /// All compilable sources, sorted by path.
    pub sources: Vec<SourceFile>,
    /// Name of the common directory (its sources have this owner).
    pub common_name: String,
    /// Target candidates, sorted by name. Never contains the common directory.
    pub targets: Vec<TargetDir>,
    pub include_paths: Vec<PathBuf>,
    pub library_paths: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProjectScan {
    /// Sources owned by the given depth-1 directory.
    pub fn sources_of<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a SourceFile> + 'a {
        self.sources
            .iter()
            .filter(move |s| s.owner.as_deref() == Some(owner))
    }

    pub fn common_sources(&self) -> impl Iterator<Item = &SourceFile> + '_ {
        self.sources_of(&self.common_name)
    }
}

/// Classify a depth-1 directory name.
///
/// Returns `None` when the name is exactly the suffix: such a directory has
/// no stem to name the library after.
pub fn classify_dir(name: &str, library_suffix: &str) -> Option<TargetKind> {
    match name.strip_suffix(library_suffix) {
        Some("") => None,
        Some(_) => Some(TargetKind::Library),
        None => Some(TargetKind::Executable),
    }
}

/// Scan the project described by `config`.
pub fn scan_project(fs: &dyn FileSystem, config: &BuildConfig) -> Result<ProjectScan> {
    let sources_root = config.sources_root();
    if !fs.is_dir(&sources_root) {
        return Err(DirbuildError::scan(
            &sources_root,
            "sources root does not exist or is not a directory",
        ));
    }

    let exclude = ExcludeSet::new(&config.build.exclude)?;
    let common_name = config.layout.common.clone();
    let suffix = &config.layout.library_suffix;

    let mut scan = ProjectScan {
        common_name: common_name.clone(),
        ..ProjectScan::default()
    };

    for entry in sorted_entries(fs, &sources_root)? {
        let Some(name) = visible_name(&entry) else {
            continue;
        };

        if fs.is_dir(&entry) {
            let Some(name) = name.to_str().map(str::to_string) else {
                scan.diagnostics.push(Diagnostic::MalformedTargetDir {
                    dir: entry.clone(),
                    reason: "directory name is not valid UTF-8".to_string(),
                });
                continue;
            };

            collect_sources(fs, &sources_root, &entry, &name, &exclude, &mut scan.sources)?;

            if name == common_name {
                continue;
            }
            match classify_dir(&name, suffix) {
                Some(kind) => scan.targets.push(TargetDir {
                    name,
                    kind,
                    path: entry,
                }),
                None => scan.diagnostics.push(Diagnostic::MalformedTargetDir {
                    dir: entry,
                    reason: format!("name is only the library suffix '{suffix}'"),
                }),
            }
        } else if fs.is_file(&entry) {
            if let Some(language) = Language::from_path(&entry) {
                if is_excluded(&exclude, &sources_root, &entry) {
                    continue;
                }
                scan.diagnostics.push(Diagnostic::StraySource {
                    path: entry.clone(),
                });
                scan.sources.push(SourceFile {
                    path: entry,
                    language,
                    owner: None,
                });
            }
        }
    }

    scan.sources.sort_by(|a, b| a.path.cmp(&b.path));
    scan.targets.sort_by(|a, b| a.name.cmp(&b.name));
    scan.include_paths = immediate_subdirs(fs, &config.include_root())?;
    scan.library_paths = immediate_subdirs(fs, &config.libraries_root())?;

    info!(
        sources = scan.sources.len(),
        targets = scan.targets.len(),
        include_paths = scan.include_paths.len(),
        library_paths = scan.library_paths.len(),
        "scanned project tree"
    );

    Ok(scan)
}

/// Recursively collect compilable sources under `dir`, attributing them to `owner`.
fn collect_sources(
    fs: &dyn FileSystem,
    sources_root: &Path,
    dir: &Path,
    owner: &str,
    exclude: &ExcludeSet,
    out: &mut Vec<SourceFile>,
) -> Result<()> {
    let mut stack = vec![dir.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in sorted_entries(fs, &dir)? {
            if visible_name(&path).is_none() {
                continue;
            }
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                let Some(language) = Language::from_path(&path) else {
                    continue;
                };
                if is_excluded(exclude, sources_root, &path) {
                    debug!(path = ?path, "source excluded by pattern");
                    continue;
                }
                out.push(SourceFile {
                    path,
                    language,
                    owner: Some(owner.to_string()),
                });
            }
        }
    }

    Ok(())
}

fn is_excluded(exclude: &ExcludeSet, sources_root: &Path, path: &Path) -> bool {
    match path.strip_prefix(sources_root) {
        Ok(rel) => exclude.matches(&rel.to_string_lossy().replace('\\', "/")),
        Err(_) => false,
    }
}

/// Immediate subdirectories of an optional root. Missing root means no paths.
fn immediate_subdirs(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(root) {
        debug!(root = ?root, "optional root absent; no search paths");
        return Ok(Vec::new());
    }
    let dirs = sorted_entries(fs, root)?
        .into_iter()
        .filter(|p| visible_name(p).is_some() && fs.is_dir(p))
        .collect();
    Ok(dirs)
}

fn sorted_entries(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs
        .read_dir(dir)
        .map_err(|e| DirbuildError::scan(dir, format!("{e:#}")))?;
    entries.sort();
    Ok(entries)
}

/// File name of `path` unless it is hidden (dot-prefixed).
fn visible_name(path: &Path) -> Option<&std::ffi::OsStr> {
    let name = path.file_name()?;
    if name.to_string_lossy().starts_with('.') {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawBuildConfig;
    use crate::fs::mock::MockFileSystem;

    fn config() -> BuildConfig {
        BuildConfig::from_raw(".", RawBuildConfig::default()).unwrap()
    }

    #[test]
    fn classify_by_suffix() {
        assert_eq!(classify_dir("math_lib", "_lib"), Some(TargetKind::Library));
        assert_eq!(classify_dir("app", "_lib"), Some(TargetKind::Executable));
        assert_eq!(classify_dir("lib_tools", "_lib"), Some(TargetKind::Executable));
        assert_eq!(classify_dir("_lib", "_lib"), None);
    }

    #[test]
    fn missing_sources_root_is_fatal() {
        let fs = MockFileSystem::new();
        let err = scan_project(&fs, &config()).unwrap_err();
        assert!(matches!(err, DirbuildError::ScanError { .. }));
    }

    #[test]
    fn nested_sources_belong_to_their_top_directory() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/app/main.c", "");
        fs.add_file("./src/app/net/socket.cpp", "");
        fs.add_file("./src/app/net/socket.h", "");
        fs.add_file("./src/app/.cache/junk.c", "");

        let scan = scan_project(&fs, &config()).unwrap();
        let owned: Vec<_> = scan.sources_of("app").map(|s| s.path.clone()).collect();
        assert_eq!(
            owned,
            vec![
                PathBuf::from("./src/app/main.c"),
                PathBuf::from("./src/app/net/socket.cpp"),
            ]
        );
    }

    #[test]
    fn empty_optional_roots_yield_no_paths() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/app/main.c", "");
        fs.add_file("./include/readme.txt", "");

        let scan = scan_project(&fs, &config()).unwrap();
        assert!(scan.include_paths.is_empty());
        assert!(scan.library_paths.is_empty());
    }
}
