// src/publish/mod.rs

//! Artifact publisher: convenience links at the project root and `clean`.

use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::fs::FileSystem;
use crate::graph::BuildGraph;
use crate::report::{BuildReport, Diagnostic};

/// Create (or refresh) `<root>/<link_name>` pointing at `artifact`.
///
/// The link is relative when the artifact lives under the root, so the tree
/// can be moved. An existing symlink is replaced; anything else is left
/// alone and reported as an error.
pub fn publish_link(
    fs: &dyn FileSystem,
    root: &Path,
    artifact: &Path,
    link_name: &str,
) -> Result<PathBuf> {
    let link = root.join(link_name);

    if fs.is_symlink(&link) {
        fs.remove_file(&link)?;
    } else if fs.exists(&link) {
        bail!("{:?} exists and is not a symlink; refusing to replace it", link);
    }

    let target = relative_to(artifact, root).unwrap_or_else(|| artifact.to_path_buf());
    fs.symlink(&target, &link)?;
    debug!(link = ?link, target = ?target, "published artifact link");
    Ok(link)
}

/// Publish every target that ended the run with a usable artifact.
pub fn publish_targets(
    fs: &dyn FileSystem,
    config: &BuildConfig,
    graph: &BuildGraph,
    report: &mut BuildReport,
) {
    for (_, target) in graph.targets() {
        if report.failed_targets.contains_key(&target.name) || !fs.exists(&target.artifact) {
            continue;
        }
        if let Err(e) = publish_link(fs, config.root(), &target.artifact, &target.link_name()) {
            report.push(Diagnostic::PublishFailed {
                target: target.name.clone(),
                reason: format!("{e:#}"),
            });
        }
    }
}

/// What `clean` removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub removed_dirs: Vec<PathBuf>,
    pub removed_links: Vec<PathBuf>,
}

/// Remove the object cache, the artifact directory and the published links.
///
/// Links are found by artifact file name, so no scan of the sources is
/// needed and `clean` works on a broken tree.
pub fn clean(fs: &dyn FileSystem, config: &BuildConfig) -> Result<CleanSummary> {
    let mut summary = CleanSummary::default();
    let artifacts = config.artifacts_root();

    if fs.is_dir(&artifacts) {
        for entry in fs.read_dir(&artifacts)? {
            let Some(name) = entry.file_name() else {
                continue;
            };
            let link = config.root().join(name);
            if fs.is_symlink(&link) {
                fs.remove_file(&link)?;
                summary.removed_links.push(link);
            }
        }
    }

    for dir in [config.objects_root(), artifacts] {
        if fs.is_dir(&dir) {
            fs.remove_dir_all(&dir)?;
            summary.removed_dirs.push(dir);
        }
    }

    info!(
        dirs = summary.removed_dirs.len(),
        links = summary.removed_links.len(),
        "clean finished"
    );
    Ok(summary)
}

/// `path` relative to `base`, when it lives under it.
fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    let rel = path.strip_prefix(base).ok()?;
    let cleaned: PathBuf = rel
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    Some(cleaned)
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
    fn links_are_relative_and_refreshed() {
        let fs = MockFileSystem::new();
        fs.add_file("./build/bin/app", "exe");

        let link = publish_link(&fs, Path::new("."), Path::new("./build/bin/app"), "app").unwrap();
        assert_eq!(link, PathBuf::from("./app"));
        assert_eq!(fs.link_target("./app"), Some(PathBuf::from("build/bin/app")));

        // Second publish replaces the link instead of failing.
        publish_link(&fs, Path::new("."), Path::new("./build/bin/app"), "app").unwrap();
    }

    #[test]
    fn regular_files_are_never_replaced() {
        let fs = MockFileSystem::new();
        fs.add_file("./app", "my notes");
        let err = publish_link(&fs, Path::new("."), Path::new("./build/bin/app"), "app");
        assert!(err.is_err());
        assert_eq!(fs.read_to_string(Path::new("./app")).unwrap(), "my notes");
    }

    #[test]
    fn clean_removes_generated_state_only() {
        let fs = MockFileSystem::new();
        let cfg = config();
        fs.add_file("./src/app/main.c", "");
        fs.add_file("./build/obj/app/main.c.o", "");
        fs.add_file("./build/bin/app", "");
        fs.symlink(Path::new("build/bin/app"), Path::new("./app")).unwrap();

        let summary = clean(&fs, &cfg).unwrap();

        assert_eq!(summary.removed_links, vec![PathBuf::from("./app")]);
        assert_eq!(summary.removed_dirs.len(), 2);
        assert!(!fs.exists(Path::new("./build/obj")));
        assert!(!fs.exists(Path::new("./build/bin")));
        assert!(!fs.is_symlink(Path::new("./app")));
        assert!(fs.exists(Path::new("./src/app/main.c")));

        // Nothing left to clean is not an error.
        assert_eq!(clean(&fs, &cfg).unwrap(), CleanSummary::default());
    }
}
