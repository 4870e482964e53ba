// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::model::{BuildConfig, RawBuildConfig};
use crate::errors::{DirbuildError, Result};

impl BuildConfig {
    /// Validate a raw config and bind it to a project root.
    pub fn from_raw(root: impl Into<PathBuf>, raw: RawBuildConfig) -> Result<Self> {
        validate_raw_config(&raw)?;
        Ok(BuildConfig::new_unchecked(root.into(), raw))
    }
}

pub fn validate_config(cfg: &RawBuildConfig) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawBuildConfig) -> Result<()> {
    validate_reserved_names(cfg)?;
    validate_roots(cfg)?;
    validate_excludes(cfg)?;
    Ok(())
}

fn validate_reserved_names(cfg: &RawBuildConfig) -> Result<()> {
    ensure_single_segment("[layout].common", &cfg.layout.common)?;
    ensure_single_segment("[layout].library_suffix", &cfg.layout.library_suffix)?;

    if cfg.layout.common.ends_with(&cfg.layout.library_suffix) {
        return Err(DirbuildError::ConfigError(format!(
            "[layout].common '{}' must not end with the library suffix '{}'",
            cfg.layout.common, cfg.layout.library_suffix
        )));
    }
    Ok(())
}

fn ensure_single_segment(key: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(DirbuildError::ConfigError(format!("{key} must not be empty")));
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(DirbuildError::ConfigError(format!(
            "{key} must be a plain directory name (got '{value}')"
        )));
    }
    Ok(())
}

fn validate_roots(cfg: &RawBuildConfig) -> Result<()> {
    let sources = normalize(&cfg.layout.sources);
    let objects = normalize(&cfg.layout.objects);
    let artifacts = normalize(&cfg.layout.artifacts);

    if sources.as_os_str().is_empty() {
        return Err(DirbuildError::ConfigError(
            "[layout].sources must not be the project root itself".to_string(),
        ));
    }

    for (key, path) in [("objects", &objects), ("artifacts", &artifacts)] {
        if path.as_os_str().is_empty() {
            return Err(DirbuildError::ConfigError(format!(
                "[layout].{key} must not be the project root itself"
            )));
        }
        if path.starts_with(&sources) || sources.starts_with(path) {
            return Err(DirbuildError::ConfigError(format!(
                "[layout].{key} ({:?}) must not overlap the sources root ({:?})",
                path, sources
            )));
        }
    }

    if objects == artifacts {
        return Err(DirbuildError::ConfigError(format!(
            "[layout].objects and [layout].artifacts must differ (both {:?})",
            objects
        )));
    }

    Ok(())
}

fn validate_excludes(cfg: &RawBuildConfig) -> Result<()> {
    for pattern in &cfg.build.exclude {
        Glob::new(pattern).map_err(|e| {
            DirbuildError::ConfigError(format!("invalid [build].exclude pattern '{pattern}': {e}"))
        })?;
    }
    Ok(())
}

/// Lexically drop `.` components so `./src` and `src` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawBuildConfig {
        RawBuildConfig::default()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&raw()).is_ok());
    }

    #[test]
    fn rejects_empty_library_suffix() {
        let mut cfg = raw();
        cfg.layout.library_suffix = String::new();
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("library_suffix"));
    }

    #[test]
    fn rejects_nested_common_dir() {
        let mut cfg = raw();
        cfg.layout.common = "shared/common".to_string();
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_object_cache_inside_sources() {
        let mut cfg = raw();
        cfg.layout.objects = PathBuf::from("./src/.obj");
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn rejects_shared_object_and_artifact_roots() {
        let mut cfg = raw();
        cfg.layout.objects = PathBuf::from("out");
        cfg.layout.artifacts = PathBuf::from("./out");
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn rejects_bad_exclude_glob() {
        let mut cfg = raw();
        cfg.build.exclude = vec!["src/[".to_string()];
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, DirbuildError::ConfigError(_)));
    }
}
