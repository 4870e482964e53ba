// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{BuildConfig, RawBuildConfig};
use crate::errors::Result;

/// File name looked up at the project root when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "Dirbuild.toml";

/// Load a configuration file from a given path and return the raw `RawBuildConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBuildConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawBuildConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load the configuration for the project at `root` and validate it.
///
/// - `explicit` is the `--config` path. It must exist when given.
/// - Otherwise `<root>/Dirbuild.toml` is used if present.
/// - With neither, every section takes its defaults.
pub fn load_and_validate(root: impl AsRef<Path>, explicit: Option<&Path>) -> Result<BuildConfig> {
    let root = root.as_ref();

    let raw = match explicit {
        Some(path) => load_from_path(path)?,
        None => {
            let candidate = default_config_path(root);
            if candidate.is_file() {
                load_from_path(&candidate)?
            } else {
                debug!(path = ?candidate, "no config file; using defaults");
                RawBuildConfig::default()
            }
        }
    };

    BuildConfig::from_raw(root, raw)
}

pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(DEFAULT_CONFIG_FILE)
}
