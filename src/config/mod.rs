// src/config/mod.rs

//! Configuration loading and validation for dirbuild.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate layout and pattern invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, DEFAULT_CONFIG_FILE};
pub use model::{
    BuildConfig, BuildSection, LayoutSection, ProbeSection, RawBuildConfig, ToolchainSection,
};
pub use validate::validate_config;
