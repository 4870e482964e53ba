// src/errors.rs

//! Crate-wide error types.
//!
//! [`DirbuildError`] covers everything that aborts an invocation. The other
//! types are per-action failures: they are recorded against one object or
//! target and collected into the final report instead of stopping the build.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirbuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cannot scan source tree at {path:?}: {reason}")]
    ScanError { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DirbuildError {
    pub fn scan(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ScanError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A single source file failed to compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to compile {file:?}: {message}")]
pub struct CompileError {
    pub file: PathBuf,
    pub message: String,
}

/// A target failed to link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to link target '{target}': {message}")]
pub struct LinkError {
    pub target: String,
    pub message: String,
}

/// An optional capability could not be probed; the build continues without it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("capability '{tool}' unavailable: {reason}")]
pub struct ProbeUnavailable {
    pub tool: String,
    pub reason: String,
}

/// Why a dependency record could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("record {path:?} is missing")]
    Missing { path: PathBuf },

    #[error("record {path:?} is unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("record {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DirbuildError>;
