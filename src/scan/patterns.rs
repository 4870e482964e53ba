// src/scan/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled `[build].exclude` patterns.
///
/// Patterns are relative to the sources root; the scanner passes relative
/// paths such as `"app/scratch/try.c"` into [`ExcludeSet::matches`].
#[derive(Clone)]
pub struct ExcludeSet {
    set: Option<GlobSet>,
}

impl fmt::Debug for ExcludeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcludeSet")
            .field("len", &self.set.as_ref().map(|s| s.len()).unwrap_or(0))
            .finish()
    }
}

impl ExcludeSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self { set: None });
        }
        let set = build_globset(patterns).context("building exclude globset")?;
        Ok(Self { set: Some(set) })
    }

    /// Returns true if the path (relative to the sources root, `/`-separated)
    /// is excluded.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.set
            .as_ref()
            .map(|set| set.is_match(rel_path))
            .unwrap_or(false)
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
