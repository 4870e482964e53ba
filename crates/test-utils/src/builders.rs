#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use dirbuild::config::{BuildConfig, RawBuildConfig};
use dirbuild::errors::ProbeUnavailable;
use dirbuild::fs::mock::MockFileSystem;
use dirbuild::probe::{Capability, CapabilityProbe, ProbeFuture};

/// Builder for `BuildConfig` to simplify test setup.
pub struct ConfigBuilder {
    root: PathBuf,
    config: RawBuildConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("."),
            config: RawBuildConfig::default(),
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn library_suffix(mut self, suffix: &str) -> Self {
        self.config.layout.library_suffix = suffix.to_string();
        self
    }

    pub fn common(mut self, name: &str) -> Self {
        self.config.layout.common = name.to_string();
        self
    }

    pub fn cflag(mut self, flag: &str) -> Self {
        self.config.toolchain.cflags.push(flag.to_string());
        self
    }

    pub fn cc(mut self, program: &str) -> Self {
        self.config.toolchain.cc = program.to_string();
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.build.jobs = jobs;
        self
    }

    pub fn publish(mut self, publish: bool) -> Self {
        self.config.build.publish = publish;
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.build.exclude.push(pattern.to_string());
        self
    }

    pub fn package(mut self, name: &str) -> Self {
        self.config.probe.packages.push(name.to_string());
        self
    }

    pub fn build(self) -> BuildConfig {
        BuildConfig::from_raw(self.root, self.config)
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock tree rooted at `.` with the given files under the sources root.
///
/// `mock_tree(&["common/util.c", "appA/main.c"])` creates
/// `./src/common/util.c` and `./src/appA/main.c`.
pub fn mock_tree(sources: &[&str]) -> MockFileSystem {
    let fs = MockFileSystem::new();
    for rel in sources {
        fs.add_file(format!("./src/{rel}"), format!("/* {rel} */\n"));
    }
    fs
}

/// Capability probe answering from a fixed table; unknown packages are
/// unavailable.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    available: HashMap<String, Capability>,
}

impl StaticProbe {
    pub fn with(mut self, name: &str, cflags: &[&str], ldflags: &[&str]) -> Self {
        self.available.insert(
            name.to_string(),
            Capability {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                cflags: cflags.iter().map(|s| s.to_string()).collect(),
                ldflags: ldflags.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }
}

impl CapabilityProbe for StaticProbe {
    fn probe<'a>(&'a self, package: &'a str) -> ProbeFuture<'a> {
        let found = self.available.get(package).cloned();
        Box::pin(async move {
            found.ok_or_else(|| ProbeUnavailable {
                tool: package.to_string(),
                reason: "not installed".to_string(),
            })
        })
    }
}
