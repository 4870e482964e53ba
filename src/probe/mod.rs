// src/probe/mod.rs

//! Capability probe.
//!
//! Runs once per invocation, before the graph is built, and folds every
//! available optional package into a single [`FlagSet`] that the planner
//! applies to every compile and link request. A missing package is a
//! warning, never an error.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::ProbeUnavailable;
use crate::report::Diagnostic;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(\.\d+)*([-+~][0-9A-Za-z.+~-]+)?$").expect("valid version regex")
});

static NON_IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid identifier regex"));

/// What a probe learned about one available package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: String,
    pub version: String,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
}

impl Capability {
    /// Preprocessor define announcing the capability: `zlib` -> `-DHAVE_ZLIB=1`.
    pub fn define(&self) -> String {
        let ident = NON_IDENT_RE.replace_all(&self.name, "_");
        format!("-DHAVE_{}=1", ident.trim_matches('_').to_uppercase())
    }
}

/// Extra flags contributed by probed capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    /// Names of available capabilities.
    pub enabled: Vec<String>,
    /// Names of requested capabilities that were unavailable.
    pub unsupported: Vec<String>,
}

impl FlagSet {
    pub fn add(&mut self, capability: &Capability) {
        self.cflags.push(capability.define());
        self.cflags.extend(capability.cflags.iter().cloned());
        self.ldflags.extend(capability.ldflags.iter().cloned());
        self.enabled.push(capability.name.clone());
    }
}

pub type ProbeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Capability, ProbeUnavailable>> + Send + 'a>>;

/// Query for an optional package.
pub trait CapabilityProbe: Send + Sync {
    fn probe<'a>(&'a self, package: &'a str) -> ProbeFuture<'a>;
}

/// Probe every package and merge the results.
pub async fn collect_flags(
    probe: &dyn CapabilityProbe,
    packages: &[String],
) -> (FlagSet, Vec<Diagnostic>) {
    let mut flags = FlagSet::default();
    let mut diagnostics = Vec::new();

    for package in packages {
        match probe.probe(package).await {
            Ok(capability) => {
                info!(
                    package = %capability.name,
                    version = %capability.version,
                    "optional capability enabled"
                );
                flags.add(&capability);
            }
            Err(unavailable) => {
                flags.unsupported.push(package.clone());
                diagnostics.push(Diagnostic::ProbeUnavailable(unavailable));
            }
        }
    }

    (flags, diagnostics)
}

/// Probe backed by `pkg-config`.
#[derive(Debug, Clone)]
pub struct PkgConfigProbe {
    program: String,
}

impl PkgConfigProbe {
    pub fn new() -> Self {
        Self {
            program: "pkg-config".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn query(&self, package: &str, flag: &str) -> Result<String, ProbeUnavailable> {
        let unavailable = |reason: String| ProbeUnavailable {
            tool: package.to_string(),
            reason,
        };

        let output = Command::new(&self.program)
            .arg(flag)
            .arg(package)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| unavailable(format!("could not run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.trim();
            return Err(unavailable(if reason.is_empty() {
                format!("{} {flag} exited with {}", self.program, output.status)
            } else {
                reason.to_string()
            }));
        }

        String::from_utf8(output.stdout)
            .map(|s| s.trim().to_string())
            .map_err(|_| unavailable(format!("{} {flag} printed non-UTF-8 output", self.program)))
    }
}

impl Default for PkgConfigProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProbe for PkgConfigProbe {
    fn probe<'a>(&'a self, package: &'a str) -> ProbeFuture<'a> {
        Box::pin(async move {
            let version = self.query(package, "--modversion").await?;
            if !VERSION_RE.is_match(&version) {
                return Err(ProbeUnavailable {
                    tool: package.to_string(),
                    reason: format!("unrecognised version string '{version}'"),
                });
            }

            let cflags = self.query(package, "--cflags").await?;
            let ldflags = self.query(package, "--libs").await?;
            debug!(package, %version, %cflags, %ldflags, "pkg-config answered");

            Ok(Capability {
                name: package.to_string(),
                version,
                cflags: split_flags(&cflags),
                ldflags: split_flags(&ldflags),
            })
        })
    }
}

fn split_flags(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TableProbe(HashMap<&'static str, Capability>);

    impl CapabilityProbe for TableProbe {
        fn probe<'a>(&'a self, package: &'a str) -> ProbeFuture<'a> {
            let found = self.0.get(package).cloned();
            Box::pin(async move {
                found.ok_or_else(|| ProbeUnavailable {
                    tool: package.to_string(),
                    reason: "not installed".to_string(),
                })
            })
        }
    }

    fn zlib() -> Capability {
        Capability {
            name: "zlib".to_string(),
            version: "1.3.1".to_string(),
            cflags: vec!["-I/opt/zlib/include".to_string()],
            ldflags: vec!["-lz".to_string()],
        }
    }

    #[test]
    fn defines_are_sanitised() {
        let mut cap = zlib();
        assert_eq!(cap.define(), "-DHAVE_ZLIB=1");
        cap.name = "gtk+-3.0".to_string();
        assert_eq!(cap.define(), "-DHAVE_GTK_3_0=1");
    }

    #[test]
    fn version_pattern() {
        for ok in ["1", "1.2.13", "3.0.2-beta", "2.1+git"] {
            assert!(VERSION_RE.is_match(ok), "{ok}");
        }
        for bad in ["", "v1.2", "1..2", "unknown"] {
            assert!(!VERSION_RE.is_match(bad), "{bad}");
        }
    }

    #[tokio::test]
    async fn missing_pkg_config_means_unavailable() {
        let probe = PkgConfigProbe::with_program("dirbuild-no-such-pkg-config");
        let err = probe.probe("zlib").await.unwrap_err();
        assert_eq!(err.tool, "zlib");
        assert!(err.reason.contains("could not run dirbuild-no-such-pkg-config"), "{}", err.reason);

        let (flags, diagnostics) = collect_flags(&probe, &["zlib".to_string()]).await;
        assert!(flags.cflags.is_empty());
        assert_eq!(flags.unsupported, vec!["zlib".to_string()]);
        assert!(matches!(&diagnostics[..], [Diagnostic::ProbeUnavailable(_)]));
    }

    #[tokio::test]
    async fn unavailable_packages_degrade_to_warnings() {
        let probe = TableProbe([("zlib", zlib())].into_iter().collect());
        let packages = vec!["zlib".to_string(), "libfoo".to_string()];

        let (flags, diagnostics) = collect_flags(&probe, &packages).await;

        assert_eq!(flags.enabled, vec!["zlib".to_string()]);
        assert_eq!(flags.unsupported, vec!["libfoo".to_string()]);
        assert_eq!(
            flags.cflags,
            vec!["-DHAVE_ZLIB=1".to_string(), "-I/opt/zlib/include".to_string()]
        );
        assert_eq!(flags.ldflags, vec!["-lz".to_string()]);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(&diagnostics[0], Diagnostic::ProbeUnavailable(p) if p.tool == "libfoo"));
    }
}
