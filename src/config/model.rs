// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration as read from `Dirbuild.toml`.
///
/// ```toml
/// [layout]
/// sources = "src"
/// common = "common"
/// library_suffix = "_lib"
///
/// [toolchain]
/// cc = "clang"
/// cflags = ["-Wall", "-O2", "-fPIC"]
/// libs = ["m"]
///
/// [build]
/// jobs = 8
/// exclude = ["**/*_scratch.c"]
///
/// [probe]
/// packages = ["zlib"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBuildConfig {
    #[serde(default)]
    pub layout: LayoutSection,

    #[serde(default)]
    pub toolchain: ToolchainSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub probe: ProbeSection,
}

/// `[layout]` section: the five-root directory convention.
///
/// Every path is relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutSection {
    /// Root of all compilable sources. Each immediate subdirectory is a target.
    #[serde(default = "default_sources")]
    pub sources: PathBuf,

    /// Name of the subdirectory of `sources` holding code linked into every target.
    #[serde(default = "default_common")]
    pub common: String,

    /// Directory-name suffix marking a target as a shared library.
    #[serde(default = "default_library_suffix")]
    pub library_suffix: String,

    /// Include root; each immediate subdirectory becomes a `-I` path.
    #[serde(default = "default_include")]
    pub include: PathBuf,

    /// Library-search root; each immediate subdirectory becomes a `-L` path.
    #[serde(default = "default_libraries")]
    pub libraries: PathBuf,

    /// Object cache root (objects plus dependency records).
    #[serde(default = "default_objects")]
    pub objects: PathBuf,

    /// Where linked executables and libraries are written.
    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,
}

fn default_sources() -> PathBuf {
    PathBuf::from("src")
}

fn default_common() -> String {
    "common".to_string()
}

fn default_library_suffix() -> String {
    "_lib".to_string()
}

fn default_include() -> PathBuf {
    PathBuf::from("include")
}

fn default_libraries() -> PathBuf {
    PathBuf::from("lib")
}

fn default_objects() -> PathBuf {
    PathBuf::from("build/obj")
}

fn default_artifacts() -> PathBuf {
    PathBuf::from("build/bin")
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            common: default_common(),
            library_suffix: default_library_suffix(),
            include: default_include(),
            libraries: default_libraries(),
            objects: default_objects(),
            artifacts: default_artifacts(),
        }
    }
}

/// `[toolchain]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainSection {
    /// C compiler driver; also used for assembly and for linking pure-C targets.
    #[serde(default = "default_cc")]
    pub cc: String,

    /// C++ compiler driver; used to link any target containing C++ objects.
    #[serde(default = "default_cxx")]
    pub cxx: String,

    #[serde(default = "default_compile_flags")]
    pub cflags: Vec<String>,

    #[serde(default = "default_compile_flags")]
    pub cxxflags: Vec<String>,

    #[serde(default)]
    pub asflags: Vec<String>,

    #[serde(default)]
    pub ldflags: Vec<String>,

    /// Library names linked into every executable (`-l<name>`).
    #[serde(default)]
    pub libs: Vec<String>,
}

fn default_cc() -> String {
    "cc".to_string()
}

fn default_cxx() -> String {
    "c++".to_string()
}

fn default_compile_flags() -> Vec<String> {
    vec!["-Wall".to_string(), "-O2".to_string(), "-fPIC".to_string()]
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            cc: default_cc(),
            cxx: default_cxx(),
            cflags: default_compile_flags(),
            cxxflags: default_compile_flags(),
            asflags: Vec::new(),
            ldflags: Vec::new(),
            libs: Vec::new(),
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Maximum concurrent compile/link actions. `0` means one per CPU.
    #[serde(default)]
    pub jobs: usize,

    /// Create convenience links to artifacts at the project root.
    #[serde(default = "default_publish")]
    pub publish: bool,

    /// Glob patterns (relative to the sources root) of files that are never
    /// treated as compilable sources.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_publish() -> bool {
    true
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            jobs: 0,
            publish: default_publish(),
            exclude: Vec::new(),
        }
    }
}

/// `[probe]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSection {
    /// Optional packages queried through the capability probe.
    #[serde(default)]
    pub packages: Vec<String>,
}

/// Validated, immutable configuration for one project tree.
///
/// Construct through [`BuildConfig::from_raw`] (or the loader); the value is
/// then passed by reference to every component, so several trees can be
/// built from the same process.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    root: PathBuf,
    pub layout: LayoutSection,
    pub toolchain: ToolchainSection,
    pub build: BuildSection,
    pub probe: ProbeSection,
}

impl BuildConfig {
    pub(crate) fn new_unchecked(root: PathBuf, raw: RawBuildConfig) -> Self {
        Self {
            root,
            layout: raw.layout,
            toolchain: raw.toolchain,
            build: raw.build,
            probe: raw.probe,
        }
    }

    /// Project root every layout path is relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sources_root(&self) -> PathBuf {
        self.root.join(&self.layout.sources)
    }

    pub fn include_root(&self) -> PathBuf {
        self.root.join(&self.layout.include)
    }

    pub fn libraries_root(&self) -> PathBuf {
        self.root.join(&self.layout.libraries)
    }

    pub fn objects_root(&self) -> PathBuf {
        self.root.join(&self.layout.objects)
    }

    pub fn artifacts_root(&self) -> PathBuf {
        self.root.join(&self.layout.artifacts)
    }

    /// Effective worker count: `jobs`, or the available parallelism when 0.
    pub fn effective_jobs(&self) -> usize {
        if self.build.jobs > 0 {
            return self.build.jobs;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Return a copy with `jobs` overridden (used for the `--jobs` flag).
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        if let Some(jobs) = jobs {
            self.build.jobs = jobs;
        }
        self
    }
}
