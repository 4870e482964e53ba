use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use dirbuild::errors::{CompileError, LinkError};
use dirbuild::exec::{ToolFuture, Toolchain};
use dirbuild::fs::FileSystem;
use dirbuild::fs::mock::MockFileSystem;
use dirbuild::plan::{CompileRequest, LinkRequest};

/// A fake compiler/linker that:
/// - writes objects, dependency records and artifacts into a `MockFileSystem`
/// - records which sources were compiled and which targets were linked
/// - fails chosen sources/targets after leaving a partial output behind
/// - can behave like a driver that writes no record (`.s` under gcc).
#[derive(Debug, Default)]
pub struct FakeToolchain {
    fs: MockFileSystem,
    state: Mutex<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    headers: HashMap<PathBuf, Vec<PathBuf>>,
    failing_sources: HashSet<PathBuf>,
    failing_targets: HashSet<String>,
    recordless_sources: HashSet<PathBuf>,
    compiled: Vec<PathBuf>,
    linked: Vec<String>,
    compile_requests: Vec<CompileRequest>,
}

impl FakeToolchain {
    pub fn new(fs: &MockFileSystem) -> Self {
        Self {
            fs: fs.clone(),
            state: Mutex::new(FakeState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Headers the given source includes; written into its record.
    pub fn set_headers(&self, source: impl AsRef<Path>, headers: &[&str]) {
        self.lock().headers.insert(
            source.as_ref().to_path_buf(),
            headers.iter().map(PathBuf::from).collect(),
        );
    }

    pub fn fail_source(&self, source: impl AsRef<Path>) {
        self.lock().failing_sources.insert(source.as_ref().to_path_buf());
    }

    pub fn heal_source(&self, source: impl AsRef<Path>) {
        self.lock().failing_sources.remove(source.as_ref());
    }

    /// Compile `source` without writing its dependency record.
    pub fn omit_record(&self, source: impl AsRef<Path>) {
        self.lock()
            .recordless_sources
            .insert(source.as_ref().to_path_buf());
    }

    pub fn fail_target(&self, target: &str) {
        self.lock().failing_targets.insert(target.to_string());
    }

    /// Successfully compiled sources, in completion order.
    pub fn compiled(&self) -> Vec<PathBuf> {
        self.lock().compiled.clone()
    }

    /// Successfully linked targets, in completion order.
    pub fn linked(&self) -> Vec<String> {
        self.lock().linked.clone()
    }

    /// Every compile request received (including failing ones).
    pub fn compile_requests(&self) -> Vec<CompileRequest> {
        self.lock().compile_requests.clone()
    }

    /// Forget what was compiled/linked so far (failure settings are kept).
    pub fn reset_log(&self) {
        let mut state = self.lock();
        state.compiled.clear();
        state.linked.clear();
        state.compile_requests.clear();
    }

    fn compile_now(&self, request: &CompileRequest) -> Result<(), CompileError> {
        let (fails, writes_record, headers) = {
            let mut state = self.lock();
            state.compile_requests.push(request.clone());
            (
                state.failing_sources.contains(&request.source),
                !state.recordless_sources.contains(&request.source),
                state.headers.get(&request.source).cloned().unwrap_or_default(),
            )
        };

        let fail = |message: String| CompileError {
            file: request.source.clone(),
            message,
        };

        if fails {
            tracing::debug!(source = ?request.source, "fake compile failing as configured");
            self.fs.add_file(&request.object, "partial object");
            return Err(fail("error: expected ';' before '}' token".to_string()));
        }

        self.fs
            .write(&request.object, format!("obj:{}", request.source.display()).as_bytes())
            .map_err(|e| fail(e.to_string()))?;

        if writes_record {
            let mut record =
                format!("{}: {}", request.object.display(), request.source.display());
            for header in &headers {
                record.push_str(" \\\n  ");
                record.push_str(&header.display().to_string());
            }
            record.push('\n');
            self.fs
                .write(&request.record, record.as_bytes())
                .map_err(|e| fail(e.to_string()))?;
        }

        self.lock().compiled.push(request.source.clone());
        Ok(())
    }

    fn link_now(&self, request: &LinkRequest) -> Result<(), LinkError> {
        let fail = |message: String| LinkError {
            target: request.target.clone(),
            message,
        };

        if self.lock().failing_targets.contains(&request.target) {
            tracing::debug!(target = %request.target, "fake link failing as configured");
            self.fs.add_file(&request.artifact, "partial artifact");
            return Err(fail("undefined reference to `main'".to_string()));
        }

        for object in &request.objects {
            if !self.fs.is_file(object) {
                return Err(fail(format!("{}: No such file", object.display())));
            }
        }

        let content = format!("{}:{}", request.kind, request.objects.len());
        self.fs
            .write(&request.artifact, content.as_bytes())
            .map_err(|e| fail(e.to_string()))?;

        self.lock().linked.push(request.target.clone());
        Ok(())
    }
}

impl Toolchain for FakeToolchain {
    fn compile<'a>(&'a self, request: &'a CompileRequest) -> ToolFuture<'a, CompileError> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.compile_now(request)
        })
    }

    fn link<'a>(&'a self, request: &'a LinkRequest) -> ToolFuture<'a, LinkError> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.link_now(request)
        })
    }
}
