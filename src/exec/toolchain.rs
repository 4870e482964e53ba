// src/exec/toolchain.rs

//! The compile/link capability.
//!
//! [`Toolchain`] is the seam between the engine and the outside world: the
//! real [`CommandToolchain`] spawns the configured compiler driver, tests
//! plug in a fake that writes files into a mock filesystem.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{CompileError, LinkError};
use crate::plan::{CompileRequest, LinkRequest};

pub type ToolFuture<'a, E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'a>>;

pub trait Toolchain: Send + Sync + 'static {
    /// Produce `request.object` and write its dependency record to
    /// `request.record`.
    fn compile<'a>(&'a self, request: &'a CompileRequest) -> ToolFuture<'a, CompileError>;

    /// Produce `request.artifact` from `request.objects`.
    fn link<'a>(&'a self, request: &'a LinkRequest) -> ToolFuture<'a, LinkError>;
}

/// Runs a gcc/clang-compatible driver as a child process.
#[derive(Debug, Clone, Default)]
pub struct CommandToolchain;

impl CommandToolchain {
    pub fn new() -> Self {
        Self
    }
}

/// Run `program args...`; on failure return its stderr (or exit status).
async fn run_tool(program: &str, args: &[String]) -> Result<(), String> {
    debug!(program, args = ?args, "spawning tool");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("could not run '{program}': {e}"))?;

    if output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            info!(program, "{}", stderr.trim_end());
        }
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    Err(if stderr.is_empty() {
        format!("'{program}' exited with {}", output.status)
    } else {
        stderr.to_string()
    })
}

impl Toolchain for CommandToolchain {
    fn compile<'a>(&'a self, request: &'a CompileRequest) -> ToolFuture<'a, CompileError> {
        Box::pin(async move {
            run_tool(&request.program, &request.args())
                .await
                .map_err(|message| CompileError {
                    file: request.source.clone(),
                    message,
                })
        })
    }

    fn link<'a>(&'a self, request: &'a LinkRequest) -> ToolFuture<'a, LinkError> {
        Box::pin(async move {
            run_tool(&request.program, &request.args())
                .await
                .map_err(|message| LinkError {
                    target: request.target.clone(),
                    message,
                })
        })
    }
}
