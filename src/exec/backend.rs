// src/exec/backend.rs

//! Pluggable executor backend.
//!
//! The runtime hands ready actions to an [`ExecutorBackend`]; completions
//! come back as [`RuntimeEvent::ActionCompleted`]. [`PoolExecutorBackend`]
//! runs each action in its own Tokio task, bounded by a semaphore with one
//! permit per job. Tests can replace the whole backend or only the
//! [`Toolchain`] underneath it.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use crate::deps::{render_rule, stamp_record};
use crate::engine::RuntimeEvent;
use crate::fs::FileSystem;
use crate::plan::{ActionKind, ActionOutcome, CompileRequest, LinkRequest, ScheduledAction};

use super::toolchain::Toolchain;

/// Trait abstracting how scheduled actions are executed.
pub trait ExecutorBackend: Send {
    /// Start the given actions. Must not wait for them to finish.
    fn spawn_ready_actions(
        &mut self,
        actions: Vec<ScheduledAction>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Bounded worker pool over a [`Toolchain`].
pub struct PoolExecutorBackend<T: Toolchain> {
    toolchain: Arc<T>,
    fs: Arc<dyn FileSystem>,
    permits: Arc<Semaphore>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl<T: Toolchain> PoolExecutorBackend<T> {
    pub fn new(
        toolchain: Arc<T>,
        fs: Arc<dyn FileSystem>,
        jobs: usize,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            toolchain,
            fs,
            permits: Arc::new(Semaphore::new(jobs.max(1))),
            runtime_tx,
        }
    }
}

impl<T: Toolchain> ExecutorBackend for PoolExecutorBackend<T> {
    fn spawn_ready_actions(
        &mut self,
        actions: Vec<ScheduledAction>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for action in actions {
                let toolchain = Arc::clone(&self.toolchain);
                let fs = Arc::clone(&self.fs);
                let permits = Arc::clone(&self.permits);
                let tx = self.runtime_tx.clone();

                tokio::spawn(async move {
                    let id = action.id;
                    let outcome = match permits.acquire_owned().await {
                        Ok(_permit) => run_action(toolchain.as_ref(), fs.as_ref(), action).await,
                        Err(e) => ActionOutcome::Failed(format!("worker pool closed: {e}")),
                    };
                    if tx
                        .send(RuntimeEvent::ActionCompleted { action: id, outcome })
                        .await
                        .is_err()
                    {
                        debug!(action = %id, "runtime gone; dropping completion");
                    }
                });
            }
            Ok(())
        })
    }
}

async fn run_action<T: Toolchain>(
    toolchain: &T,
    fs: &dyn FileSystem,
    action: ScheduledAction,
) -> ActionOutcome {
    match &action.kind {
        ActionKind::Compile(request) => compile(toolchain, fs, request).await,
        ActionKind::Link(request) => link(toolchain, fs, request).await,
    }
}

async fn compile<T: Toolchain>(
    toolchain: &T,
    fs: &dyn FileSystem,
    request: &CompileRequest,
) -> ActionOutcome {
    if let Err(e) = ensure_parent(fs, &request.object) {
        return ActionOutcome::Failed(format!("{e:#}"));
    }
    // A record left over from an earlier compile must not survive a
    // compiler that writes none.
    remove_if_present(fs, &request.record);

    match toolchain.compile(request).await {
        Ok(()) => {
            if let Err(e) = ensure_record(fs, request) {
                warn!(record = ?request.record, error = %format!("{e:#}"), "could not write dependency record");
            } else if let Err(e) = stamp_record(fs, &request.record, &request.signature()) {
                // Without a stamped record the object simply rebuilds next time.
                warn!(record = ?request.record, error = %format!("{e:#}"), "could not stamp dependency record");
            }
            ActionOutcome::Success
        }
        Err(err) => {
            remove_if_present(fs, &request.object);
            remove_if_present(fs, &request.record);
            ActionOutcome::Failed(err.message)
        }
    }
}

/// Sources the driver does not preprocess (lowercase `.s`) get no record
/// from `-MMD`; they depend on nothing but themselves.
fn ensure_record(fs: &dyn FileSystem, request: &CompileRequest) -> Result<()> {
    if fs.exists(&request.record) {
        return Ok(());
    }
    debug!(record = ?request.record, "compiler wrote no record; writing a minimal one");
    let rule = render_rule(&request.object, &[request.source.as_path()]);
    fs.write(&request.record, rule.as_bytes())
}

async fn link<T: Toolchain>(
    toolchain: &T,
    fs: &dyn FileSystem,
    request: &LinkRequest,
) -> ActionOutcome {
    if let Err(e) = ensure_parent(fs, &request.artifact) {
        return ActionOutcome::Failed(format!("{e:#}"));
    }

    match toolchain.link(request).await {
        Ok(()) => ActionOutcome::Success,
        Err(err) => {
            remove_if_present(fs, &request.artifact);
            ActionOutcome::Failed(err.message)
        }
    }
}

fn ensure_parent(fs: &dyn FileSystem, path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs.create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Failed outputs must not survive to look fresh on the next run.
fn remove_if_present(fs: &dyn FileSystem, path: &Path) {
    if !fs.exists(path) {
        return;
    }
    if let Err(e) = fs.remove_file(path) {
        warn!(path = ?path, error = %format!("{e:#}"), "could not remove partial output");
    }
}
