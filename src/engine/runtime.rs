// src/engine/runtime.rs

use std::fmt;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{CompileError, LinkError};
use crate::exec::ExecutorBackend;
use crate::plan::{ActionId, ActionKind, ActionOutcome, Scheduler, SchedulerStep};
use crate::report::{BuildReport, Diagnostic};

use super::RuntimeEvent;

/// Drives the [`Scheduler`] in response to [`RuntimeEvent`]s and delegates
/// execution to an [`ExecutorBackend`].
///
/// All ordering decisions are made by the scheduler; this struct only moves
/// events in, dispatches actions out and fills the [`BuildReport`].
pub struct Runtime<E: ExecutorBackend> {
    scheduler: Scheduler,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    report: BuildReport,
    shutting_down: bool,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("shutting_down", &self.shutting_down)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    /// `report` may already carry diagnostics from scanning and planning.
    pub fn new(
        scheduler: Scheduler,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        report: BuildReport,
    ) -> Self {
        Self {
            scheduler,
            event_rx,
            executor,
            report,
            shutting_down: false,
        }
    }

    /// Main event loop; returns once every action is terminal.
    pub async fn run(mut self) -> Result<BuildReport> {
        info!(actions = self.scheduler.len(), "build runtime started");

        let step = self.scheduler.start();
        self.apply_step(step, None).await?;

        while !self.scheduler.is_finished() {
            let Some(event) = self.event_rx.recv().await else {
                warn!("runtime event channel closed before the build finished");
                self.report.interrupted = true;
                break;
            };
            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::ActionCompleted { action, outcome } => {
                    self.record_completion(action, &outcome);
                    let step = self.scheduler.step_completion(action, outcome);
                    self.apply_step(step, Some(action)).await?;
                }
                RuntimeEvent::ShutdownRequested => {
                    if self.shutting_down {
                        continue;
                    }
                    warn!(
                        running = self.scheduler.running(),
                        "shutdown requested; waiting for running actions to finish"
                    );
                    self.shutting_down = true;
                    self.report.interrupted = true;
                    let step = self.scheduler.cancel_pending();
                    self.apply_step(step, None).await?;
                }
            }
        }

        info!(
            compiled = self.report.compiled.len(),
            linked = self.report.linked.len(),
            failed = self.report.failed_targets.len(),
            "runtime exiting"
        );
        Ok(self.report)
    }

    /// Report what a step changed and dispatch what became ready.
    ///
    /// `completed` is the action whose completion produced the step; every
    /// other failed action in it was blocked by that one. Without one, the
    /// failed actions were cancelled by a shutdown.
    async fn apply_step(&mut self, step: SchedulerStep, completed: Option<ActionId>) -> Result<()> {
        let reason = match completed.and_then(|id| self.scheduler.action(id)) {
            Some(cause) => format!("{} failed to compile", cause.label()),
            None => "cancelled".to_string(),
        };

        for id in step.newly_failed.iter().filter(|id| Some(**id) != completed) {
            let Some(action) = self.scheduler.action(*id) else {
                continue;
            };
            if let ActionKind::Link(link) = &action.kind {
                let reason = reason.clone();
                let target = link.target.clone();
                self.report.fail_target(&target, reason.clone());
                self.report.push(Diagnostic::TargetSkipped { target, reason });
            }
        }

        if step.newly_scheduled.is_empty() {
            return Ok(());
        }

        for action in &step.newly_scheduled {
            if action.is_compile() {
                self.report.compile_actions += 1;
            } else {
                self.report.link_actions += 1;
            }
            info!(action = %action.id, "{}", action);
        }
        self.executor.spawn_ready_actions(step.newly_scheduled).await
    }

    fn record_completion(&mut self, id: ActionId, outcome: &ActionOutcome) {
        let Some(action) = self.scheduler.action(id) else {
            return;
        };

        match (&action.kind, outcome) {
            (ActionKind::Compile(c), ActionOutcome::Success) => {
                self.report.compiled.push(c.source.clone());
            }
            (ActionKind::Compile(c), ActionOutcome::Failed(message)) => {
                let diagnostic = Diagnostic::CompileFailed(CompileError {
                    file: c.source.clone(),
                    message: message.clone(),
                });
                self.report.push(diagnostic);
            }
            (ActionKind::Link(l), ActionOutcome::Success) => {
                info!(target = %l.target, artifact = ?l.artifact, "target linked");
                self.report.linked.push(l.target.clone());
            }
            (ActionKind::Link(l), ActionOutcome::Failed(message)) => {
                let target = l.target.clone();
                let diagnostic = Diagnostic::LinkFailed(LinkError {
                    target: target.clone(),
                    message: message.clone(),
                });
                self.report.fail_target(&target, "link failed");
                self.report.push(diagnostic);
            }
        }
    }
}
