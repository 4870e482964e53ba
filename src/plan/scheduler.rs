// src/plan/scheduler.rs

//! Pure scheduling state machine.
//!
//! The scheduler never touches the filesystem or spawns anything: the
//! runtime feeds it completions and dispatches whatever it reports as newly
//! ready. That keeps ordering and failure propagation testable without a
//! toolchain.

use tracing::{debug, info, warn};

use super::action::{ActionId, ScheduledAction};

/// Per-run state of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on `requires` / `after`.
    Pending,
    /// Handed to the executor.
    Running,
    DoneSuccess,
    /// Failed itself, was blocked by a failed requirement, or was cancelled.
    DoneFailed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::DoneSuccess | RunState::DoneFailed)
    }
}

/// Outcome reported by the executor for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    /// Failure message (usually the tool's stderr).
    Failed(String),
}

/// Structured result of a single scheduler step.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Actions that became ready and are now `Running`.
    pub newly_scheduled: Vec<ScheduledAction>,
    /// Actions newly marked failed: the failing action itself (if any)
    /// followed by every action blocked by it.
    pub newly_failed: Vec<ActionId>,
    /// Whether every action is now terminal.
    pub run_just_finished: bool,
}

#[derive(Debug)]
struct ActionInfo {
    action: ScheduledAction,
    state: RunState,
}

#[derive(Debug)]
pub struct Scheduler {
    actions: Vec<ActionInfo>,
    finished: bool,
}

impl Scheduler {
    /// Actions must be indexed by their id (`actions[i].id == ActionId(i)`)
    /// and may only reference lower ids, which the planner guarantees.
    pub fn new(actions: Vec<ScheduledAction>) -> Self {
        let actions = actions
            .into_iter()
            .map(|action| ActionInfo {
                action,
                state: RunState::Pending,
            })
            .collect();
        Self {
            actions,
            finished: false,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn action(&self, id: ActionId) -> Option<&ScheduledAction> {
        self.actions.get(id.0).map(|info| &info.action)
    }

    pub fn run_state_of(&self, id: ActionId) -> Option<RunState> {
        self.actions.get(id.0).map(|info| info.state)
    }

    /// True once every action is terminal.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of actions currently handed to the executor.
    pub fn running(&self) -> usize {
        self.actions
            .iter()
            .filter(|info| info.state == RunState::Running)
            .count()
    }

    /// Schedule every action that is ready from the outset.
    pub fn start(&mut self) -> SchedulerStep {
        info!(actions = self.actions.len(), "scheduler: starting build run");
        let newly_scheduled = self.collect_new_ready();
        let run_just_finished = self.maybe_finish();
        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    /// Record the outcome of a running action and schedule what it unblocked.
    pub fn step_completion(&mut self, id: ActionId, outcome: ActionOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(info) = self.actions.get_mut(id.0) else {
            warn!(action = %id, "completion for unknown action; ignoring");
            return step;
        };
        if info.state != RunState::Running {
            warn!(action = %id, state = ?info.state, "completion for action that is not running; ignoring");
            return step;
        }

        match outcome {
            ActionOutcome::Success => {
                info.state = RunState::DoneSuccess;
                debug!(action = %id, label = %info.action.label(), "action succeeded");
            }
            ActionOutcome::Failed(message) => {
                info.state = RunState::DoneFailed;
                warn!(
                    action = %id,
                    label = %info.action.label(),
                    %message,
                    "action failed; failing dependents in this run"
                );
                step.newly_failed.push(id);
                step.newly_failed.extend(self.mark_dependents_failed(id));
            }
        }

        step.newly_scheduled = self.collect_new_ready();
        step.run_just_finished = self.maybe_finish();
        step
    }

    /// Stop scheduling: every pending action becomes failed. Running actions
    /// are left to report their completion.
    pub fn cancel_pending(&mut self) -> SchedulerStep {
        let mut newly_failed = Vec::new();
        for info in &mut self.actions {
            if info.state == RunState::Pending {
                info.state = RunState::DoneFailed;
                newly_failed.push(info.action.id);
            }
        }
        info!(cancelled = newly_failed.len(), "scheduler: pending actions cancelled");
        let run_just_finished = self.maybe_finish();
        SchedulerStep {
            newly_scheduled: Vec::new(),
            newly_failed,
            run_just_finished,
        }
    }

    /// Fail every pending action that (transitively) requires `failed`.
    fn mark_dependents_failed(&mut self, failed: ActionId) -> Vec<ActionId> {
        let mut out = Vec::new();
        let mut frontier = vec![failed];

        while let Some(current) = frontier.pop() {
            for info in &mut self.actions {
                if info.state == RunState::Pending && info.action.requires.contains(&current) {
                    info.state = RunState::DoneFailed;
                    debug!(
                        action = %info.action.id,
                        label = %info.action.label(),
                        blocked_by = %current,
                        "action blocked by failed requirement"
                    );
                    out.push(info.action.id);
                    frontier.push(info.action.id);
                }
            }
        }

        out.sort();
        out
    }

    fn is_ready(&self, info: &ActionInfo) -> bool {
        info.state == RunState::Pending
            && info
                .action
                .requires
                .iter()
                .all(|dep| self.run_state_of(*dep) == Some(RunState::DoneSuccess))
            && info
                .action
                .after
                .iter()
                .all(|dep| self.run_state_of(*dep).is_none_or(RunState::is_terminal))
    }

    fn collect_new_ready(&mut self) -> Vec<ScheduledAction> {
        let ready: Vec<usize> = (0..self.actions.len())
            .filter(|&i| self.is_ready(&self.actions[i]))
            .collect();

        ready
            .into_iter()
            .map(|i| {
                let info = &mut self.actions[i];
                info.state = RunState::Running;
                info.action.clone()
            })
            .collect()
    }

    fn maybe_finish(&mut self) -> bool {
        if self.finished {
            return false;
        }
        if self.actions.iter().all(|info| info.state.is_terminal()) {
            info!("scheduler: all actions terminal; run finished");
            self.finished = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::action::{ActionKind, CompileRequest, LinkRequest};
    use crate::types::{Language, TargetKind};
    use std::path::PathBuf;

    fn compile(id: usize) -> ScheduledAction {
        ScheduledAction {
            id: ActionId(id),
            kind: ActionKind::Compile(CompileRequest {
                source: PathBuf::from(format!("s{id}.c")),
                object: PathBuf::from(format!("s{id}.c.o")),
                record: PathBuf::from(format!("s{id}.c.d")),
                language: Language::C,
                program: "cc".to_string(),
                include_paths: vec![],
                flags: vec![],
            }),
            requires: vec![],
            after: vec![],
        }
    }

    fn link(id: usize, kind: TargetKind, requires: &[usize], after: &[usize]) -> ScheduledAction {
        ScheduledAction {
            id: ActionId(id),
            kind: ActionKind::Link(LinkRequest {
                target: format!("t{id}"),
                kind,
                program: "cc".to_string(),
                objects: vec![],
                library_paths: vec![],
                flags: vec![],
                libs: vec![],
                artifact: PathBuf::from(format!("t{id}")),
            }),
            requires: requires.iter().copied().map(ActionId).collect(),
            after: after.iter().copied().map(ActionId).collect(),
        }
    }

    fn ids(actions: &[ScheduledAction]) -> Vec<usize> {
        actions.iter().map(|a| a.id.0).collect()
    }

    #[test]
    fn links_wait_for_their_compiles() {
        // 0: common, 1: app, 2: link app (needs 0 and 1)
        let mut s = Scheduler::new(vec![
            compile(0),
            compile(1),
            link(2, TargetKind::Executable, &[0, 1], &[]),
        ]);

        let step = s.start();
        assert_eq!(ids(&step.newly_scheduled), vec![0, 1]);

        let step = s.step_completion(ActionId(0), ActionOutcome::Success);
        assert!(step.newly_scheduled.is_empty());

        let step = s.step_completion(ActionId(1), ActionOutcome::Success);
        assert_eq!(ids(&step.newly_scheduled), vec![2]);
        assert!(!step.run_just_finished);

        let step = s.step_completion(ActionId(2), ActionOutcome::Success);
        assert!(step.run_just_finished);
        assert!(s.is_finished());
    }

    #[test]
    fn failed_compile_blocks_only_its_targets() {
        // 0: a.c, 1: b.c, 2: link A (0), 3: link B (1)
        let mut s = Scheduler::new(vec![
            compile(0),
            compile(1),
            link(2, TargetKind::Executable, &[0], &[]),
            link(3, TargetKind::Executable, &[1], &[]),
        ]);
        s.start();

        let step = s.step_completion(ActionId(0), ActionOutcome::Failed("syntax".into()));
        assert_eq!(step.newly_failed, vec![ActionId(0), ActionId(2)]);

        let step = s.step_completion(ActionId(1), ActionOutcome::Success);
        assert_eq!(ids(&step.newly_scheduled), vec![3]);

        let step = s.step_completion(ActionId(3), ActionOutcome::Success);
        assert!(step.run_just_finished);
        assert_eq!(s.run_state_of(ActionId(2)), Some(RunState::DoneFailed));
        assert_eq!(s.run_state_of(ActionId(3)), Some(RunState::DoneSuccess));
    }

    #[test]
    fn executables_wait_for_library_links_even_when_they_fail() {
        // 0: lib.c, 1: main.c, 2: link lib (0), 3: link exe (1) after 2
        let mut s = Scheduler::new(vec![
            compile(0),
            compile(1),
            link(2, TargetKind::Library, &[0], &[]),
            link(3, TargetKind::Executable, &[1], &[2]),
        ]);
        s.start();
        s.step_completion(ActionId(1), ActionOutcome::Success);
        let step = s.step_completion(ActionId(0), ActionOutcome::Success);
        assert_eq!(ids(&step.newly_scheduled), vec![2]);

        let step = s.step_completion(ActionId(2), ActionOutcome::Failed("ld".into()));
        assert_eq!(step.newly_failed, vec![ActionId(2)]);
        assert_eq!(ids(&step.newly_scheduled), vec![3]);
    }

    #[test]
    fn cancel_leaves_running_actions_alone() {
        let mut s = Scheduler::new(vec![
            compile(0),
            link(1, TargetKind::Executable, &[0], &[]),
        ]);
        s.start();

        let step = s.cancel_pending();
        assert_eq!(step.newly_failed, vec![ActionId(1)]);
        assert!(!step.run_just_finished);
        assert_eq!(s.running(), 1);

        let step = s.step_completion(ActionId(0), ActionOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert!(step.run_just_finished);
    }

    #[test]
    fn empty_plan_finishes_immediately() {
        let mut s = Scheduler::new(vec![]);
        assert!(s.start().run_just_finished);
    }

    #[test]
    fn stray_completions_are_ignored() {
        let mut s = Scheduler::new(vec![compile(0)]);
        let step = s.step_completion(ActionId(0), ActionOutcome::Success);
        assert!(step.newly_scheduled.is_empty());
        assert_eq!(s.run_state_of(ActionId(0)), Some(RunState::Pending));
        let step = s.step_completion(ActionId(9), ActionOutcome::Success);
        assert!(!step.run_just_finished);
    }
}
