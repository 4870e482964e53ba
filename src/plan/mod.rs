// src/plan/mod.rs

//! Action scheduler.
//!
//! - [`action`] defines compile/link requests and their ordering envelope.
//! - [`planner`] asks the staleness evaluator what is out of date and emits
//!   the ordered [`BuildPlan`].
//! - [`scheduler`] is the pure state machine that releases actions as their
//!   prerequisites finish and propagates failures to dependent links.

pub mod action;
pub mod planner;
pub mod scheduler;

pub use action::{ActionId, ActionKind, CompileRequest, LinkRequest, ScheduledAction};
pub use planner::{BuildPlan, compile_request, link_request, plan_build};
pub use scheduler::{ActionOutcome, RunState, Scheduler, SchedulerStep};
