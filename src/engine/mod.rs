// src/engine/mod.rs

//! Orchestration engine.
//!
//! The pure scheduling logic lives in [`crate::plan::scheduler`]; the async
//! shell that reacts to executor completions and Ctrl-C is [`runtime`].

pub mod runtime;

use crate::plan::{ActionId, ActionOutcome};

/// Events flowing into the runtime from the executor and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// An action finished with a concrete outcome.
    ActionCompleted {
        action: ActionId,
        outcome: ActionOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub use runtime::Runtime;
