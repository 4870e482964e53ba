// src/exec/mod.rs

//! Action execution layer.
//!
//! - [`toolchain`] is the compile/link capability (real driver or fake).
//! - [`backend`] provides the `ExecutorBackend` trait and the bounded
//!   `PoolExecutorBackend` the runtime uses in production.

pub mod backend;
pub mod toolchain;

pub use backend::{ExecutorBackend, PoolExecutorBackend};
pub use toolchain::{CommandToolchain, Toolchain, ToolFuture};
