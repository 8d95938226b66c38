// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] runs one external command to completion and captures its
//!   output ([`ProcessRunner`]).
//! - [`task`] runs units of work in the background and delivers exactly one
//!   terminal outcome per task ([`BackgroundExecutor`]).
//! - [`backend`] provides the `ExecutionBackend` trait and the concrete
//!   `LocalBackend` used in production, which tests replace with a fake.

pub mod backend;
pub mod process;
pub mod task;

pub use backend::{BackendFuture, ExecutionBackend, LocalBackend};
pub use process::{CommandSpec, ProcessResult, ProcessRunner};
pub use task::{outcome_channel, BackgroundExecutor, TaskHandle, TaskListener, TaskOutcome};
