// src/engine/mod.rs

//! Execution engine for taskrun.
//!
//! - [`orchestrator`] gates a command through the validator, runs it in a
//!   sandbox unit and falls back to a local process when the sandbox fails.
//!   It always produces an [`ExecutionRecord`](crate::types::ExecutionRecord)
//!   for an accepted command.
//! - [`service`] wraps the orchestrator with task lookup and persistence of
//!   the resulting record.

pub mod orchestrator;
pub mod service;

pub use orchestrator::{Attempt, DEFAULT_TIMEOUT, Orchestrator, OrchestratorOptions};
pub use service::TaskService;
