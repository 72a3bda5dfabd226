// src/exec/mod.rs

//! Local process execution layer.
//!
//! This is the secondary path of the orchestrator: when the sandbox substrate
//! cannot run a command, the command is run here as a plain child process via
//! `tokio::process::Command`.
//!
//! - [`local`] contains the production [`LocalExecutor`] and its
//!   [`SpawnError`].
//! - [`FallbackExecutor`] is the seam the orchestrator talks to, so tests can
//!   swap in an implementation that records calls instead of spawning
//!   processes.

pub mod local;

use std::future::Future;
use std::pin::Pin;

use crate::types::CommandSpec;

pub use local::{LocalExecutor, SpawnError};

/// Trait abstracting how a command is run when the sandbox is unavailable.
pub trait FallbackExecutor: Send + Sync {
    /// Run the command to completion and return its captured stdout.
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<String, SpawnError>> + Send + 'a>>;
}
