// src/engine/orchestrator.rs

//! Validate → sandbox → local fallback → execution record.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::exec::{FallbackExecutor, SpawnError};
use crate::sandbox::{SandboxClient, SandboxError, SandboxRuntime};
use crate::types::{CommandSpec, ExecutionOutcome, ExecutionRecord, Task};
use crate::validator::{self, ValidationRejection};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-invocation knobs shared by all executions.
///
/// With the default `fallback_enabled = true`, every failed sandbox attempt
/// is followed by exactly one local run. Setting it to `false` is an operator
/// opt-out: sandbox failures then become hard failures and nothing runs on
/// the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Upper bound on waiting for a sandbox unit to finish.
    pub timeout: Duration,
    /// Whether a failed sandbox attempt may be retried as a local process.
    pub fallback_enabled: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            fallback_enabled: true,
        }
    }
}

/// Outcome of the primary-then-fallback attempt sequence.
#[derive(Debug)]
pub enum Attempt {
    /// The sandbox produced the output.
    Sandbox(String),
    /// The sandbox failed with `cause`; the local fallback produced `output`.
    Fallback { output: String, cause: SandboxError },
    /// Nothing produced output. `fallback` is `None` when fallback is disabled.
    Failed {
        cause: SandboxError,
        fallback: Option<SpawnError>,
    },
}

impl Attempt {
    pub fn outcome(&self) -> ExecutionOutcome {
        match self {
            Attempt::Sandbox(_) => ExecutionOutcome::Sandbox,
            Attempt::Fallback { .. } => ExecutionOutcome::Fallback,
            Attempt::Failed { .. } => ExecutionOutcome::Failed,
        }
    }

    /// Output text for the record; failures become `Error: <description>`.
    pub fn into_output(self) -> String {
        match self {
            Attempt::Sandbox(output) | Attempt::Fallback { output, .. } => output,
            Attempt::Failed {
                fallback: Some(err),
                ..
            } => format!("Error: {err}"),
            Attempt::Failed {
                cause,
                fallback: None,
            } => format!("Error: {cause}"),
        }
    }
}

/// Coordinates one command execution per call.
///
/// Holds no per-call state, so one instance can serve any number of
/// concurrent `execute` calls behind an `Arc`.
pub struct Orchestrator<R, F> {
    sandbox: SandboxClient<R>,
    fallback: F,
    options: OrchestratorOptions,
}

impl<R, F> Orchestrator<R, F>
where
    R: SandboxRuntime,
    F: FallbackExecutor,
{
    pub fn new(sandbox: SandboxClient<R>, fallback: F, options: OrchestratorOptions) -> Self {
        Self {
            sandbox,
            fallback,
            options,
        }
    }

    /// Execute a task's command.
    ///
    /// An unsafe (or missing) command is rejected before anything runs. For
    /// every accepted command a completed record is returned, even when both
    /// execution paths fail.
    pub async fn execute(&self, task: &Task) -> Result<ExecutionRecord, ValidationRejection> {
        let Some(command) = task.command.as_deref() else {
            warn!(task = %task.id, "rejecting task without a command");
            return Err(ValidationRejection::Missing);
        };

        info!(task = %task.id, name = %task.name, "executing task");
        self.execute_command(command).await
    }

    /// Execute a bare command string; see [`Orchestrator::execute`].
    pub async fn execute_command(&self, command: &str) -> Result<ExecutionRecord, ValidationRejection> {
        if let Err(rejection) = validator::check(command) {
            warn!(cmd = %command, reason = %rejection, "rejecting unsafe command");
            return Err(rejection);
        }

        let start_time = Utc::now();
        let attempt = self.attempt(&CommandSpec::shell(command)).await;
        let outcome = attempt.outcome();
        let output = attempt.into_output();
        // Wall clock may step backwards; keep end >= start.
        let end_time = Utc::now().max(start_time);

        info!(
            cmd = %command,
            ?outcome,
            elapsed_ms = (end_time - start_time).num_milliseconds(),
            "execution finished"
        );

        Ok(ExecutionRecord {
            start_time,
            end_time,
            output,
            outcome,
        })
    }

    /// Run `command` in the sandbox; on any sandbox failure run it once
    /// locally.
    pub async fn attempt(&self, command: &CommandSpec) -> Attempt {
        let cause = match self.sandbox.run(command, self.options.timeout).await {
            Ok(output) => return Attempt::Sandbox(output),
            Err(err) => err,
        };

        if !self.options.fallback_enabled {
            error!(
                cmd = %command,
                error = %cause,
                "sandbox execution failed and local fallback is disabled"
            );
            return Attempt::Failed {
                cause,
                fallback: None,
            };
        }

        warn!(
            cmd = %command,
            unit = %cause.unit(),
            error = %cause,
            "sandbox execution failed; running command locally WITHOUT isolation"
        );

        match self.fallback.run(command).await {
            Ok(output) => Attempt::Fallback { output, cause },
            Err(err) => {
                error!(cmd = %command, error = %err, "local fallback execution failed");
                Attempt::Failed {
                    cause,
                    fallback: Some(err),
                }
            }
        }
    }
}
