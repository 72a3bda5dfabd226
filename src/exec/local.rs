// src/exec/local.rs

//! Local subprocess execution (degraded, non-isolated mode).

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::FallbackExecutor;
use crate::types::CommandSpec;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to spawn local process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for local process '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("local process '{program}' did not exit within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
}

/// Runs commands as child processes of the current process.
///
/// There is no isolation at all here: the command sees the host filesystem,
/// network and environment.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    timeout: Option<Duration>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Kill the child if it has not exited after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Spawn `command`, wait for it and return its stdout.
    pub async fn run_local(&self, command: &CommandSpec) -> Result<String, SpawnError> {
        let program = command.program().to_string();

        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| SpawnError::Spawn {
            program: program.clone(),
            source,
        })?;

        info!(cmd = %command, pid = ?child.id(), "started local process");

        // Dropping the `wait_with_output` future on timeout drops the child,
        // which kills it (`kill_on_drop`).
        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| SpawnError::TimedOut {
                    program: program.clone(),
                    timeout,
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|source| SpawnError::Wait {
            program: program.clone(),
            source,
        })?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(cmd = %command, "stderr: {}", line);
        }

        let code = output.status.code().unwrap_or(-1);
        if output.status.success() {
            info!(cmd = %command, exit_code = code, "local process exited");
        } else {
            warn!(cmd = %command, exit_code = code, "local process exited with failure");
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl FallbackExecutor for LocalExecutor {
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<String, SpawnError>> + Send + 'a>> {
        Box::pin(self.run_local(command))
    }
}
