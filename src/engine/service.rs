// src/engine/service.rs

//! Execute a stored task and record the result in its history.

use std::sync::Arc;

use tracing::{info, warn};

use super::orchestrator::Orchestrator;
use crate::errors::{Result, TaskrunError};
use crate::exec::FallbackExecutor;
use crate::sandbox::SandboxRuntime;
use crate::store::TaskRepository;
use crate::types::ExecutionRecord;

pub struct TaskService<S, R, F> {
    repo: S,
    orchestrator: Arc<Orchestrator<R, F>>,
}

impl<S, R, F> TaskService<S, R, F>
where
    S: TaskRepository,
    R: SandboxRuntime,
    F: FallbackExecutor,
{
    pub fn new(repo: S, orchestrator: Arc<Orchestrator<R, F>>) -> Self {
        Self { repo, orchestrator }
    }

    pub fn repository(&self) -> &S {
        &self.repo
    }

    /// Look up task `id`, run its command, append the record and save.
    ///
    /// - Unknown id → [`TaskrunError::TaskNotFound`].
    /// - Unsafe command → [`TaskrunError::UnsafeCommand`]; nothing is saved.
    /// - Otherwise the record is returned, including hard failures.
    pub async fn execute_task(&self, id: &str) -> Result<ExecutionRecord> {
        let mut task = self
            .repo
            .find_by_id(id)?
            .ok_or_else(|| TaskrunError::TaskNotFound(id.to_string()))?;

        let record = self.orchestrator.execute(&task).await?;

        task.executions.push(record.clone());
        self.repo.save(task)?;

        if record.is_hard_failure() {
            warn!(task = %id, "task execution failed; failure recorded");
        } else {
            info!(task = %id, outcome = ?record.outcome, "task execution recorded");
        }

        Ok(record)
    }
}
