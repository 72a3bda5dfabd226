// src/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Argument vector for one command invocation.
///
/// Never empty: the first element is the program to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec(Vec<String>);

impl CommandSpec {
    /// Build a command from an explicit argument vector.
    ///
    /// Returns `None` when `args` is empty.
    pub fn new<I, S>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            None
        } else {
            Some(Self(args))
        }
    }

    /// Wrap a single command string for shell interpretation (`sh -c <cmd>`).
    pub fn shell(command: impl Into<String>) -> Self {
        Self(vec!["sh".to_string(), "-c".to_string(), command.into()])
    }

    pub fn program(&self) -> &str {
        &self.0[0]
    }

    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// Which path produced an execution record's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOutcome {
    /// Output came from the isolated sandbox unit.
    Sandbox,
    /// The sandbox failed and the command ran as a local process.
    Fallback,
    /// Both paths failed; `output` holds the error description.
    Failed,
}

/// Result of one attempt to run a task's command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub output: String,
    pub outcome: ExecutionOutcome,
}

impl ExecutionRecord {
    /// `true` when neither the sandbox nor the fallback produced output.
    pub fn is_hard_failure(&self) -> bool {
        self.outcome == ExecutionOutcome::Failed
    }
}

/// A stored task: a named command plus its execution history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default, rename = "taskExecutions")]
    pub executions: Vec<ExecutionRecord>,
}

impl Task {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            owner: String::new(),
            command: Some(command.into()),
            executions: Vec::new(),
        }
    }
}
