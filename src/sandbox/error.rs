// src/sandbox/error.rs

use std::time::Duration;

use thiserror::Error;

/// Failures of the primary (sandboxed) execution path.
///
/// None of these reach the caller of the orchestrator directly; they are
/// logged and trigger the local fallback.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to provision sandbox unit '{unit}': {source}")]
    Provision {
        unit: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("sandbox unit '{unit}' did not reach a terminal phase within {timeout:?}")]
    Timeout { unit: String, timeout: Duration },

    #[error("failed to retrieve output of sandbox unit '{unit}': {source}")]
    Retrieval {
        unit: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SandboxError {
    /// Name of the unit the error refers to.
    pub fn unit(&self) -> &str {
        match self {
            SandboxError::Provision { unit, .. }
            | SandboxError::Timeout { unit, .. }
            | SandboxError::Retrieval { unit, .. } => unit,
        }
    }
}
