// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::OrchestratorOptions;
use crate::exec::LocalExecutor;
use crate::sandbox::SandboxOptions;
use crate::sandbox::client::{DEFAULT_CONTAINER, DEFAULT_IMAGE, DEFAULT_NAME_PREFIX};
use crate::types::Task;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [sandbox]
/// namespace = "jobs"
/// image = "busybox:1.36"
/// timeout_secs = 60
///
/// [fallback]
/// enabled = true
///
/// [task.hello]
/// name = "Hello"
/// owner = "ops"
/// command = "echo hello"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub sandbox: SandboxSection,

    #[serde(default)]
    pub fallback: FallbackSection,

    /// Stored tasks from `[task.<id>]`; keys are task ids.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[sandbox]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxSection {
    /// Namespace for sandbox pods; `None` uses the kube client default.
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default = "default_container_name")]
    pub container_name: String,

    /// Prefix of generated unit names; a UUID is appended.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    /// How long to wait for a unit to finish.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn default_container_name() -> String {
    DEFAULT_CONTAINER.to_string()
}

fn default_name_prefix() -> String {
    DEFAULT_NAME_PREFIX.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            namespace: None,
            image: default_image(),
            container_name: default_container_name(),
            name_prefix: default_name_prefix(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// `[fallback]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackSection {
    /// Run commands locally when the sandbox is unavailable.
    #[serde(default = "default_fallback_enabled")]
    pub enabled: bool,

    /// Kill local processes after this many seconds; `0` disables the limit.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_fallback_enabled() -> bool {
    true
}

impl Default for FallbackSection {
    fn default() -> Self {
        Self {
            enabled: default_fallback_enabled(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `[task.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub owner: String,

    /// Shell command; absent commands are rejected by validation.
    #[serde(default)]
    pub command: Option<String>,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub sandbox: SandboxSection,
    pub fallback: FallbackSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        sandbox: SandboxSection,
        fallback: FallbackSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            sandbox,
            fallback,
            task,
        }
    }

    pub fn sandbox_options(&self) -> SandboxOptions {
        SandboxOptions {
            image: self.sandbox.image.clone(),
            container: self.sandbox.container_name.clone(),
            name_prefix: self.sandbox.name_prefix.clone(),
            poll_interval: Duration::from_millis(self.sandbox.poll_interval_ms),
        }
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            timeout: Duration::from_secs(self.sandbox.timeout_secs),
            fallback_enabled: self.fallback.enabled,
        }
    }

    pub fn local_executor(&self) -> LocalExecutor {
        match self.fallback.timeout_secs {
            0 => LocalExecutor::new(),
            secs => LocalExecutor::with_timeout(Duration::from_secs(secs)),
        }
    }

    /// Stored tasks, ready to seed a repository.
    pub fn tasks(&self) -> Vec<Task> {
        self.task
            .iter()
            .map(|(id, cfg)| Task {
                id: id.clone(),
                name: cfg.name.clone(),
                owner: cfg.owner.clone(),
                command: cfg.command.clone(),
                executions: Vec::new(),
            })
            .collect()
    }
}
