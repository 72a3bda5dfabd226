#![allow(dead_code)]

use taskrun::config::{ConfigFile, RawConfigFile, TaskConfig};
use taskrun::errors::Result;
use taskrun::types::Task;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, id: &str, task: TaskConfig) -> Self {
        self.config.task.insert(id.to_string(), task);
        self
    }

    pub fn namespace(mut self, ns: &str) -> Self {
        self.config.sandbox.namespace = Some(ns.to_string());
        self
    }

    pub fn name_prefix(mut self, prefix: &str) -> Self {
        self.config.sandbox.name_prefix = prefix.to_string();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.sandbox.timeout_secs = secs;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.sandbox.poll_interval_ms = ms;
        self
    }

    pub fn fallback_enabled(mut self, enabled: bool) -> Self {
        self.config.fallback.enabled = enabled;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            task: TaskConfig {
                name: String::new(),
                owner: String::new(),
                command: Some(command.to_string()),
            },
        }
    }

    pub fn without_command() -> Self {
        Self {
            task: TaskConfig {
                name: String::new(),
                owner: String::new(),
                command: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.task.owner = owner.to_string();
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for a stored `Task`.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: &str, command: &str) -> Self {
        Self {
            task: Task::new(id, command),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.task.owner = owner.to_string();
        self
    }

    pub fn without_command(mut self) -> Self {
        self.task.command = None;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
