// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskrunError};
use crate::validator;

/// Maximum length of a Kubernetes object name (DNS-1123 label).
const MAX_NAME_LEN: usize = 63;
/// `-` plus 32 hex chars appended to the prefix for every unit.
const GENERATED_SUFFIX_LEN: usize = 33;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TaskrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.sandbox, raw.fallback, raw.task))
    }
}

pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_sandbox(cfg)?;
    validate_tasks(cfg)?;
    Ok(())
}

fn validate_sandbox(cfg: &RawConfigFile) -> Result<()> {
    let sandbox = &cfg.sandbox;

    if sandbox.timeout_secs == 0 {
        return Err(config_error("[sandbox].timeout_secs must be >= 1 (got 0)"));
    }

    if sandbox.poll_interval_ms == 0 {
        return Err(config_error("[sandbox].poll_interval_ms must be >= 1 (got 0)"));
    }

    if sandbox.image.trim().is_empty() {
        return Err(config_error("[sandbox].image must not be empty"));
    }

    if let Some(ns) = &sandbox.namespace {
        if !is_dns_label(ns) {
            return Err(config_error(format!(
                "[sandbox].namespace '{ns}' is not a valid DNS-1123 label"
            )));
        }
    }

    if !is_dns_label(&sandbox.container_name) {
        return Err(config_error(format!(
            "[sandbox].container_name '{}' is not a valid DNS-1123 label",
            sandbox.container_name
        )));
    }

    let max_prefix = MAX_NAME_LEN - GENERATED_SUFFIX_LEN;
    if !is_dns_label(&sandbox.name_prefix) || sandbox.name_prefix.len() > max_prefix {
        return Err(config_error(format!(
            "[sandbox].name_prefix '{}' must be a DNS-1123 label of at most {} characters",
            sandbox.name_prefix, max_prefix
        )));
    }

    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (id, task) in cfg.task.iter() {
        if let Err(rejection) = validator::check_task_command(task.command.as_deref()) {
            return Err(config_error(format!(
                "task '{id}' has an unsafe command: {rejection}"
            )));
        }
    }
    Ok(())
}

/// Lowercase alphanumerics and `-`, starting and ending alphanumeric.
fn is_dns_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    !bytes.is_empty()
        && bytes.len() <= MAX_NAME_LEN
        && bytes.first().is_some_and(alnum)
        && bytes.last().is_some_and(alnum)
        && bytes.iter().all(|b| alnum(b) || *b == b'-')
}

fn config_error(msg: impl Into<String>) -> TaskrunError {
    TaskrunError::ConfigError(msg.into())
}
