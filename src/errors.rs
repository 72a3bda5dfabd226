// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::validator::ValidationRejection;

#[derive(Error, Debug)]
pub enum TaskrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Unsafe command: {0}")]
    UnsafeCommand(#[from] ValidationRejection),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskrunError>;
