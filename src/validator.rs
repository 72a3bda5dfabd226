// src/validator.rs

//! Denylist-based command validation.
//!
//! This is a best-effort guard against a known set of destructive or
//! injection-prone patterns. It is **not** a security boundary: a command that
//! passes here can still do harm. Isolation comes from running the command in
//! a disposable sandbox unit (see [`crate::sandbox`]).
//!
//! Every rule lives in [`RULES`]; matching is case-insensitive and runs over
//! the whole command text, not per argument.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// A single named denylist entry.
pub struct Rule {
    pub name: &'static str,
    pub pattern: &'static str,
}

/// The denylist. Order matters only for which rule gets reported when
/// several match (e.g. `rm -rf` is reported as `rm-rf`).
pub const RULES: &[Rule] = &[
    Rule { name: "rm-rf", pattern: r"\brm\s+-rf\b" },
    Rule { name: "rm", pattern: r"\brm\b" },
    Rule { name: "sudo", pattern: r"\bsudo\b" },
    Rule { name: "shutdown", pattern: r"\bshutdown\b" },
    Rule { name: "reboot", pattern: r"\breboot\b" },
    Rule { name: "statement-separator", pattern: r";" },
    Rule { name: "command-substitution", pattern: r"\$\(" },
    Rule { name: "backtick", pattern: r"`" },
];

struct CompiledRule {
    name: &'static str,
    regex: Regex,
}

static COMPILED: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| CompiledRule {
            name: rule.name,
            // Patterns are static literals; a failure here is a programming error.
            regex: Regex::new(&format!("(?i){}", rule.pattern))
                .unwrap_or_else(|e| panic!("invalid denylist rule '{}': {e}", rule.name)),
        })
        .collect()
});

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationRejection {
    #[error("command is missing")]
    Missing,

    #[error("command is empty")]
    Blank,

    #[error("command matches forbidden pattern '{rule}'")]
    Forbidden { rule: &'static str },
}

impl ValidationRejection {
    /// Name of the rule that triggered the rejection, if any.
    pub fn rule(&self) -> Option<&'static str> {
        match self {
            ValidationRejection::Forbidden { rule } => Some(rule),
            _ => None,
        }
    }
}

/// Check a command against the denylist.
pub fn check(command: &str) -> Result<(), ValidationRejection> {
    if command.trim().is_empty() {
        return Err(ValidationRejection::Blank);
    }

    match COMPILED.iter().find(|rule| rule.regex.is_match(command)) {
        Some(rule) => Err(ValidationRejection::Forbidden { rule: rule.name }),
        None => Ok(()),
    }
}

/// Like [`check`], but for a task whose command may be absent.
pub fn check_task_command(command: Option<&str>) -> Result<(), ValidationRejection> {
    match command {
        Some(cmd) => check(cmd),
        None => Err(ValidationRejection::Missing),
    }
}

/// `true` if the command passes the denylist.
pub fn is_safe(command: &str) -> bool {
    check(command).is_ok()
}

/// Human-readable listing of the active rules (used by `--dry-run`).
pub struct RuleTable;

impl fmt::Display for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in RULES {
            writeln!(f, "  - {:<22} {}", rule.name, rule.pattern)?;
        }
        Ok(())
    }
}
