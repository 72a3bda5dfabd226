// src/sandbox/mod.rs

//! Isolated execution in ephemeral sandbox units.
//!
//! - [`SandboxRuntime`] is the substrate seam: the four namespace-scoped
//!   operations (create, observe phase, fetch logs, delete) a backend must
//!   provide. [`KubeRuntime`] implements it with Kubernetes pods; tests use a
//!   scripted fake.
//! - [`SandboxClient`] drives one unit per invocation through
//!   create → wait for terminal phase → fetch logs → delete, with a bounded
//!   wait and guaranteed teardown.

pub mod client;
pub mod error;
pub mod k8s;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Result;

use crate::types::CommandSpec;

pub use client::{SandboxClient, SandboxOptions};
pub use error::SandboxError;
pub use k8s::KubeRuntime;

/// Lifecycle phase of a sandbox unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Reported by the substrate as unknown, or never resolved before the
    /// wait timed out.
    Unknown,
}

impl UnitPhase {
    /// Terminal phases: no further transitions are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitPhase::Succeeded | UnitPhase::Failed)
    }

    /// Parse a Kubernetes-style phase string.
    pub fn from_phase_str(s: &str) -> Self {
        match s {
            "Pending" => UnitPhase::Pending,
            "Running" => UnitPhase::Running,
            "Succeeded" => UnitPhase::Succeeded,
            "Failed" => UnitPhase::Failed,
            _ => UnitPhase::Unknown,
        }
    }
}

/// Everything the substrate needs to create one single-purpose unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    /// Unique unit name (also the handle used for all later calls).
    pub name: String,
    /// Name of the single container inside the unit.
    pub container: String,
    /// Base runtime image.
    pub image: String,
    /// Entrypoint argument vector.
    pub command: CommandSpec,
    /// Upper bound on the unit's lifetime enforced by the substrate itself.
    pub deadline: Option<Duration>,
}

/// Trait abstracting the orchestration substrate.
///
/// Production code uses [`KubeRuntime`]; tests can provide their own
/// implementation that never talks to a cluster.
pub trait SandboxRuntime: Send + Sync + 'static {
    /// Submit a new unit. Units are never restarted after they exit.
    fn create_unit<'a>(
        &'a self,
        spec: &'a UnitSpec,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Observe the current phase of a unit.
    ///
    /// `Ok(None)` means the unit (or its status) is not observable yet.
    fn unit_phase<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UnitPhase>>> + Send + 'a>>;

    /// Fetch the unit's combined log stream.
    fn unit_logs<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Delete a unit.
    fn delete_unit<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
