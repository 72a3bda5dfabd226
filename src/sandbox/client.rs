// src/sandbox/client.rs

//! One-shot sandbox execution on top of a [`SandboxRuntime`].

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::{SandboxError, SandboxRuntime, UnitPhase, UnitSpec};
use crate::types::CommandSpec;

pub const DEFAULT_IMAGE: &str = "busybox:1.36";
pub const DEFAULT_CONTAINER: &str = "runner";
pub const DEFAULT_NAME_PREFIX: &str = "task-run";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Static settings applied to every unit the client provisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxOptions {
    pub image: String,
    pub container: String,
    pub name_prefix: String,
    pub poll_interval: Duration,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Runs a command inside a freshly provisioned, single-purpose unit.
///
/// Each call to [`SandboxClient::run`] owns exactly one unit. The unit is
/// deleted before `run` returns, whatever the outcome; if the `run` future is
/// dropped early, deletion is handed off to the Tokio runtime instead.
pub struct SandboxClient<R> {
    runtime: Arc<R>,
    options: SandboxOptions,
}

impl<R: SandboxRuntime> SandboxClient<R> {
    pub fn new(runtime: Arc<R>, options: SandboxOptions) -> Self {
        Self { runtime, options }
    }

    /// Generate a fresh unit name: `<prefix>-<uuid v4, 32 hex chars>`.
    pub fn unit_name(&self) -> String {
        format!("{}-{}", self.options.name_prefix, Uuid::new_v4().simple())
    }

    /// Run `command` in a new unit and return its captured output.
    ///
    /// A non-zero exit inside the unit is not an error here: logs from a
    /// `Failed` unit are returned like any other.
    pub async fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<String, SandboxError> {
        let spec = UnitSpec {
            name: self.unit_name(),
            container: self.options.container.clone(),
            image: self.options.image.clone(),
            command: command.clone(),
            deadline: Some(deadline_for(timeout)),
        };

        info!(
            unit = %spec.name,
            image = %spec.image,
            cmd = %spec.command,
            "provisioning sandbox unit"
        );

        // Armed before create: a create that errors out may still have
        // left a unit behind (e.g. the response was lost).
        let guard = UnitGuard::new(Arc::clone(&self.runtime), spec.name.clone());

        let result = match self.runtime.create_unit(&spec).await {
            Ok(()) => self.collect_output(&spec.name, timeout).await,
            Err(source) => Err(SandboxError::Provision {
                unit: spec.name.clone(),
                source,
            }),
        };
        guard.release().await;

        result
    }

    async fn collect_output(&self, name: &str, timeout: Duration) -> Result<String, SandboxError> {
        let phase = match time::timeout(timeout, self.wait_for_terminal(name)).await {
            Ok(phase) => phase,
            Err(_) => {
                warn!(
                    unit = %name,
                    phase = ?UnitPhase::Unknown,
                    ?timeout,
                    "sandbox unit did not finish in time"
                );
                return Err(SandboxError::Timeout {
                    unit: name.to_string(),
                    timeout,
                });
            }
        };

        info!(unit = %name, ?phase, "sandbox unit finished");

        self.runtime
            .unit_logs(name)
            .await
            .map_err(|source| SandboxError::Retrieval {
                unit: name.to_string(),
                source,
            })
    }

    /// Poll until the unit reaches a terminal phase. Never returns otherwise;
    /// the caller bounds it with a timeout.
    async fn wait_for_terminal(&self, name: &str) -> UnitPhase {
        let period = self.options.poll_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_seen: Option<UnitPhase> = None;

        loop {
            ticker.tick().await;

            match self.runtime.unit_phase(name).await {
                Ok(Some(phase)) if phase.is_terminal() => return phase,
                Ok(Some(phase)) => {
                    if last_seen != Some(phase) {
                        debug!(unit = %name, ?phase, "sandbox unit phase changed");
                        last_seen = Some(phase);
                    }
                }
                Ok(None) => trace!(unit = %name, "sandbox unit not observable yet"),
                Err(err) => debug!(
                    unit = %name,
                    error = %err,
                    "failed to observe sandbox unit phase; will retry"
                ),
            }
        }
    }
}

/// Substrate-side lifetime cap: the wait timeout rounded up to whole seconds.
fn deadline_for(timeout: Duration) -> Duration {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    Duration::from_secs(secs.max(1))
}

/// Owns a (possibly) provisioned unit until it has been deleted.
///
/// [`UnitGuard::release`] runs the delete as a spawned task and waits for it,
/// so cancelling the waiter does not cancel the delete. If the guard is
/// dropped while still armed (the surrounding future was cancelled before
/// `release`), deletion is spawned onto the current Tokio runtime. Either way
/// the delete call is issued exactly once.
struct UnitGuard<R: SandboxRuntime> {
    runtime: Arc<R>,
    name: String,
    armed: bool,
}

impl<R: SandboxRuntime> UnitGuard<R> {
    fn new(runtime: Arc<R>, name: String) -> Self {
        Self {
            runtime,
            name,
            armed: true,
        }
    }

    async fn release(mut self) {
        self.armed = false;

        let runtime = Arc::clone(&self.runtime);
        let name = std::mem::take(&mut self.name);
        let task = tokio::spawn(async move {
            delete_unit_logged(runtime.as_ref(), &name).await;
        });

        if let Err(err) = task.await {
            warn!(error = %err, "sandbox unit deletion task failed");
        }
    }
}

impl<R: SandboxRuntime> Drop for UnitGuard<R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        let runtime = Arc::clone(&self.runtime);
        let name = std::mem::take(&mut self.name);

        match Handle::try_current() {
            Ok(handle) => {
                debug!(unit = %name, "execution cancelled; scheduling sandbox unit deletion");
                handle.spawn(async move {
                    delete_unit_logged(runtime.as_ref(), &name).await;
                });
            }
            Err(_) => warn!(
                unit = %name,
                "no async runtime available; sandbox unit was not deleted"
            ),
        }
    }
}

async fn delete_unit_logged<R: SandboxRuntime>(runtime: &R, name: &str) {
    match runtime.delete_unit(name).await {
        Ok(()) => debug!(unit = %name, "deleted sandbox unit"),
        Err(err) => warn!(unit = %name, error = %err, "failed to delete sandbox unit"),
    }
}
