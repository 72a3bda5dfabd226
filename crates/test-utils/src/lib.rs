pub mod builders;
pub mod fake_fallback;
pub mod fake_runtime;

use std::sync::{Arc, Once};
use std::time::Duration;

use taskrun::engine::{Orchestrator, OrchestratorOptions};
use taskrun::exec::FallbackExecutor;
use taskrun::sandbox::{SandboxClient, SandboxOptions};
use tracing_subscriber::{fmt, EnvFilter};

use crate::fake_runtime::FakeRuntime;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Sandbox options tuned for tests: polls every 5ms.
pub fn fast_sandbox_options() -> SandboxOptions {
    SandboxOptions {
        poll_interval: Duration::from_millis(5),
        ..SandboxOptions::default()
    }
}

/// Orchestrator over a fake substrate with the given wait timeout.
pub fn fake_orchestrator<F: FallbackExecutor>(
    runtime: Arc<FakeRuntime>,
    fallback: F,
    timeout: Duration,
) -> Orchestrator<FakeRuntime, F> {
    let sandbox = SandboxClient::new(runtime, fast_sandbox_options());
    let options = OrchestratorOptions {
        timeout,
        fallback_enabled: true,
    };
    Orchestrator::new(sandbox, fallback, options)
}
