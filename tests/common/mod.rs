#![allow(dead_code)]

use std::error::Error;

pub use taskrun_test_utils::{fake_orchestrator, fast_sandbox_options, init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Poll `cond` every 5ms for up to one second.
pub async fn eventually<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    cond()
}
