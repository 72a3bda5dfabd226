// tests/sandbox_client.rs

mod common;
use crate::common::{TestResult, eventually, fast_sandbox_options, init_tracing};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use taskrun::sandbox::{SandboxClient, SandboxError, SandboxOptions, UnitPhase};
use taskrun::types::CommandSpec;
use taskrun_test_utils::fake_runtime::FakeRuntime;

fn client(runtime: &Arc<FakeRuntime>) -> SandboxClient<FakeRuntime> {
    SandboxClient::new(Arc::clone(runtime), fast_sandbox_options())
}

#[tokio::test]
async fn successful_run_returns_logs_and_deletes_unit() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new());
    let output = client(&runtime)
        .run(&CommandSpec::shell("echo hello"), Duration::from_secs(2))
        .await?;

    assert_eq!(output, "hello\n");

    let created = runtime.created_names();
    assert_eq!(created.len(), 1);
    assert_eq!(runtime.deleted_names(), created);
    Ok(())
}

#[tokio::test]
async fn unit_spec_carries_image_container_command_and_deadline() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new());
    let command = CommandSpec::shell("echo spec");
    client(&runtime)
        .run(&command, Duration::from_millis(1500))
        .await?;

    let specs = runtime.created_specs();
    let spec = &specs[0];
    assert_eq!(spec.image, "busybox:1.36");
    assert_eq!(spec.container, "runner");
    assert_eq!(spec.command, command);
    // Rounded up to whole seconds.
    assert_eq!(spec.deadline, Some(Duration::from_secs(2)));
    Ok(())
}

#[tokio::test]
async fn unit_names_use_prefix_and_are_unique() {
    let runtime = Arc::new(FakeRuntime::new());
    let client = SandboxClient::new(
        Arc::clone(&runtime),
        SandboxOptions {
            name_prefix: "job".to_string(),
            ..fast_sandbox_options()
        },
    );

    let names: HashSet<String> = (0..1000).map(|_| client.unit_name()).collect();
    assert_eq!(names.len(), 1000);

    for name in names.iter().take(10) {
        assert!(name.starts_with("job-"));
        assert_eq!(name.len(), "job-".len() + 32);
        assert!(name.len() <= 63);
        assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }
}

#[tokio::test]
async fn failed_phase_still_returns_logs() -> TestResult {
    init_tracing();

    let runtime = Arc::new(
        FakeRuntime::new()
            .with_phases(vec![Some(UnitPhase::Running), Some(UnitPhase::Failed)])
            .with_logs("sh: boom: not found\n"),
    );
    let output = client(&runtime)
        .run(&CommandSpec::shell("boom"), Duration::from_secs(2))
        .await?;

    assert_eq!(output, "sh: boom: not found\n");
    assert_eq!(runtime.deleted_names().len(), 1);
    Ok(())
}

#[tokio::test]
async fn not_yet_observable_unit_is_waited_for() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().with_phases(vec![
        None,
        None,
        None,
        Some(UnitPhase::Pending),
        None,
        Some(UnitPhase::Succeeded),
    ]));
    let output = client(&runtime)
        .run(&CommandSpec::shell("echo patient"), Duration::from_secs(2))
        .await?;

    assert_eq!(output, "patient\n");
    Ok(())
}

#[tokio::test]
async fn provision_failure_still_attempts_one_delete() {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().failing_create("connection refused"));
    let err = client(&runtime)
        .run(&CommandSpec::shell("echo hello"), Duration::from_secs(2))
        .await
        .unwrap_err();

    match &err {
        SandboxError::Provision { source, .. } => {
            assert!(source.to_string().contains("connection refused"))
        }
        other => panic!("expected Provision error, got {other:?}"),
    }
    assert_eq!(runtime.create_calls(), 1);
    assert_eq!(runtime.deleted_names(), vec![err.unit().to_string()]);
    assert_eq!(runtime.log_calls(), 0);
}

#[tokio::test]
async fn unit_created_despite_create_error_is_deleted() {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().lost_create_response("timed out waiting for create response"));
    let err = client(&runtime)
        .run(&CommandSpec::shell("echo hello"), Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, SandboxError::Provision { .. }), "got {err:?}");

    let created = runtime.created_names();
    assert_eq!(created.len(), 1);
    assert_eq!(runtime.delete_count(&created[0]), 1);
    assert!(runtime.live_names().is_empty(), "leaked: {:?}", runtime.live_names());
}

#[tokio::test]
async fn timeout_deletes_unit_exactly_once() {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().never_terminal());
    let err = client(&runtime)
        .run(&CommandSpec::shell("sleep 3600"), Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, SandboxError::Timeout { .. }), "got {err:?}");

    let created = runtime.created_names();
    assert_eq!(created.len(), 1);
    assert_eq!(err.unit(), created[0]);
    assert_eq!(runtime.delete_count(&created[0]), 1);
    assert_eq!(runtime.log_calls(), 0);
}

#[tokio::test]
async fn retrieval_failure_deletes_unit_exactly_once() {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().failing_logs("log stream closed"));
    let err = client(&runtime)
        .run(&CommandSpec::shell("echo hello"), Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, SandboxError::Retrieval { .. }), "got {err:?}");

    let created = runtime.created_names();
    assert_eq!(runtime.delete_count(&created[0]), 1);
}

#[tokio::test]
async fn delete_failure_does_not_mask_output() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().failing_delete("forbidden"));
    let output = client(&runtime)
        .run(&CommandSpec::shell("echo kept"), Duration::from_secs(2))
        .await?;

    assert_eq!(output, "kept\n");
    assert_eq!(runtime.deleted_names().len(), 1);
    Ok(())
}

#[tokio::test]
async fn cancelled_run_still_deletes_unit_once() {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().never_terminal());
    let client = client(&runtime);
    let command = CommandSpec::shell("sleep 3600");

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        client.run(&command, Duration::from_secs(30)),
    )
    .await;
    assert!(cancelled.is_err(), "run should have been cancelled");

    let created = runtime.created_names();
    assert_eq!(created.len(), 1);

    let rt = Arc::clone(&runtime);
    assert!(eventually(move || !rt.deleted_names().is_empty()).await);

    // Give any duplicate deletion a chance to show up.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(runtime.delete_count(&created[0]), 1);
}

#[tokio::test]
async fn cancelled_during_delete_still_finishes_delete_once() {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().with_delete_delay(Duration::from_millis(200)));
    let client = client(&runtime);
    let command = CommandSpec::shell("echo hello");

    // The unit finishes after a few 5ms polls; cancel while the delete is in flight.
    let cancelled = tokio::time::timeout(
        Duration::from_millis(100),
        client.run(&command, Duration::from_secs(30)),
    )
    .await;
    assert!(cancelled.is_err(), "run should have been cancelled");

    let created = runtime.created_names();
    assert_eq!(created.len(), 1);
    assert!(runtime.deleted_names().is_empty());

    let rt = Arc::clone(&runtime);
    assert!(eventually(move || rt.live_names().is_empty()).await);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(runtime.delete_count(&created[0]), 1);
}
