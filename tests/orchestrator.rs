// tests/orchestrator.rs

mod common;
use crate::common::{TestResult, fake_orchestrator, fast_sandbox_options, init_tracing, with_timeout};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use taskrun::engine::{Orchestrator, OrchestratorOptions};
use taskrun::exec::LocalExecutor;
use taskrun::sandbox::SandboxClient;
use taskrun::types::{CommandSpec, ExecutionOutcome, Task};
use taskrun::validator::ValidationRejection;
use taskrun_test_utils::builders::TaskBuilder;
use taskrun_test_utils::fake_fallback::RecordingFallback;
use taskrun_test_utils::fake_runtime::FakeRuntime;

const TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn echo_hello_runs_in_sandbox() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new());
    let fallback = RecordingFallback::succeeding("from fallback\n");
    let orchestrator = fake_orchestrator(Arc::clone(&runtime), fallback.clone(), TIMEOUT);

    let task = TaskBuilder::new("t1", "echo hello").name("greeting").build();
    let record = with_timeout(orchestrator.execute(&task)).await?;

    assert!(record.output.contains("hello"));
    assert_eq!(record.outcome, ExecutionOutcome::Sandbox);
    assert!(record.end_time >= record.start_time);
    assert!(!record.is_hard_failure());
    assert_eq!(fallback.call_count(), 0);

    // The command is wrapped for shell interpretation.
    let specs = runtime.created_specs();
    assert_eq!(specs[0].command, CommandSpec::shell("echo hello"));
    assert_eq!(runtime.deleted_names().len(), 1);

    // The record's start time is taken before the unit is provisioned.
    let created_at = runtime.created_at();
    assert_eq!(created_at.len(), 1);
    assert!(record.start_time <= created_at[0]);
    assert!(record.end_time >= created_at[0]);
    Ok(())
}

#[tokio::test]
async fn unsafe_command_is_rejected_before_anything_runs() {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new());
    let fallback = RecordingFallback::succeeding("");
    let orchestrator = fake_orchestrator(Arc::clone(&runtime), fallback.clone(), TIMEOUT);

    let task = TaskBuilder::new("t1", "rm -rf /").build();
    let rejection = orchestrator.execute(&task).await.unwrap_err();

    assert_eq!(rejection, ValidationRejection::Forbidden { rule: "rm-rf" });
    assert_eq!(runtime.create_calls(), 0);
    assert_eq!(fallback.call_count(), 0);
}

#[tokio::test]
async fn task_without_command_is_rejected() {
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = fake_orchestrator(Arc::clone(&runtime), RecordingFallback::failing(), TIMEOUT);

    let task = TaskBuilder::new("t1", "unused").without_command().build();
    assert_eq!(
        orchestrator.execute(&task).await.unwrap_err(),
        ValidationRejection::Missing
    );
    assert_eq!(runtime.create_calls(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn connectivity_error_falls_back_to_local_process() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().failing_create("connection refused"));
    let orchestrator = fake_orchestrator(Arc::clone(&runtime), LocalExecutor::new(), TIMEOUT);

    let record = with_timeout(orchestrator.execute_command("echo hello")).await?;

    assert!(record.output.contains("hello"), "output: {:?}", record.output);
    assert_eq!(record.outcome, ExecutionOutcome::Fallback);
    // One best-effort delete for the name that failed to provision.
    assert_eq!(runtime.deleted_names().len(), 1);
    Ok(())
}

#[tokio::test]
async fn timeout_deletes_unit_and_falls_back_once() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().never_terminal());
    let fallback = RecordingFallback::succeeding("local output\n");
    let orchestrator = fake_orchestrator(
        Arc::clone(&runtime),
        fallback.clone(),
        Duration::from_millis(50),
    );

    let record = with_timeout(orchestrator.execute_command("echo slow")).await?;

    assert_eq!(record.output, "local output\n");
    assert_eq!(record.outcome, ExecutionOutcome::Fallback);
    assert_eq!(fallback.calls(), vec![CommandSpec::shell("echo slow")]);

    let created = runtime.created_names();
    assert_eq!(created.len(), 1);
    assert_eq!(runtime.delete_count(&created[0]), 1);
    Ok(())
}

#[tokio::test]
async fn retrieval_failure_falls_back_once() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().failing_logs("stream reset"));
    let fallback = RecordingFallback::succeeding("recovered\n");
    let orchestrator = fake_orchestrator(Arc::clone(&runtime), fallback.clone(), TIMEOUT);

    let record = with_timeout(orchestrator.execute_command("echo hi")).await?;

    assert_eq!(record.output, "recovered\n");
    assert_eq!(fallback.call_count(), 1);
    assert_eq!(runtime.deleted_names().len(), 1);
    Ok(())
}

#[tokio::test]
async fn both_paths_failing_yields_error_record() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().failing_create("quota exceeded"));
    let fallback = RecordingFallback::failing();
    let orchestrator = fake_orchestrator(Arc::clone(&runtime), fallback.clone(), TIMEOUT);

    let record = with_timeout(orchestrator.execute_command("echo hi")).await?;

    assert!(record.is_hard_failure());
    assert!(record.output.starts_with("Error: "), "output: {:?}", record.output);
    assert!(record.output.contains("no such program"));
    assert!(record.end_time >= record.start_time);
    assert_eq!(fallback.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn disabled_fallback_records_sandbox_error() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new().failing_create("quota exceeded"));
    let fallback = RecordingFallback::succeeding("should not run");
    let orchestrator = Orchestrator::new(
        SandboxClient::new(Arc::clone(&runtime), fast_sandbox_options()),
        fallback.clone(),
        OrchestratorOptions {
            timeout: TIMEOUT,
            fallback_enabled: false,
        },
    );

    let record = orchestrator.execute_command("echo hi").await?;

    assert!(record.is_hard_failure());
    assert!(record.output.contains("quota exceeded"));
    assert_eq!(fallback.call_count(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_executions_use_distinct_unit_names() -> TestResult {
    init_tracing();

    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = Arc::new(fake_orchestrator(
        Arc::clone(&runtime),
        RecordingFallback::failing(),
        TIMEOUT,
    ));

    let mut handles = Vec::new();
    for i in 0..50 {
        let orchestrator = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            let task = Task::new(format!("t{i}"), format!("echo run {i}"));
            orchestrator.execute(&task).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let record = with_timeout(handle).await??;
        assert_eq!(record.output, format!("run {i}\n"));
        assert_eq!(record.outcome, ExecutionOutcome::Sandbox);
    }

    let created: HashSet<String> = runtime.created_names().into_iter().collect();
    assert_eq!(created.len(), 50);

    let deleted: HashSet<String> = runtime.deleted_names().into_iter().collect();
    assert_eq!(deleted, created);
    assert_eq!(runtime.deleted_names().len(), 50);
    Ok(())
}

#[tokio::test]
async fn record_serializes_with_camel_case_fields() -> TestResult {
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = fake_orchestrator(runtime, RecordingFallback::failing(), TIMEOUT);

    let record = orchestrator.execute_command("echo json").await?;
    let value = serde_json::to_value(&record)?;

    assert!(value.get("startTime").is_some());
    assert!(value.get("endTime").is_some());
    assert_eq!(value["output"], "json\n");
    assert_eq!(value["outcome"], "sandbox");
    Ok(())
}
