// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod sandbox;
pub mod store;
pub mod types;
pub mod validator;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::engine::{Orchestrator, TaskService};
use crate::exec::LocalExecutor;
use crate::sandbox::{KubeRuntime, SandboxClient};
use crate::store::InMemoryTaskRepository;
use crate::types::ExecutionRecord;

/// Orchestrator wired to the production substrate and local fallback.
pub type KubeOrchestrator = Orchestrator<KubeRuntime, LocalExecutor>;

/// Build the production orchestrator from validated config.
pub fn build_orchestrator(cfg: &ConfigFile) -> KubeOrchestrator {
    let runtime = Arc::new(KubeRuntime::new(cfg.sandbox.namespace.clone()));
    let sandbox = SandboxClient::new(runtime, cfg.sandbox_options());
    Orchestrator::new(sandbox, cfg.local_executor(), cfg.orchestrator_options())
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the Kubernetes-backed orchestrator with its local fallback
/// - a task repository seeded from the config
///
/// and then executes either an ad-hoc `--command` or each `--task`, printing
/// one JSON execution record per execution to stdout.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let orchestrator = Arc::new(build_orchestrator(&cfg));

    if let Some(command) = args.command.as_deref() {
        let record = orchestrator.execute_command(command).await?;
        print_record(&record)?;
        if record.is_hard_failure() {
            bail!("command execution failed");
        }
        return Ok(());
    }

    if args.tasks.is_empty() {
        bail!("nothing to do: pass --task <ID> or --command <CMD>");
    }

    let repo = InMemoryTaskRepository::with_tasks(cfg.tasks())?;
    let service = TaskService::new(repo, orchestrator);

    let mut failed = Vec::new();
    for id in args.tasks.iter() {
        let record = service.execute_task(id).await?;
        print_record(&record)?;
        if record.is_hard_failure() {
            failed.push(id.as_str());
        }
    }

    if !failed.is_empty() {
        bail!("execution failed for task(s): {}", failed.join(", "));
    }

    Ok(())
}

/// Load the config at `path`, or the default location.
///
/// An explicitly requested file must exist. When falling back to the default
/// location and nothing is there, built-in defaults are used.
fn load_config(path: Option<&str>) -> Result<ConfigFile> {
    let (path, explicit) = match path {
        Some(p) => (PathBuf::from(p), true),
        None => (default_config_path(), false),
    };

    if !explicit && !path.exists() {
        debug!(path = %path.display(), "no config file found; using defaults");
        return Ok(ConfigFile::try_from(RawConfigFile::default())?);
    }

    info!(path = %path.display(), "loading config");
    Ok(load_and_validate(&path)?)
}

fn print_record(record: &ExecutionRecord) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Simple dry-run output: print sandbox settings, the denylist and tasks.
fn print_dry_run(cfg: &ConfigFile) {
    println!("taskrun dry-run");
    println!(
        "  sandbox.namespace = {}",
        cfg.sandbox.namespace.as_deref().unwrap_or("<client default>")
    );
    println!("  sandbox.image = {}", cfg.sandbox.image);
    println!("  sandbox.timeout_secs = {}", cfg.sandbox.timeout_secs);
    println!("  sandbox.poll_interval_ms = {}", cfg.sandbox.poll_interval_ms);
    println!("  fallback.enabled = {}", cfg.fallback.enabled);
    println!("  fallback.timeout_secs = {}", cfg.fallback.timeout_secs);
    println!();

    println!("denylist:");
    print!("{}", validator::RuleTable);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (id, task) in cfg.task.iter() {
        println!("  - {id}");
        if !task.name.is_empty() {
            println!("      name: {}", task.name);
        }
        if !task.owner.is_empty() {
            println!("      owner: {}", task.owner);
        }
        if let Some(ref command) = task.command {
            println!("      command: {command}");
        }
    }

    debug!("dry-run complete (no execution)");
}
