use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use taskrun::sandbox::{SandboxRuntime, UnitPhase, UnitSpec};

/// A scripted, in-memory sandbox substrate.
///
/// - records every create/delete call (and when each create happened) so
///   tests can check cleanup and ordering
/// - replays a fixed sequence of phases per unit (the last entry repeats)
/// - "runs" `sh -c "echo ..."` by echoing the text into the unit's logs
#[derive(Debug)]
pub struct FakeRuntime {
    create_error: Option<String>,
    create_lands: bool,
    delete_delay: Option<Duration>,
    logs_error: Option<String>,
    delete_error: Option<String>,
    logs: Option<String>,
    phases: Vec<Option<UnitPhase>>,
    state: Mutex<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    create_calls: usize,
    created: Vec<UnitSpec>,
    created_at: Vec<DateTime<Utc>>,
    deleted: Vec<String>,
    polls: HashMap<String, usize>,
    log_calls: usize,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    /// Units go not-observable → Pending → Running → Succeeded.
    pub fn new() -> Self {
        Self {
            create_error: None,
            create_lands: false,
            delete_delay: None,
            logs_error: None,
            delete_error: None,
            logs: None,
            phases: vec![
                None,
                Some(UnitPhase::Pending),
                Some(UnitPhase::Running),
                Some(UnitPhase::Succeeded),
            ],
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn failing_create(mut self, msg: &str) -> Self {
        self.create_error = Some(msg.to_string());
        self
    }

    /// The unit is created, but the caller sees `msg` as the create error,
    /// as when the response to an accepted request is lost.
    pub fn lost_create_response(mut self, msg: &str) -> Self {
        self.create_error = Some(msg.to_string());
        self.create_lands = true;
        self
    }

    /// Each delete call takes `delay` before it is recorded.
    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }

    pub fn failing_logs(mut self, msg: &str) -> Self {
        self.logs_error = Some(msg.to_string());
        self
    }

    pub fn failing_delete(mut self, msg: &str) -> Self {
        self.delete_error = Some(msg.to_string());
        self
    }

    pub fn with_logs(mut self, logs: &str) -> Self {
        self.logs = Some(logs.to_string());
        self
    }

    pub fn with_phases(mut self, phases: Vec<Option<UnitPhase>>) -> Self {
        self.phases = phases;
        self
    }

    /// Units stay `Running` forever.
    pub fn never_terminal(self) -> Self {
        self.with_phases(vec![Some(UnitPhase::Pending), Some(UnitPhase::Running)])
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn created_specs(&self) -> Vec<UnitSpec> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created_specs().into_iter().map(|s| s.name).collect()
    }

    /// Timestamps of successful (or landed) create calls, in call order.
    pub fn created_at(&self) -> Vec<DateTime<Utc>> {
        self.state.lock().unwrap().created_at.clone()
    }

    /// Units that exist on the substrate and were never deleted.
    pub fn live_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .created
            .iter()
            .map(|s| s.name.clone())
            .filter(|name| !state.deleted.contains(name))
            .collect()
    }

    pub fn deleted_names(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn log_calls(&self) -> usize {
        self.state.lock().unwrap().log_calls
    }

    /// Number of delete calls issued for `name`.
    pub fn delete_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .deleted
            .iter()
            .filter(|n| n.as_str() == name)
            .count()
    }

    fn simulated_output(spec: &UnitSpec) -> String {
        match spec.command.as_slice() {
            [sh, flag, script] if sh == "sh" && flag == "-c" => script
                .strip_prefix("echo ")
                .map(|text| format!("{text}\n"))
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}

impl SandboxRuntime for FakeRuntime {
    fn create_unit<'a>(
        &'a self,
        spec: &'a UnitSpec,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.create_calls += 1;
            if self.create_error.is_none() || self.create_lands {
                state.created.push(spec.clone());
                state.created_at.push(Utc::now());
            }
            match &self.create_error {
                Some(msg) => Err(anyhow!("{msg}")),
                None => Ok(()),
            }
        })
    }

    fn unit_phase<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UnitPhase>>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let polls = state.polls.entry(name.to_string()).or_insert(0);
            let idx = (*polls).min(self.phases.len().saturating_sub(1));
            *polls += 1;
            Ok(self.phases.get(idx).copied().flatten())
        })
    }

    fn unit_logs<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.log_calls += 1;
            if let Some(msg) = &self.logs_error {
                return Err(anyhow!("{msg}"));
            }
            if let Some(logs) = &self.logs {
                return Ok(logs.clone());
            }
            let spec = state
                .created
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| anyhow!("unit '{name}' not found"))?;
            Ok(Self::simulated_output(spec))
        })
    }

    fn delete_unit<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(delay) = self.delete_delay {
                tokio::time::sleep(delay).await;
            }
            let mut state = self.state.lock().unwrap();
            state.deleted.push(name.to_string());
            if let Some(msg) = &self.delete_error {
                return Err(anyhow!("{msg}"));
            }
            Ok(())
        })
    }
}
