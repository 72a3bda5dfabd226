use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use taskrun::exec::{FallbackExecutor, SpawnError};
use taskrun::types::CommandSpec;

/// A fallback executor that records every command it is asked to run and
/// answers with a canned result instead of spawning a process.
#[derive(Debug, Clone)]
pub struct RecordingFallback {
    output: Option<String>,
    calls: Arc<Mutex<Vec<CommandSpec>>>,
}

impl RecordingFallback {
    /// Always succeeds with `output`.
    pub fn succeeding(output: &str) -> Self {
        Self {
            output: Some(output.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always fails as if the program could not be spawned.
    pub fn failing() -> Self {
        Self {
            output: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl FallbackExecutor for RecordingFallback {
    fn run<'a>(
        &'a self,
        command: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<String, SpawnError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(command.clone());
            match &self.output {
                Some(output) => Ok(output.clone()),
                None => Err(SpawnError::Spawn {
                    program: command.program().to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no such program"),
                }),
            }
        })
    }
}
