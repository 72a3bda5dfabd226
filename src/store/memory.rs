// src/store/memory.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;

use super::TaskRepository;
use crate::errors::Result;
use crate::types::Task;
use crate::validator;

#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<Mutex<BTreeMap<String, Task>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository. Each task goes through `save`, so unsafe commands
    /// are refused here too.
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self> {
        let repo = Self::new();
        for task in tasks {
            repo.save(task)?;
        }
        Ok(repo)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Task>>> {
        self.tasks
            .lock()
            .map_err(|_| anyhow!("task repository lock poisoned").into())
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn find_all(&self) -> Result<Vec<Task>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn search_by_name(&self, needle: &str) -> Result<Vec<Task>> {
        let needle = needle.to_lowercase();
        Ok(self
            .lock()?
            .values()
            .filter(|task| task.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    fn save(&self, task: Task) -> Result<Task> {
        validator::check_task_command(task.command.as_deref())?;
        self.lock()?.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.lock()?.remove(id).is_some())
    }
}
