// src/store/mod.rs

//! Task persistence seam.
//!
//! Durable storage is owned by whoever embeds this crate; the engine only
//! needs to look a task up and save it back with its new execution appended.
//! [`memory::InMemoryTaskRepository`] is the implementation used by the CLI
//! and the tests.

pub mod memory;

use std::fmt::Debug;

use crate::errors::Result;
use crate::types::Task;

pub use memory::InMemoryTaskRepository;

/// Abstract task storage.
pub trait TaskRepository: Send + Sync + Debug {
    fn find_all(&self) -> Result<Vec<Task>>;
    fn find_by_id(&self, id: &str) -> Result<Option<Task>>;

    /// Tasks whose name contains `needle`, ignoring case.
    fn search_by_name(&self, needle: &str) -> Result<Vec<Task>>;

    /// Insert or replace a task. Tasks with unsafe commands are refused.
    fn save(&self, task: Task) -> Result<Task>;

    /// Remove a task. Returns `false` if it did not exist.
    fn delete(&self, id: &str) -> Result<bool>;
}
