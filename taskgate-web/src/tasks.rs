//! In-memory task list behind the gated pages

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub done: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct TaskState {
    tasks: BTreeMap<u64, Task>,
    next_id: u64,
}

/// Shared task list; clones see the same tasks
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    state: Arc<RwLock<TaskState>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks in creation order
    pub async fn list(&self) -> Vec<Task> {
        self.state.read().await.tasks.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.tasks.len()
    }

    pub async fn get(&self, id: u64) -> Option<Task> {
        self.state.read().await.tasks.get(&id).cloned()
    }

    pub async fn create(&self, title: &str, created_by: &str) -> Task {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let now = Utc::now();
        let task = Task {
            id: state.next_id,
            title: title.to_string(),
            done: false,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());
        task
    }

    pub async fn update(&self, id: u64, title: &str, done: bool) -> Option<Task> {
        let mut state = self.state.write().await;
        let task = state.tasks.get_mut(&id)?;
        task.title = title.to_string();
        task.done = done;
        task.updated_at = Utc::now();
        Some(task.clone())
    }

    pub async fn delete(&self, id: u64) -> bool {
        self.state.write().await.tasks.remove(&id).is_some()
    }
}
