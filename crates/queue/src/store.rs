//! Task storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::task::{Task, TaskId, TaskStatus};

/// Task store abstraction.
pub trait TaskStore: Send + Sync {
    /// Enqueue a new task.
    fn enqueue(&self, task: Task) -> Result<TaskId, TaskStoreError>;

    /// Get a task by ID.
    fn get(&self, task_id: TaskId) -> Result<Option<Task>, TaskStoreError>;

    /// Update a task.
    fn update(&self, task: &Task) -> Result<(), TaskStoreError>;

    /// Claim the oldest task that is ready to run at `now`, marking it
    /// running. Returns None when nothing is claimable.
    fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<Task>, TaskStoreError>;

    /// List tasks, optionally filtered by status discriminant, oldest first.
    fn list_by_status(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<Task>, TaskStoreError>;

    /// List tasks for one handler name, oldest first.
    fn list_by_name(&self, name: &str, limit: usize) -> Result<Vec<Task>, TaskStoreError>;

    /// Queue statistics.
    fn stats(&self) -> Result<TaskStats, TaskStoreError>;
}

/// Task store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskStoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("task already exists: {0}")]
    AlreadyExists(TaskId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Queue statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TaskStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

/// In-memory task store.
#[derive(Debug)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> TaskStoreError {
    TaskStoreError::Storage("task store lock poisoned".to_string())
}

impl TaskStore for InMemoryTaskStore {
    fn enqueue(&self, task: Task) -> Result<TaskId, TaskStoreError> {
        let mut tasks = self.tasks.write().map_err(|_| poisoned())?;
        if tasks.contains_key(&task.id) {
            return Err(TaskStoreError::AlreadyExists(task.id));
        }
        let id = task.id;
        tasks.insert(id, task);
        Ok(id)
    }

    fn get(&self, task_id: TaskId) -> Result<Option<Task>, TaskStoreError> {
        let tasks = self.tasks.read().map_err(|_| poisoned())?;
        Ok(tasks.get(&task_id).cloned())
    }

    fn update(&self, task: &Task) -> Result<(), TaskStoreError> {
        let mut tasks = self.tasks.write().map_err(|_| poisoned())?;
        if !tasks.contains_key(&task.id) {
            return Err(TaskStoreError::NotFound(task.id));
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<Task>, TaskStoreError> {
        let mut tasks = self.tasks.write().map_err(|_| poisoned())?;

        // Oldest ready task first (FIFO by creation time).
        let mut candidates: Vec<_> = tasks
            .values()
            .filter(|t| {
                let claimable = match &t.status {
                    TaskStatus::Pending => true,
                    TaskStatus::Failed { .. } => !t.is_terminal(),
                    _ => false,
                };
                claimable && t.is_ready(now)
            })
            .map(|t| (t.created_at, t.id))
            .collect();
        candidates.sort();

        if let Some(&(_, task_id)) = candidates.first() {
            if let Some(task) = tasks.get_mut(&task_id) {
                task.mark_running();
                return Ok(Some(task.clone()));
            }
        }

        Ok(None)
    }

    fn list_by_status(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<Task>, TaskStoreError> {
        let tasks = self.tasks.read().map_err(|_| poisoned())?;
        let mut result: Vec<_> = tasks
            .values()
            .filter(|t| {
                status
                    .as_ref()
                    .is_none_or(|s| std::mem::discriminant(&t.status) == std::mem::discriminant(s))
            })
            .cloned()
            .collect();
        result.sort_by_key(|t| t.created_at);
        result.truncate(limit);
        Ok(result)
    }

    fn list_by_name(&self, name: &str, limit: usize) -> Result<Vec<Task>, TaskStoreError> {
        let tasks = self.tasks.read().map_err(|_| poisoned())?;
        let mut result: Vec<_> = tasks.values().filter(|t| t.name == name).cloned().collect();
        result.sort_by_key(|t| t.created_at);
        result.truncate(limit);
        Ok(result)
    }

    fn stats(&self) -> Result<TaskStats, TaskStoreError> {
        let tasks = self.tasks.read().map_err(|_| poisoned())?;
        let mut stats = TaskStats::default();
        for task in tasks.values() {
            match &task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed { .. } => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}

impl TaskStore for Arc<InMemoryTaskStore> {
    fn enqueue(&self, task: Task) -> Result<TaskId, TaskStoreError> {
        (**self).enqueue(task)
    }

    fn get(&self, task_id: TaskId) -> Result<Option<Task>, TaskStoreError> {
        (**self).get(task_id)
    }

    fn update(&self, task: &Task) -> Result<(), TaskStoreError> {
        (**self).update(task)
    }

    fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<Task>, TaskStoreError> {
        (**self).claim_next(now)
    }

    fn list_by_status(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<Task>, TaskStoreError> {
        (**self).list_by_status(status, limit)
    }

    fn list_by_name(&self, name: &str, limit: usize) -> Result<Vec<Task>, TaskStoreError> {
        (**self).list_by_name(name, limit)
    }

    fn stats(&self) -> Result<TaskStats, TaskStoreError> {
        (**self).stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::RetryPolicy;
    use std::time::Duration;

    #[test]
    fn enqueue_and_claim_fifo() {
        let store = InMemoryTaskStore::new();

        let first = Task::new("agents.forecast", serde_json::json!({}));
        let second = Task::new("agents.rebalance", serde_json::json!({}));
        let first_id = store.enqueue(first).unwrap();
        let second_id = store.enqueue(second).unwrap();

        let claimed = store.claim_next(Utc::now()).unwrap().unwrap();
        assert_eq!(claimed.id, first_id);
        assert!(matches!(claimed.status, TaskStatus::Running));

        let claimed = store.claim_next(Utc::now()).unwrap().unwrap();
        assert_eq!(claimed.id, second_id);

        assert!(store.claim_next(Utc::now()).unwrap().is_none());
    }

    #[test]
    fn same_instant_tasks_claim_in_id_order() {
        let store = InMemoryTaskStore::new();
        let created_at = Utc::now();

        // Pin every task to one creation instant so ordering falls back to
        // the id tie-break.
        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut task = Task::new("agents.forecast", serde_json::json!({}));
            task.created_at = created_at;
            ids.push(store.enqueue(task).unwrap());
        }
        ids.sort();

        for expected in ids {
            let claimed = store.claim_next(Utc::now()).unwrap().unwrap();
            assert_eq!(claimed.id, expected);
        }
    }

    #[test]
    fn scheduled_task_is_not_claimable_early() {
        let store = InMemoryTaskStore::new();
        let now = Utc::now();
        let task = Task::new("agents.forecast", serde_json::json!({}))
            .scheduled_at(now + chrono::Duration::minutes(5));
        store.enqueue(task).unwrap();

        assert!(store.claim_next(now).unwrap().is_none());
        assert!(store
            .claim_next(now + chrono::Duration::minutes(6))
            .unwrap()
            .is_some());
    }

    #[test]
    fn terminal_failure_is_not_reclaimed() {
        let store = InMemoryTaskStore::new();
        let task = Task::new("agents.forecast", serde_json::json!({}));
        store.enqueue(task).unwrap();

        let mut claimed = store.claim_next(Utc::now()).unwrap().unwrap();
        claimed.mark_failed("boom".to_string(), Utc::now());
        store.update(&claimed).unwrap();

        assert!(store.claim_next(Utc::now()).unwrap().is_none());
        assert_eq!(store.stats().unwrap().failed, 1);
    }

    #[test]
    fn retriable_failure_is_reclaimed_after_backoff() {
        let store = InMemoryTaskStore::new();
        let task = Task::new("agents.forecast", serde_json::json!({})).with_retry_policy(
            RetryPolicy::exponential(2, Duration::from_millis(10), Duration::from_millis(10)),
        );
        store.enqueue(task).unwrap();

        let mut claimed = store.claim_next(Utc::now()).unwrap().unwrap();
        claimed.mark_failed("transient".to_string(), Utc::now());
        store.update(&claimed).unwrap();

        let reclaimed = store
            .claim_next(Utc::now() + chrono::Duration::seconds(1))
            .unwrap()
            .unwrap();
        assert_eq!(reclaimed.id, claimed.id);
        assert_eq!(reclaimed.attempt, 2);
    }

    #[test]
    fn stats_track_status_counts() {
        let store = InMemoryTaskStore::new();
        for _ in 0..3 {
            store
                .enqueue(Task::new("agents.forecast", serde_json::json!({})))
                .unwrap();
        }
        store.claim_next(Utc::now()).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.running, 1);
    }
}
