//! Service wiring: the entity store, the task queue, and the worker pool.
//!
//! The HTTP handlers call agents synchronously against the shared entity
//! store; the queue exists for fire-and-forget submissions and the periodic
//! sweeps (rebalance, disruption scan) that run without an HTTP trigger.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;

use supplymesh_agents::tasks::{register_agent_tasks, task_names};
use supplymesh_core::{AgentError, AgentResult};
use supplymesh_queue::{
    InMemoryTaskStore, Task, TaskId, TaskRunner, TaskStats, TaskStore, WorkerConfig, WorkerHandle,
};
use supplymesh_storage::{EntityStore, InMemoryEntityStore};

/// Interval for the unattended rebalance sweep.
const REBALANCE_SWEEP: Duration = Duration::from_secs(300);
/// Interval for the unattended disruption scan.
const DISRUPTION_SWEEP: Duration = Duration::from_secs(600);

/// Task names accepted over the submission endpoint. Anything else is
/// rejected before it reaches the queue.
const SUBMITTABLE_TASKS: &[&str] = &[
    task_names::FORECAST,
    task_names::REBALANCE,
    task_names::ROUTE_PLAN,
    task_names::DISRUPTION_SCAN,
    task_names::VISION_INSPECT,
    task_names::EXPLAIN,
];

/// Shared application services handed to every handler.
pub struct AppServices {
    entities: Arc<dyn EntityStore>,
    tasks: Arc<InMemoryTaskStore>,
    workers: Mutex<Option<WorkerHandle>>,
    started_at: DateTime<Utc>,
}

/// Wire the store, register the agent handlers, and start the worker pool
/// with the periodic sweeps attached.
pub fn build_services() -> AgentResult<AppServices> {
    let entities: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
    let tasks = InMemoryTaskStore::arc();

    let mut runner = TaskRunner::new(Arc::clone(&tasks));
    register_agent_tasks(&mut runner, Arc::clone(&entities));
    runner.schedule_periodic(task_names::REBALANCE, json!({}), REBALANCE_SWEEP)?;
    runner.schedule_periodic(task_names::DISRUPTION_SCAN, json!({}), DISRUPTION_SWEEP)?;

    let workers = runner.spawn(WorkerConfig::default().with_name("supplymesh-worker"));

    Ok(AppServices {
        entities,
        tasks,
        workers: Mutex::new(Some(workers)),
        started_at: Utc::now(),
    })
}

impl AppServices {
    pub fn entities(&self) -> &dyn EntityStore {
        self.entities.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Enqueue a named task for asynchronous execution by the worker pool.
    pub fn submit_task(&self, name: &str, args: serde_json::Value) -> AgentResult<TaskId> {
        if !SUBMITTABLE_TASKS.contains(&name) {
            return Err(AgentError::not_found(format!("no task named {name}")));
        }
        self.tasks
            .enqueue(Task::new(name, args))
            .map_err(|e| AgentError::unhandled(format!("enqueue failed: {e}")))
    }

    pub fn task(&self, id: TaskId) -> AgentResult<Option<Task>> {
        self.tasks
            .get(id)
            .map_err(|e| AgentError::unhandled(format!("task lookup failed: {e}")))
    }

    pub fn queue_stats(&self) -> AgentResult<TaskStats> {
        self.tasks
            .stats()
            .map_err(|e| AgentError::unhandled(format!("queue stats failed: {e}")))
    }

    /// Stop the worker pool. Safe to call once; later calls are a no-op.
    pub fn shutdown_workers(&self) {
        let handle = self.workers.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }
}

impl Drop for AppServices {
    fn drop(&mut self) {
        self.shutdown_workers();
    }
}
