//! Task runner: handler registry, worker pool, periodic scheduler.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use supplymesh_core::{AgentError, AgentResult, TaskOutcome};

use super::store::TaskStore;
use super::task::{Task, TaskId};

/// Handler function: JSON arguments in, structured outcome out.
pub type TaskHandler = Arc<dyn Fn(&serde_json::Value) -> AgentResult<TaskOutcome> + Send + Sync>;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often idle workers poll for new tasks.
    pub poll_interval: Duration,
    /// Number of worker threads.
    pub workers: usize,
    /// Name prefix for worker threads and log lines.
    pub name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            workers: 4,
            name: "task-worker".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// A recurring task submission. Fires on every interval regardless of how
/// the previous run ended.
#[derive(Debug, Clone)]
pub struct PeriodicSchedule {
    pub name: String,
    pub args: serde_json::Value,
    pub interval: Duration,
}

#[derive(Debug)]
struct ScheduleState {
    schedule: PeriodicSchedule,
    next_run: DateTime<Utc>,
}

/// Runner statistics across all workers.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunnerStats {
    pub tasks_processed: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub current_running: usize,
    pub uptime_secs: u64,
}

/// Handle to a running worker pool.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdowns: Vec<mpsc::Sender<()>>,
    joins: Vec<thread::JoinHandle<()>>,
    stats: Arc<Mutex<RunnerStats>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for all threads.
    pub fn shutdown(mut self) {
        for tx in &self.shutdowns {
            let _ = tx.send(());
        }
        for join in self.joins.drain(..) {
            let _ = join.join();
        }
    }

    pub fn stats(&self) -> RunnerStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

/// Task runner.
///
/// Handlers are registered by task name before the pool is spawned. Each
/// worker claims the oldest ready task, runs its handler with panic capture
/// and an optional per-attempt deadline, and records the structured outcome.
/// A failing task never takes its worker down.
pub struct TaskRunner<S: TaskStore> {
    store: S,
    handlers: HashMap<String, TaskHandler>,
    schedules: Mutex<Vec<ScheduleState>>,
}

impl<S: TaskStore + Clone + 'static> TaskRunner<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
            schedules: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a handler for a task name.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&serde_json::Value) -> AgentResult<TaskOutcome> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Enqueue a one-shot task.
    pub fn submit(&self, name: impl Into<String>, args: serde_json::Value) -> AgentResult<TaskId> {
        self.submit_task(Task::new(name, args))
    }

    /// Enqueue a prepared task (custom retry policy, deadline, schedule).
    pub fn submit_task(&self, task: Task) -> AgentResult<TaskId> {
        self.store
            .enqueue(task)
            .map_err(|e| AgentError::unhandled(e.to_string()))
    }

    /// Register a periodic submission. Takes effect when the pool is spawned.
    pub fn schedule_periodic(
        &self,
        name: impl Into<String>,
        args: serde_json::Value,
        interval: Duration,
    ) -> AgentResult<()> {
        let schedule = PeriodicSchedule {
            name: name.into(),
            args,
            interval,
        };
        let next_run = Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default();
        self.schedules
            .lock()
            .map_err(|_| AgentError::unhandled("schedule lock poisoned"))?
            .push(ScheduleState { schedule, next_run });
        Ok(())
    }

    /// Run a task synchronously on the calling thread and return its
    /// outcome. The task is still recorded in the store.
    pub fn run_now(
        &self,
        name: impl Into<String>,
        args: serde_json::Value,
    ) -> AgentResult<TaskOutcome> {
        let mut task = Task::new(name, args);
        self.submit_task(task.clone())?;

        task.mark_running();
        self.execute_claimed(&mut task);
        task.outcome
            .clone()
            .ok_or_else(|| AgentError::unhandled("task finished without an outcome"))
    }

    /// Run one attempt of an already-claimed (running) task and persist the
    /// result. Faults are captured into the task, never returned.
    fn execute_claimed(&self, task: &mut Task) {
        let started = Utc::now();

        let Some(handler) = self.handlers.get(&task.name) else {
            let message = format!("no handler registered for task: {}", task.name);
            warn!(task_id = %task.id, task = %task.name, "{message}");
            task.mark_failed(message, started);
            self.persist(task);
            return;
        };

        let result = match task.deadline {
            Some(deadline) => {
                run_with_deadline(Arc::clone(handler), task.args.clone(), deadline, &task.name)
            }
            None => run_guarded(handler, &task.args),
        };

        match result {
            Ok(TaskOutcome::Success { payload }) => {
                debug!(task_id = %task.id, task = %task.name, "task completed");
                task.mark_completed(TaskOutcome::Success { payload }, started);
            }
            Ok(TaskOutcome::Error { message }) => {
                debug!(task_id = %task.id, task = %task.name, error = %message, "task returned error outcome");
                task.mark_failed(message, started);
            }
            Err(e) => {
                debug!(task_id = %task.id, task = %task.name, error = %e, "task failed");
                task.mark_failed(e.to_string(), started);
            }
        }

        self.persist(task);
    }

    fn persist(&self, task: &Task) {
        if let Err(e) = self.store.update(task) {
            error!(task_id = %task.id, error = %e, "failed to persist task result");
        }
    }

    /// Spawn the worker pool (plus a scheduler thread when periodic
    /// schedules are registered).
    pub fn spawn(self, config: WorkerConfig) -> WorkerHandle
    where
        S: Send + Sync,
    {
        let runner = Arc::new(self);
        let stats = Arc::new(Mutex::new(RunnerStats::default()));
        let mut shutdowns = Vec::new();
        let mut joins = Vec::new();

        for n in 0..config.workers {
            let (tx, rx) = mpsc::channel::<()>();
            let runner = Arc::clone(&runner);
            let stats = Arc::clone(&stats);
            let config = config.clone();
            let name = format!("{}-{n}", config.name);
            let join = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(runner, config, name, rx, stats));
            match join {
                Ok(join) => {
                    shutdowns.push(tx);
                    joins.push(join);
                }
                Err(e) => error!(error = %e, "failed to spawn worker thread"),
            }
        }

        let has_schedules = runner
            .schedules
            .lock()
            .map(|s| !s.is_empty())
            .unwrap_or(false);
        if has_schedules {
            let (tx, rx) = mpsc::channel::<()>();
            let runner = Arc::clone(&runner);
            let name = format!("{}-scheduler", config.name);
            let join = thread::Builder::new()
                .name(name.clone())
                .spawn(move || scheduler_loop(runner, name, rx));
            match join {
                Ok(join) => {
                    shutdowns.push(tx);
                    joins.push(join);
                }
                Err(e) => error!(error = %e, "failed to spawn scheduler thread"),
            }
        }

        WorkerHandle {
            shutdowns,
            joins,
            stats,
        }
    }
}

/// Run the handler on this thread with panic capture.
fn run_guarded(handler: &TaskHandler, args: &serde_json::Value) -> AgentResult<TaskOutcome> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(args))) {
        Ok(result) => result,
        Err(payload) => Err(AgentError::unhandled(format!(
            "task panicked: {}",
            panic_message(&payload)
        ))),
    }
}

/// Run the handler on a helper thread and give up after `deadline`.
///
/// On timeout the helper thread is abandoned mid-flight and its eventual
/// result discarded, so side effects it makes afterwards still count toward
/// at-least-once semantics.
fn run_with_deadline(
    handler: TaskHandler,
    args: serde_json::Value,
    deadline: Duration,
    task_name: &str,
) -> AgentResult<TaskOutcome> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("{task_name}-attempt"))
        .spawn(move || {
            let result = run_guarded(&handler, &args);
            let _ = tx.send(result);
        });

    if let Err(e) = spawned {
        return Err(AgentError::unhandled(format!(
            "failed to spawn attempt thread: {e}"
        )));
    }

    match rx.recv_timeout(deadline) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(AgentError::unhandled(format!(
            "deadline exceeded after {}ms",
            deadline.as_millis()
        ))),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(AgentError::unhandled("attempt thread vanished"))
        }
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn worker_loop<S: TaskStore + Clone + 'static>(
    runner: Arc<TaskRunner<S>>,
    config: WorkerConfig,
    name: String,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<RunnerStats>>,
) {
    info!(worker = %name, "worker started");
    let start_time = Instant::now();

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        if let Ok(mut s) = stats.lock() {
            s.uptime_secs = start_time.elapsed().as_secs();
        }

        match runner.store.claim_next(Utc::now()) {
            Ok(Some(mut task)) => {
                debug!(worker = %name, task_id = %task.id, task = %task.name, "claimed task");

                if let Ok(mut s) = stats.lock() {
                    s.current_running += 1;
                }

                runner.execute_claimed(&mut task);

                if let Ok(mut s) = stats.lock() {
                    s.current_running = s.current_running.saturating_sub(1);
                    s.tasks_processed += 1;
                    if task.status.is_failed() {
                        s.tasks_failed += 1;
                    } else {
                        s.tasks_succeeded += 1;
                    }
                }
            }
            Ok(None) => {
                thread::sleep(config.poll_interval);
            }
            Err(e) => {
                error!(worker = %name, error = %e, "failed to claim task");
                thread::sleep(config.poll_interval);
            }
        }
    }

    info!(worker = %name, "worker stopped");
}

fn scheduler_loop<S: TaskStore + Clone + 'static>(
    runner: Arc<TaskRunner<S>>,
    name: String,
    shutdown_rx: mpsc::Receiver<()>,
) {
    info!(scheduler = %name, "scheduler started");

    loop {
        // The shutdown channel doubles as the tick.
        match shutdown_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        let now = Utc::now();
        let due: Vec<PeriodicSchedule> = match runner.schedules.lock() {
            Ok(mut schedules) => {
                let mut due = Vec::new();
                for state in schedules.iter_mut() {
                    if state.next_run <= now {
                        due.push(state.schedule.clone());
                        state.next_run = now
                            + chrono::Duration::from_std(state.schedule.interval)
                                .unwrap_or_default();
                    }
                }
                due
            }
            Err(_) => {
                error!(scheduler = %name, "schedule lock poisoned");
                break;
            }
        };

        // Prior failures never block the next interval.
        for schedule in due {
            if let Err(e) = runner.submit(&schedule.name, schedule.args.clone()) {
                warn!(scheduler = %name, task = %schedule.name, error = %e, "periodic submit failed");
            } else {
                debug!(scheduler = %name, task = %schedule.name, "periodic task submitted");
            }
        }
    }

    info!(scheduler = %name, "scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTaskStore;
    use crate::task::TaskStatus;
    use serde_json::json;

    fn runner() -> (Arc<InMemoryTaskStore>, TaskRunner<Arc<InMemoryTaskStore>>) {
        let store = InMemoryTaskStore::arc();
        let runner = TaskRunner::new(store.clone());
        (store, runner)
    }

    #[test]
    fn run_now_returns_success_outcome() {
        let (_store, mut runner) = runner();
        runner.register("double", |args| {
            let n = args.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(TaskOutcome::success(json!({"doubled": n * 2})))
        });

        let outcome = runner.run_now("double", json!({"n": 21})).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.get("doubled"), Some(&json!(42)));
    }

    #[test]
    fn handler_error_becomes_structured_outcome() {
        let (store, mut runner) = runner();
        runner.register("fails", |_| {
            Err(AgentError::not_found("store deadbeef"))
        });

        let outcome = runner.run_now("fails", json!({})).unwrap();
        assert!(!outcome.is_success());

        // The task record carries the failure.
        let tasks = store.list_by_name("fails", 10).unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].status.is_failed());
    }

    #[test]
    fn panic_is_captured_as_error_outcome() {
        let (_store, mut runner) = runner();
        runner.register("explodes", |_| -> AgentResult<TaskOutcome> {
            panic!("boom");
        });

        let outcome = runner.run_now("explodes", json!({})).unwrap();
        match outcome {
            TaskOutcome::Error { message } => assert!(message.contains("boom")),
            other => panic!("expected error outcome, got {other:?}"),
        }
    }

    #[test]
    fn missing_handler_fails_the_task() {
        let (store, runner) = runner();
        let outcome = runner.run_now("unregistered", json!({})).unwrap();
        assert!(!outcome.is_success());

        let tasks = store.list_by_name("unregistered", 10).unwrap();
        assert!(tasks[0].status.is_failed());
    }

    #[test]
    fn deadline_marks_slow_task_failed() {
        let (_store, mut runner) = runner();
        runner.register("slow", |_| {
            thread::sleep(Duration::from_secs(5));
            Ok(TaskOutcome::success(json!({})))
        });

        let mut task = Task::new("slow", json!({})).with_deadline(Duration::from_millis(50));
        runner.submit_task(task.clone()).unwrap();
        task.mark_running();
        runner.execute_claimed(&mut task);

        assert!(task.status.is_failed());
        match &task.outcome {
            Some(TaskOutcome::Error { message }) => assert!(message.contains("deadline")),
            other => panic!("expected deadline error, got {other:?}"),
        }
    }

    #[test]
    fn worker_pool_drains_the_queue() {
        let (store, mut runner) = runner();
        runner.register("noop", |_| Ok(TaskOutcome::success(json!({}))));

        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(runner.submit("noop", json!({"i": i})).unwrap());
        }

        let handle = runner.spawn(
            WorkerConfig::default()
                .with_workers(2)
                .with_name("test-worker"),
        );

        // Poll until drained (bounded wait).
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let stats = store.stats().unwrap();
            if stats.completed == 5 {
                break;
            }
            assert!(Instant::now() < deadline, "queue did not drain: {stats:?}");
            thread::sleep(Duration::from_millis(20));
        }
        handle.shutdown();

        for id in ids {
            let task = store.get(id).unwrap().unwrap();
            assert!(matches!(task.status, TaskStatus::Completed));
        }
    }

    #[test]
    fn periodic_schedule_resubmits_after_failure() {
        let (store, mut runner) = runner();
        runner.register("flaky", |_| {
            Err(AgentError::unhandled("always down"))
        });
        runner
            .schedule_periodic("flaky", json!({}), Duration::from_millis(30))
            .unwrap();

        let handle = runner.spawn(
            WorkerConfig::default()
                .with_workers(1)
                .with_name("periodic-test"),
        );

        // Enough time for several intervals.
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let runs = store.list_by_name("flaky", 100).unwrap();
            let failed = runs.iter().filter(|t| t.status.is_failed()).count();
            if failed >= 2 {
                break;
            }
            assert!(Instant::now() < deadline, "periodic task did not rerun");
            thread::sleep(Duration::from_millis(20));
        }
        handle.shutdown();
    }
}
