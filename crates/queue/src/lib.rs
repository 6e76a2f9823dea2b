//! Task queue for the agent pipeline.
//!
//! Named task invocations with JSON arguments, executed at-least-once by a
//! pool of worker threads. A failing task never crashes its worker: faults
//! (including panics) are captured and recorded as a structured error
//! outcome on the task. Periodic schedules re-enqueue on every interval
//! regardless of how the previous run ended.
//!
//! ## Components
//!
//! - `Task`: an invocation with arguments, status, and attempt history
//! - `TaskStore`: persistence for tasks (in-memory for now)
//! - `TaskRunner`: handler registry + worker pool + periodic scheduler

pub mod runner;
pub mod store;
pub mod task;

pub use runner::{PeriodicSchedule, RunnerStats, TaskHandler, TaskRunner, WorkerConfig, WorkerHandle};
pub use store::{InMemoryTaskStore, TaskStats, TaskStore};
pub use task::{RetryPolicy, Task, TaskAttempt, TaskId, TaskStatus};
