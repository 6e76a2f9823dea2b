//! Task types and retry semantics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use supplymesh_core::TaskOutcome;

/// Unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task execution status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued, waiting to be picked up.
    Pending,
    /// Currently being executed.
    Running,
    /// Completed successfully.
    Completed,
    /// Failed. Claimable again only while attempts remain.
    Failed { error: String, attempt: u32 },
}

impl TaskStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, TaskStatus::Failed { .. })
    }
}

/// Retry policy. The default is a single attempt: a task does not run again
/// unless a policy explicitly allows it, and periodic tasks rely on the next
/// scheduled run instead of retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts allowed (1 = no retries).
    pub max_attempts: u32,
    /// Delay between attempts.
    pub base_delay: Duration,
    /// Cap on the computed delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: base * 2^(attempt-1), capped at `max_delay`.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Whether another attempt is allowed after `attempt` attempts have run.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before attempt number `attempt` (1-indexed), with a small
    /// deterministic jitter so parallel retries do not align.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let exp = 2_f64.powi((attempt - 2) as i32);
        let delay_ms = (base_ms * exp).min(max_ms);

        let pseudo_random = ((attempt as f64 * 17.0) % 100.0) / 100.0;
        let jitter = delay_ms * 0.1 * (pseudo_random - 0.5) * 2.0;

        Duration::from_millis((delay_ms + jitter).max(0.0) as u64)
    }
}

/// Record of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAttempt {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A named task invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Handler name, e.g. `agents.forecast`.
    pub name: String,
    /// JSON arguments passed to the handler.
    pub args: serde_json::Value,
    pub status: TaskStatus,
    pub retry_policy: RetryPolicy,
    /// Attempts run so far (starts at 0).
    pub attempt: u32,
    /// Wall-clock budget per attempt. An attempt that overruns it is marked
    /// failed and its eventual result discarded.
    pub deadline: Option<Duration>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest time the task may run (periodic/backoff scheduling).
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Structured result of the final attempt.
    pub outcome: Option<TaskOutcome>,
    pub history: Vec<TaskAttempt>,
}

impl Task {
    pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            name: name.into(),
            args,
            status: TaskStatus::Pending,
            retry_policy: RetryPolicy::default(),
            attempt: 0,
            deadline: None,
            created_at: now,
            updated_at: now,
            scheduled_at: None,
            outcome: None,
            history: Vec::new(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Schedule the task for later execution.
    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Whether the task may run at `now`.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.scheduled_at {
            Some(at) => now >= at,
            None => true,
        }
    }

    /// Completed, or failed with no attempts left.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            TaskStatus::Completed => true,
            TaskStatus::Failed { .. } => !self.retry_policy.should_retry(self.attempt),
            _ => false,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.attempt += 1;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, outcome: TaskOutcome, started_at: DateTime<Utc>) {
        let now = Utc::now();
        self.status = TaskStatus::Completed;
        self.outcome = Some(outcome);
        self.updated_at = now;
        self.history.push(TaskAttempt {
            attempt: self.attempt,
            started_at,
            finished_at: now,
            success: true,
            error: None,
            duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
        });
    }

    /// Record a failed attempt. If attempts remain the task is rescheduled
    /// with backoff; either way the structured error outcome is kept.
    pub fn mark_failed(&mut self, error: String, started_at: DateTime<Utc>) {
        let now = Utc::now();
        self.updated_at = now;
        self.outcome = Some(TaskOutcome::error(error.clone()));
        self.history.push(TaskAttempt {
            attempt: self.attempt,
            started_at,
            finished_at: now,
            success: false,
            error: Some(error.clone()),
            duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
        });

        if self.retry_policy.should_retry(self.attempt) {
            let delay = self.retry_policy.delay_for_attempt(self.attempt + 1);
            self.scheduled_at = Some(now + chrono::Duration::from_std(delay).unwrap_or_default());
        }
        self.status = TaskStatus::Failed {
            error,
            attempt: self.attempt,
        };
    }
}
