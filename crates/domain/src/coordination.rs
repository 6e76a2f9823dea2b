use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use supplymesh_core::{AgentError, AgentResult, CoordinationId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationEvent {
    RebalanceTriggered,
    RouteUpdated,
    DisruptionHandled,
    InspectionAlert,
    ConflictResolved,
    SystemHealthCheck,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// `initiated → in_progress → completed | failed`. Terminal exactly once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationStatus {
    Initiated,
    InProgress,
    Completed,
    Failed,
}

impl CoordinationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CoordinationStatus::Completed | CoordinationStatus::Failed)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
    /// Not attempted because an earlier step failed.
    Skipped,
}

/// One entry in a coordination run's execution timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStep {
    /// 1-based step index.
    pub step: u32,
    pub agent: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub status: StepStatus,
}

/// The auditable record of one orchestrated multi-agent run.
///
/// Mutated only by the coordinator that owns it. The timeline always ends up
/// with exactly one entry per involved agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordination {
    pub id: CoordinationId,
    pub event_type: CoordinationEvent,
    pub involved_agents: Vec<String>,
    pub coordination_data: JsonValue,
    pub priority: Priority,
    pub status: CoordinationStatus,
    pub execution_timeline: Vec<TimelineStep>,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, when (and only when) a terminal state is reached.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Coordination {
    pub fn new(
        event_type: CoordinationEvent,
        involved_agents: Vec<String>,
        coordination_data: JsonValue,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CoordinationId::new(),
            event_type,
            involved_agents,
            coordination_data,
            priority,
            status: CoordinationStatus::Initiated,
            execution_timeline: Vec::new(),
            created_at,
            completed_at: None,
        }
    }

    /// `initiated → in_progress`.
    pub fn begin(&mut self) -> AgentResult<()> {
        if self.status != CoordinationStatus::Initiated {
            return Err(AgentError::invalid_state(format!(
                "coordination {} is {:?}, expected initiated",
                self.id, self.status
            )));
        }
        self.status = CoordinationStatus::InProgress;
        Ok(())
    }

    pub fn record_step(&mut self, agent: &str, action: impl Into<String>, status: StepStatus, at: DateTime<Utc>) {
        let step = self.execution_timeline.len() as u32 + 1;
        self.execution_timeline.push(TimelineStep {
            step,
            agent: agent.to_string(),
            action: action.into(),
            timestamp: at,
            status,
        });
    }

    /// `in_progress → completed`.
    pub fn complete(&mut self, at: DateTime<Utc>) -> AgentResult<()> {
        self.finish(CoordinationStatus::Completed, at)
    }

    /// `in_progress → failed`.
    pub fn fail(&mut self, at: DateTime<Utc>) -> AgentResult<()> {
        self.finish(CoordinationStatus::Failed, at)
    }

    fn finish(&mut self, terminal: CoordinationStatus, at: DateTime<Utc>) -> AgentResult<()> {
        if self.status != CoordinationStatus::InProgress {
            return Err(AgentError::invalid_state(format!(
                "coordination {} is {:?}, expected in_progress",
                self.id, self.status
            )));
        }
        self.status = terminal;
        self.completed_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn coordination(agents: Vec<String>) -> Coordination {
        Coordination::new(
            CoordinationEvent::DisruptionHandled,
            agents,
            json!({}),
            Priority::Medium,
            Utc::now(),
        )
    }

    #[test]
    fn lifecycle_sets_completed_at_exactly_once() {
        let mut c = coordination(vec!["a".into()]);
        assert!(c.completed_at.is_none());
        c.begin().unwrap();
        let at = Utc::now();
        c.complete(at).unwrap();
        assert_eq!(c.completed_at, Some(at));
        assert!(c.complete(Utc::now()).is_err());
        assert!(c.fail(Utc::now()).is_err());
        assert_eq!(c.completed_at, Some(at));
    }

    #[test]
    fn cannot_finish_before_beginning() {
        let mut c = coordination(vec![]);
        assert!(c.complete(Utc::now()).is_err());
        assert!(c.begin().is_ok());
        assert!(c.begin().is_err());
    }

    #[test]
    fn steps_are_numbered_in_order() {
        let mut c = coordination(vec!["x".into(), "y".into()]);
        c.begin().unwrap();
        c.record_step("x", "did x", StepStatus::Completed, Utc::now());
        c.record_step("y", "did y", StepStatus::Failed, Utc::now());
        assert_eq!(
            c.execution_timeline.iter().map(|s| s.step).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    proptest! {
        #[test]
        fn terminal_iff_completed_at(fail in proptest::bool::ANY, n in 0usize..5) {
            let agents: Vec<String> = (0..n).map(|i| format!("agent-{i}")).collect();
            let mut c = coordination(agents);
            prop_assert_eq!(c.status.is_terminal(), c.completed_at.is_some());
            c.begin().unwrap();
            prop_assert_eq!(c.status.is_terminal(), c.completed_at.is_some());
            if fail {
                c.fail(Utc::now()).unwrap();
            } else {
                c.complete(Utc::now()).unwrap();
            }
            prop_assert!(c.status.is_terminal() && c.completed_at.is_some());
        }
    }
}
