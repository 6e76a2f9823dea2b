//! The coordinator state machine.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tracing::{info, warn};

use supplymesh_core::{AgentResult, TaskOutcome};
use supplymesh_domain::{Coordination, CoordinationEvent, Metric, Priority, StepStatus};
use supplymesh_storage::EntityStore;

use supplymesh_agents::agent::names;
use supplymesh_agents::models::hash_fraction_in;

/// What to record for one coordination run.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinationRequest {
    pub event_type: CoordinationEvent,
    /// Agent names, in execution order. One timeline entry each.
    pub involved_agents: Vec<String>,
    #[serde(default)]
    pub coordination_data: JsonValue,
    #[serde(default = "default_priority")]
    pub priority: Priority,
}

fn default_priority() -> Priority {
    Priority::Medium
}

/// Executes one coordination step for one agent, returning the action
/// description recorded in the timeline.
pub trait StepExecutor: Send + Sync {
    fn run_step(
        &self,
        store: &dyn EntityStore,
        agent: &str,
        coordination_data: &JsonValue,
        as_of: DateTime<Utc>,
    ) -> AgentResult<String>;
}

/// Default executor: acknowledges each agent without re-invoking it. The
/// coordinator aggregates outcomes that already happened; it does not
/// recompute them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcknowledgeSteps;

impl StepExecutor for AcknowledgeSteps {
    fn run_step(
        &self,
        _store: &dyn EntityStore,
        agent: &str,
        _coordination_data: &JsonValue,
        _as_of: DateTime<Utc>,
    ) -> AgentResult<String> {
        Ok(format!("Coordinated with {agent}"))
    }
}

/// Sequences the involved agents and writes the auditable record.
///
/// `initiated → in_progress → completed | failed`; `completed_at` is set
/// exactly once, on the terminal transition. A step failure marks that step
/// failed, skips the rest, and fails the run; the timeline still gets one
/// entry per involved agent.
pub struct Coordinator<X = AcknowledgeSteps> {
    steps: X,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self {
            steps: AcknowledgeSteps,
        }
    }
}

impl<X: StepExecutor> Coordinator<X> {
    pub fn with_steps(steps: X) -> Self {
        Self { steps }
    }

    pub fn name(&self) -> &'static str {
        names::COORDINATOR
    }

    pub fn run(
        &self,
        store: &dyn EntityStore,
        request: CoordinationRequest,
        as_of: DateTime<Utc>,
    ) -> AgentResult<TaskOutcome> {
        let mut coordination = Coordination::new(
            request.event_type,
            request.involved_agents.clone(),
            request.coordination_data.clone(),
            request.priority,
            as_of,
        );
        let coordination_id = store.insert_coordination(coordination.clone())?;

        coordination.begin()?;
        store.update_coordination(&coordination)?;

        let mut failed = false;
        for agent in &request.involved_agents {
            if failed {
                coordination.record_step(agent, "Skipped after earlier failure", StepStatus::Skipped, as_of);
                continue;
            }
            match self
                .steps
                .run_step(store, agent, &request.coordination_data, as_of)
            {
                Ok(action) => {
                    coordination.record_step(agent, action, StepStatus::Completed, as_of);
                }
                Err(e) => {
                    warn!(
                        coordination_id = %coordination_id,
                        agent = %agent,
                        error = %e,
                        "coordination step failed"
                    );
                    coordination.record_step(
                        agent,
                        format!("Step failed: {e}"),
                        StepStatus::Failed,
                        as_of,
                    );
                    failed = true;
                }
            }
        }

        if failed {
            coordination.fail(as_of)?;
        } else {
            coordination.complete(as_of)?;
        }
        store.update_coordination(&coordination)?;

        let latency = hash_fraction_in(
            &[coordination_id.as_uuid().as_bytes(), b"latency"],
            100.0,
            300.0,
        );
        store.append_metric(Metric::response_time(self.name(), latency, as_of))?;

        info!(
            coordination_id = %coordination_id,
            agents = coordination.involved_agents.len(),
            status = ?coordination.status,
            "coordination run recorded"
        );

        Ok(TaskOutcome::success(json!({
            "coordination_id": coordination_id,
            "agents_coordinated": coordination.involved_agents.len(),
            "execution_steps": coordination.execution_timeline.len(),
            "coordination_status": coordination.status,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplymesh_core::{AgentError, CoordinationId};
    use supplymesh_domain::CoordinationStatus;
    use supplymesh_storage::InMemoryEntityStore;

    fn request(agents: &[&str]) -> CoordinationRequest {
        CoordinationRequest {
            event_type: CoordinationEvent::DisruptionHandled,
            involved_agents: agents.iter().map(|a| a.to_string()).collect(),
            coordination_data: json!({"action_taken": "route_updated"}),
            priority: Priority::Medium,
        }
    }

    fn stored(store: &InMemoryEntityStore, outcome: &TaskOutcome) -> supplymesh_domain::Coordination {
        let id: CoordinationId =
            serde_json::from_value(outcome.get("coordination_id").unwrap().clone()).unwrap();
        store.coordination(id).unwrap()
    }

    #[test]
    fn timeline_has_one_completed_step_per_agent_in_order() {
        let store = InMemoryEntityStore::new();
        let agents = [names::REBALANCER, names::ROUTE_PLANNER, names::DISRUPTION_MONITOR];

        let outcome = Coordinator::default()
            .run(&store, request(&agents), Utc::now())
            .unwrap();
        assert_eq!(outcome.get("execution_steps"), Some(&json!(3)));

        let coordination = stored(&store, &outcome);
        assert_eq!(coordination.status, CoordinationStatus::Completed);
        assert!(coordination.completed_at.is_some());
        assert_eq!(coordination.execution_timeline.len(), agents.len());
        for (i, step) in coordination.execution_timeline.iter().enumerate() {
            assert_eq!(step.step, i as u32 + 1);
            assert_eq!(step.agent, agents[i]);
            assert_eq!(step.status, StepStatus::Completed);
            assert_eq!(step.action, format!("Coordinated with {}", agents[i]));
        }
    }

    #[test]
    fn step_failure_fails_the_run_and_skips_the_rest() {
        struct FailSecond;
        impl StepExecutor for FailSecond {
            fn run_step(
                &self,
                _store: &dyn EntityStore,
                agent: &str,
                _data: &JsonValue,
                _as_of: DateTime<Utc>,
            ) -> AgentResult<String> {
                if agent == names::ROUTE_PLANNER {
                    Err(AgentError::invalid_state("no pending action"))
                } else {
                    Ok(format!("Coordinated with {agent}"))
                }
            }
        }

        let store = InMemoryEntityStore::new();
        let agents = [names::REBALANCER, names::ROUTE_PLANNER, names::DISRUPTION_MONITOR];
        let outcome = Coordinator::with_steps(FailSecond)
            .run(&store, request(&agents), Utc::now())
            .unwrap();

        let coordination = stored(&store, &outcome);
        assert_eq!(coordination.status, CoordinationStatus::Failed);
        assert!(coordination.completed_at.is_some());
        // Full-length timeline even on failure.
        assert_eq!(coordination.execution_timeline.len(), 3);
        assert_eq!(coordination.execution_timeline[0].status, StepStatus::Completed);
        assert_eq!(coordination.execution_timeline[1].status, StepStatus::Failed);
        assert_eq!(coordination.execution_timeline[2].status, StepStatus::Skipped);
    }

    #[test]
    fn empty_agent_list_still_completes() {
        let store = InMemoryEntityStore::new();
        let outcome = Coordinator::default()
            .run(&store, request(&[]), Utc::now())
            .unwrap();

        let coordination = stored(&store, &outcome);
        assert_eq!(coordination.status, CoordinationStatus::Completed);
        assert!(coordination.execution_timeline.is_empty());
    }

    #[test]
    fn every_run_emits_a_coordinator_metric() {
        let store = InMemoryEntityStore::new();
        let as_of = Utc::now();
        Coordinator::default()
            .run(&store, request(&[names::REBALANCER]), as_of)
            .unwrap();

        let metrics = store
            .metrics_in_range(
                names::COORDINATOR,
                None,
                as_of - chrono::Duration::minutes(1),
                as_of,
            )
            .unwrap();
        assert_eq!(metrics.len(), 1);
        assert!((100.0..300.0).contains(&metrics[0].value));
    }
}
