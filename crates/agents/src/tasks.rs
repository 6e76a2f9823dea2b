//! Queue bindings: every agent as a named task handler.
//!
//! HTTP triggers call the agents directly (so the error taxonomy survives
//! into status codes); the queue path is for scheduled and fire-and-forget
//! runs, where faults become structured error outcomes instead.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use supplymesh_core::{AgentError, AgentResult};
use supplymesh_queue::{TaskRunner, TaskStore};
use supplymesh_storage::EntityStore;

use crate::agent::Agent;
use crate::disruption_monitor::DisruptionMonitorAgent;
use crate::explainer::ExplainerAgent;
use crate::forecast::ForecastAgent;
use crate::rebalancer::RebalancerAgent;
use crate::route_planner::RoutePlannerAgent;
use crate::vision_inspector::VisionInspectorAgent;

/// Queue task names, one per agent.
pub mod task_names {
    pub const FORECAST: &str = "agents.forecast";
    pub const REBALANCE: &str = "agents.rebalance";
    pub const ROUTE_PLAN: &str = "agents.route_plan";
    pub const DISRUPTION_SCAN: &str = "agents.disruption_scan";
    pub const VISION_INSPECT: &str = "agents.vision_inspect";
    pub const EXPLAIN: &str = "agents.explain";
}

/// Anchor timestamp for a run: an explicit `as_of` argument when present,
/// the submission wall clock otherwise.
fn as_of_from(args: &JsonValue) -> AgentResult<DateTime<Utc>> {
    match args.get("as_of") {
        None | Some(JsonValue::Null) => Ok(Utc::now()),
        Some(JsonValue::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AgentError::unhandled(format!("invalid as_of: {e}"))),
        Some(other) => Err(AgentError::unhandled(format!(
            "invalid as_of: expected RFC 3339 string, got {other}"
        ))),
    }
}

fn parse_input<T: DeserializeOwned>(args: &JsonValue) -> AgentResult<T> {
    serde_json::from_value(args.clone())
        .map_err(|e| AgentError::unhandled(format!("invalid task arguments: {e}")))
}

/// Register all six agents (default models) on the runner.
pub fn register_agent_tasks<S>(runner: &mut TaskRunner<S>, store: Arc<dyn EntityStore>)
where
    S: TaskStore + Clone + 'static,
{
    {
        let store = Arc::clone(&store);
        let agent = ForecastAgent::default();
        runner.register(task_names::FORECAST, move |args| {
            agent.execute(store.as_ref(), parse_input(args)?, as_of_from(args)?)
        });
    }
    {
        let store = Arc::clone(&store);
        runner.register(task_names::REBALANCE, move |args| {
            RebalancerAgent.execute(store.as_ref(), (), as_of_from(args)?)
        });
    }
    {
        let store = Arc::clone(&store);
        let agent = RoutePlannerAgent::default();
        runner.register(task_names::ROUTE_PLAN, move |args| {
            agent.execute(store.as_ref(), parse_input(args)?, as_of_from(args)?)
        });
    }
    {
        let store = Arc::clone(&store);
        let agent = DisruptionMonitorAgent::default();
        runner.register(task_names::DISRUPTION_SCAN, move |args| {
            agent.execute(store.as_ref(), (), as_of_from(args)?)
        });
    }
    {
        let store = Arc::clone(&store);
        let agent = VisionInspectorAgent::default();
        runner.register(task_names::VISION_INSPECT, move |args| {
            agent.execute(store.as_ref(), parse_input(args)?, as_of_from(args)?)
        });
    }
    {
        let store = Arc::clone(&store);
        let agent = ExplainerAgent::default();
        runner.register(task_names::EXPLAIN, move |args| {
            agent.execute(store.as_ref(), parse_input(args)?, as_of_from(args)?)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use supplymesh_domain::{Product, Store, StoreType};
    use supplymesh_queue::InMemoryTaskStore;
    use supplymesh_storage::InMemoryEntityStore;

    fn wired() -> (
        Arc<InMemoryEntityStore>,
        TaskRunner<Arc<InMemoryTaskStore>>,
    ) {
        let entities = Arc::new(InMemoryEntityStore::new());
        let mut runner = TaskRunner::new(InMemoryTaskStore::arc());
        register_agent_tasks(&mut runner, entities.clone() as Arc<dyn EntityStore>);
        (entities, runner)
    }

    #[test]
    fn all_agent_tasks_are_registered() {
        let (_, runner) = wired();
        for name in [
            task_names::FORECAST,
            task_names::REBALANCE,
            task_names::ROUTE_PLAN,
            task_names::DISRUPTION_SCAN,
            task_names::VISION_INSPECT,
            task_names::EXPLAIN,
        ] {
            assert!(runner.has_handler(name), "missing handler for {name}");
        }
    }

    #[test]
    fn forecast_task_runs_through_the_queue() {
        let (entities, runner) = wired();

        let location = Store::new("Store A", StoreType::Store, 500, Utc::now());
        let store_id = location.id;
        entities.insert_store(location).unwrap();
        let product = Product::new("Milk 1L", "dairy", 250, 1.0, Some(7), 10, 100, Utc::now())
            .unwrap();
        let product_id = product.id;
        entities.insert_product(product).unwrap();

        let outcome = runner
            .run_now(
                task_names::FORECAST,
                json!({"store_id": store_id, "product_id": product_id}),
            )
            .unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn missing_entity_surfaces_as_error_outcome_not_panic() {
        let (_, runner) = wired();

        let outcome = runner
            .run_now(
                task_names::ROUTE_PLAN,
                json!({"rebalance_action_id": uuid::Uuid::now_v7()}),
            )
            .unwrap();
        assert!(!outcome.is_success());
    }

    #[test]
    fn explicit_as_of_pins_the_run() {
        let (entities, runner) = wired();
        let as_of = "2025-06-01T08:00:00Z";

        let outcome = runner
            .run_now(task_names::REBALANCE, json!({"as_of": as_of}))
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.get("actions_created"), Some(&json!(0)));
        drop(entities);
    }

    #[test]
    fn malformed_as_of_is_rejected() {
        let (_, runner) = wired();
        let outcome = runner
            .run_now(task_names::REBALANCE, json!({"as_of": "yesterday"}))
            .unwrap();
        assert!(!outcome.is_success());
    }
}
