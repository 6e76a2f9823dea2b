//! Route planner agent.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use supplymesh_core::{AgentResult, RebalanceActionId, TaskOutcome};
use supplymesh_domain::{Metric, Route};
use supplymesh_storage::EntityStore;

use crate::agent::{Agent, names};
use crate::models::{BaselineRouteEstimator, RouteEstimator, hash_fraction_in};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RoutePlannerInput {
    pub rebalance_action_id: RebalanceActionId,
}

/// Plans the delivery route for a pending rebalance action and approves it.
///
/// Route creation and the pending → approved transition happen as one atomic
/// store operation; planning the same action twice is rejected with an
/// invalid-state error instead of producing a duplicate route.
pub struct RoutePlannerAgent<E = BaselineRouteEstimator> {
    estimator: E,
}

impl Default for RoutePlannerAgent {
    fn default() -> Self {
        Self {
            estimator: BaselineRouteEstimator,
        }
    }
}

impl<E: RouteEstimator> RoutePlannerAgent<E> {
    pub fn with_estimator(estimator: E) -> Self {
        Self { estimator }
    }
}

impl<E: RouteEstimator> Agent for RoutePlannerAgent<E> {
    type Input = RoutePlannerInput;

    fn name(&self) -> &'static str {
        names::ROUTE_PLANNER
    }

    fn execute(
        &self,
        store: &dyn EntityStore,
        input: RoutePlannerInput,
        as_of: DateTime<Utc>,
    ) -> AgentResult<TaskOutcome> {
        let action = store.rebalance_action(input.rebalance_action_id)?;

        let estimate = self
            .estimator
            .estimate(action.source_store, action.target_store);

        let route = Route::new(
            action.id,
            action.source_store,
            action.target_store,
            estimate.distance_km,
            estimate.duration_hours,
            estimate.cost,
            estimate.traffic,
            as_of,
        );
        let route_id = store.insert_route_and_approve(route)?;

        let latency = hash_fraction_in(
            &[route_id.as_uuid().as_bytes(), b"latency"],
            800.0,
            1500.0,
        );
        store.append_metric(Metric::response_time(self.name(), latency, as_of))?;

        info!(
            agent = %self.name(),
            route_id = %route_id,
            action_id = %action.id,
            distance_km = estimate.distance_km,
            "route planned, action approved"
        );

        Ok(TaskOutcome::success(json!({
            "route_id": route_id,
            "distance_km": estimate.distance_km,
            "duration_hours": estimate.duration_hours,
        })))
    }
}
