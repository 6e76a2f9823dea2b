//! The canonical end-to-end workflow simulation.
//!
//! One illustrative run that exercises every component: forecast →
//! rebalance → route → disruption (attached to the route) → inspection →
//! coordination → explanation, each step's identifiers threaded into the
//! next step's input.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use supplymesh_core::{
    AgentError, AgentResult, CoordinationId, DisruptionId, ExplanationId, ForecastId,
    InspectionId, ProductId, RebalanceActionId, RouteId, StoreId, TaskOutcome,
};
use supplymesh_domain::{AnomalyTag, CoordinationEvent, DetectedObject, Priority, StoreType};
use supplymesh_storage::EntityStore;

use supplymesh_agents::agent::{Agent, names};
use supplymesh_agents::models::{
    DetectionReport, FixedDemandModel, FixedDetectionModel, StaticDisruptionFeed,
};
use supplymesh_agents::{
    DisruptionMonitorAgent, ExplainerAgent, ExplainerInput, ForecastAgent, ForecastInput,
    RebalancerAgent, RoutePlannerAgent, RoutePlannerInput, VisionInspectorAgent,
    VisionInspectorInput,
};

use crate::coordinator::{CoordinationRequest, Coordinator};

/// Everything the simulation created, plus a human-readable step log.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub forecast_id: ForecastId,
    pub rebalance_action_id: RebalanceActionId,
    pub route_id: RouteId,
    pub disruption_id: DisruptionId,
    pub inspection_id: InspectionId,
    pub coordination_id: CoordinationId,
    pub explanation_id: ExplanationId,
    pub explanation_text: String,
    pub simulation_log: Vec<String>,
}

fn id_from<T: serde::de::DeserializeOwned>(outcome: &TaskOutcome, key: &str) -> AgentResult<T> {
    let value = outcome
        .get(key)
        .ok_or_else(|| AgentError::unhandled(format!("workflow outcome missing {key}")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| AgentError::unhandled(format!("workflow outcome field {key}: {e}")))
}

/// Pick the simulation's target store (a retail store), and any product.
fn pick_subjects(store: &dyn EntityStore) -> AgentResult<(StoreId, ProductId)> {
    let target = store
        .stores_by_type(StoreType::Store)?
        .into_iter()
        .find(|s| s.active)
        .ok_or_else(|| AgentError::not_found("no active retail store to simulate against"))?;
    let product = store
        .products()?
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::not_found("no product to simulate against"))?;
    Ok((target.id, product.id))
}

/// Run the full pipeline once against the given store, with deterministic
/// models (demand 80 at confidence 0.9, a fixed weather disruption, a
/// fixed shelf-anomaly detection).
///
/// Requires at least one active retail store, one warehouse or fulfillment
/// center, and one product; fails with `NotFound` otherwise.
pub fn run_workflow_simulation(
    store: &dyn EntityStore,
    as_of: DateTime<Utc>,
) -> AgentResult<WorkflowReport> {
    let mut log = Vec::new();
    let (target_store, product) = pick_subjects(store)?;

    // 1. Forecast: fixed high demand so the rebalancer always triggers.
    let forecast_agent = ForecastAgent::with_model(FixedDemandModel {
        demand: 80,
        confidence: 0.9,
    });
    let outcome = forecast_agent.execute(
        store,
        ForecastInput {
            store_id: target_store,
            product_id: product,
        },
        as_of,
    )?;
    let forecast_id: ForecastId = id_from(&outcome, "forecast_id")?;
    log.push(format!("{}: created demand forecast", names::FORECAST));

    // 2. Rebalance.
    RebalancerAgent.execute(store, (), as_of)?;
    let action = store
        .outstanding_rebalance_actions()?
        .into_iter()
        .find(|a| a.target_store == target_store && a.product_id == product)
        .ok_or_else(|| {
            AgentError::invalid_state("rebalancer produced no action for the simulated forecast")
        })?;
    log.push(format!("{}: created rebalance action", names::REBALANCER));

    // 3. Route.
    let outcome = RoutePlannerAgent::default().execute(
        store,
        RoutePlannerInput {
            rebalance_action_id: action.id,
        },
        as_of,
    )?;
    let route_id: RouteId = id_from(&outcome, "route_id")?;
    log.push(format!("{}: planned route, action approved", names::ROUTE_PLANNER));

    // 4. Disruption, attached to the route it affects.
    let outcome = DisruptionMonitorAgent::with_feed(StaticDisruptionFeed::weather())
        .execute(store, (), as_of)?;
    let disruption_id: DisruptionId = id_from(&outcome, "disruption_id")?;
    store.attach_route_to_disruption(disruption_id, route_id)?;
    log.push(format!("{}: recorded disruption affecting the route", names::DISRUPTION_MONITOR));

    // 5. Inspection of the target store.
    let detection = FixedDetectionModel {
        report: DetectionReport {
            objects: vec![
                DetectedObject {
                    label: "empty_shelf".to_string(),
                    confidence: 0.95,
                    bbox: [100, 200, 300, 400],
                },
                DetectedObject {
                    label: "product_box".to_string(),
                    confidence: 0.88,
                    bbox: [50, 150, 150, 250],
                },
            ],
            anomalies: vec![AnomalyTag::EmptyShelfSection, AnomalyTag::MisplacedProducts],
        },
    };
    let outcome = VisionInspectorAgent::with_model(detection).execute(
        store,
        VisionInspectorInput {
            store_id: target_store,
            image_reference: "/inspections/store_shelf_001.jpg".to_string(),
        },
        as_of,
    )?;
    let inspection_id: InspectionId = id_from(&outcome, "inspection_id")?;
    log.push(format!("{}: flagged shelf issues", names::VISION_INSPECTOR));

    // 6. Coordination over the agents that acted on the disruption.
    let outcome = Coordinator::default().run(
        store,
        CoordinationRequest {
            event_type: CoordinationEvent::DisruptionHandled,
            involved_agents: vec![
                names::REBALANCER.to_string(),
                names::ROUTE_PLANNER.to_string(),
                names::DISRUPTION_MONITOR.to_string(),
            ],
            coordination_data: json!({
                "original_route_id": route_id,
                "disruption_id": disruption_id,
                "action_taken": "route_updated",
            }),
            priority: Priority::Medium,
        },
        as_of,
    )?;
    let coordination_id: CoordinationId = id_from(&outcome, "coordination_id")?;
    log.push(format!("{}: coordinated the multi-agent response", names::COORDINATOR));

    // 7. Explanation referencing everything above.
    let outcome = ExplainerAgent::default().execute(
        store,
        ExplainerInput {
            query: "Why was today's delivery delayed and what actions were taken?".to_string(),
            context: json!({
                "rebalance_id": action.id,
                "route_id": route_id,
                "disruption_id": disruption_id,
            }),
        },
        as_of,
    )?;
    let explanation_id: ExplanationId = id_from(&outcome, "explanation_id")?;
    let explanation_text: String = id_from(&outcome, "explanation_text")?;
    log.push(format!("{}: generated the explanation", names::EXPLAINER));

    info!(
        coordination_id = %coordination_id,
        explanation_id = %explanation_id,
        "workflow simulation completed"
    );

    Ok(WorkflowReport {
        forecast_id,
        rebalance_action_id: action.id,
        route_id,
        disruption_id,
        inspection_id,
        coordination_id,
        explanation_id,
        explanation_text,
        simulation_log: log,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use supplymesh_domain::{
        ActionStatus, CoordinationStatus, Product, RouteStatus, Store,
    };
    use supplymesh_storage::InMemoryEntityStore;

    fn seeded() -> InMemoryEntityStore {
        let store = InMemoryEntityStore::new();
        store
            .insert_store(Store::new("Store A", StoreType::Store, 500, Utc::now()))
            .unwrap();
        store
            .insert_store(Store::new("Warehouse B", StoreType::Warehouse, 10_000, Utc::now()))
            .unwrap();
        store
            .insert_product(
                Product::new("Milk 1L", "dairy", 250, 1.0, Some(7), 10, 100, Utc::now()).unwrap(),
            )
            .unwrap();
        store
    }

    #[test]
    fn simulation_threads_every_entity_through() {
        let store = seeded();
        let as_of = Utc::now();

        let report = run_workflow_simulation(&store, as_of).unwrap();
        assert_eq!(report.simulation_log.len(), 7);

        // Forecast of 80 units became an action for exactly 80.
        let action = store.rebalance_action(report.rebalance_action_id).unwrap();
        assert_eq!(action.quantity, 80);
        assert_eq!(action.status, ActionStatus::Approved);

        // Route is live and referenced by the disruption.
        let route = store.route(report.route_id).unwrap();
        assert_eq!(route.status, RouteStatus::Planned);
        let disruption = store.disruption(report.disruption_id).unwrap();
        assert!(disruption.affected_routes.contains(&report.route_id));
        assert!(disruption.is_active(as_of));

        // Coordination completed with a three-step timeline.
        let coordination = store.coordination(report.coordination_id).unwrap();
        assert_eq!(coordination.status, CoordinationStatus::Completed);
        assert_eq!(coordination.execution_timeline.len(), 3);

        // Inspection requires action, and the explanation mentions rebalancing.
        let inspection = store.inspection(report.inspection_id).unwrap();
        assert!(inspection.action_required);
        assert!(report.explanation_text.contains("rebalancing"));
    }

    #[test]
    fn rerunning_the_simulation_same_day_fails_on_forecast_uniqueness() {
        let store = seeded();
        let as_of = Utc::now();

        run_workflow_simulation(&store, as_of).unwrap();
        let err = run_workflow_simulation(&store, as_of).unwrap_err();
        assert!(matches!(err, AgentError::UniquenessViolation(_)));
    }

    #[test]
    fn rerun_next_day_reuses_the_outstanding_action_guard() {
        let store = seeded();
        let as_of = Utc::now();

        run_workflow_simulation(&store, as_of).unwrap();
        // Next day: new forecast allowed, but the outstanding (approved)
        // action blocks a second rebalance, so the simulation reports it.
        let err = run_workflow_simulation(&store, as_of + Duration::days(1)).unwrap_err();
        assert!(matches!(err, AgentError::InvalidState(_)));
    }

    #[test]
    fn unseeded_store_is_not_found() {
        let store = InMemoryEntityStore::new();
        let err = run_workflow_simulation(&store, Utc::now()).unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
    }

    // End-to-end scenario from the rebalancing contract: forecast of 80
    // units at a store with one warehouse source yields exactly one pending
    // action for 80 units; planning its route approves it; a second
    // rebalancer pass creates nothing.
    #[test]
    fn rebalance_route_idempotency_scenario() {
        let store = seeded();
        let as_of = Utc::now();
        let (target, product) = pick_subjects(&store).unwrap();

        ForecastAgent::with_model(FixedDemandModel {
            demand: 80,
            confidence: 0.9,
        })
        .execute(
            &store,
            ForecastInput {
                store_id: target,
                product_id: product,
            },
            as_of,
        )
        .unwrap();

        let outcome = RebalancerAgent.execute(&store, (), as_of).unwrap();
        assert_eq!(outcome.get("actions_created"), Some(&json!(1)));
        let action = store.outstanding_rebalance_actions().unwrap().remove(0);
        assert_eq!(action.quantity, 80);
        assert_eq!(action.status, ActionStatus::Pending);

        RoutePlannerAgent::default()
            .execute(
                &store,
                RoutePlannerInput {
                    rebalance_action_id: action.id,
                },
                as_of,
            )
            .unwrap();
        assert_eq!(
            store.rebalance_action(action.id).unwrap().status,
            ActionStatus::Approved
        );

        let outcome = RebalancerAgent.execute(&store, (), as_of).unwrap();
        assert_eq!(outcome.get("actions_created"), Some(&json!(0)));
    }
}
