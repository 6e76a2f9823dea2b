//! Synchronous agent triggers.
//!
//! Each endpoint runs the agent on the request thread against the shared
//! entity store and returns its structured outcome; the error taxonomy maps
//! straight onto HTTP statuses. Callers that do not want to wait use the
//! task submission endpoint instead.

use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use supplymesh_agents::{
    Agent, DisruptionMonitorAgent, ExplainerAgent, ExplainerInput, ForecastAgent, ForecastInput,
    RebalancerAgent, RoutePlannerAgent, RoutePlannerInput, VisionInspectorAgent,
    VisionInspectorInput,
};
use supplymesh_core::{AgentResult, TaskOutcome};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(super::system::agent_health))
        .route("/forecast", post(trigger_forecast))
        .route("/rebalancer", post(trigger_rebalancer))
        .route("/route-planner", post(trigger_route_planner))
        .route("/disruption-monitor", post(trigger_disruption_monitor))
        .route("/vision-inspector", post(trigger_vision_inspector))
        .route("/explainer", post(trigger_explainer))
}

fn outcome_response(outcome: AgentResult<TaskOutcome>) -> axum::response::Response {
    match outcome {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

pub async fn trigger_forecast(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ForecastTriggerRequest>,
) -> axum::response::Response {
    let agent = ForecastAgent::default();
    let input = ForecastInput {
        store_id: body.store_id,
        product_id: body.product_id,
    };
    outcome_response(agent.execute(services.entities(), input, dto::as_of_or_now(body.as_of)))
}

pub async fn trigger_rebalancer(
    Extension(services): Extension<Arc<AppServices>>,
    body: Option<Json<dto::SweepTriggerRequest>>,
) -> axum::response::Response {
    let as_of = dto::as_of_or_now(body.and_then(|Json(b)| b.as_of));
    outcome_response(RebalancerAgent.execute(services.entities(), (), as_of))
}

pub async fn trigger_route_planner(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RoutePlanRequest>,
) -> axum::response::Response {
    let agent = RoutePlannerAgent::default();
    let input = RoutePlannerInput {
        rebalance_action_id: body.rebalance_action_id,
    };
    outcome_response(agent.execute(services.entities(), input, dto::as_of_or_now(body.as_of)))
}

pub async fn trigger_disruption_monitor(
    Extension(services): Extension<Arc<AppServices>>,
    body: Option<Json<dto::SweepTriggerRequest>>,
) -> axum::response::Response {
    let as_of = dto::as_of_or_now(body.and_then(|Json(b)| b.as_of));
    outcome_response(DisruptionMonitorAgent::default().execute(services.entities(), (), as_of))
}

pub async fn trigger_vision_inspector(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::VisionInspectRequest>,
) -> axum::response::Response {
    let agent = VisionInspectorAgent::default();
    let input = VisionInspectorInput {
        store_id: body.store_id,
        image_reference: body.image_reference,
    };
    outcome_response(agent.execute(services.entities(), input, dto::as_of_or_now(body.as_of)))
}

pub async fn trigger_explainer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ExplainRequest>,
) -> axum::response::Response {
    let agent = ExplainerAgent::default();
    let input = ExplainerInput {
        query: body.query,
        context: body.context,
    };
    outcome_response(agent.execute(services.entities(), input, dto::as_of_or_now(body.as_of)))
}
