//! Health and read-only projections over the entity store.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::{Duration, Utc};

use supplymesh_agents::names;
use supplymesh_core::AgentResult;
use supplymesh_domain::MetricType;
use supplymesh_storage::EntityStore;

use crate::app::errors;
use crate::app::services::AppServices;

/// Window of metric samples considered "recent" for agent health.
const HEALTH_WINDOW_MINUTES: i64 = 60;
/// Window for the dashboard's recent-explanations count.
const RECENT_EXPLANATIONS_HOURS: i64 = 24;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Counts of everything the operations view cares about, computed fresh
/// from the entity store on every request.
pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match dashboard_body(services.entities()) {
        Ok(body) => Json(body).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

fn dashboard_body(entities: &dyn EntityStore) -> AgentResult<serde_json::Value> {
    let as_of = Utc::now();
    let explanation_cutoff = as_of - Duration::hours(RECENT_EXPLANATIONS_HOURS);

    Ok(serde_json::json!({
        "as_of": as_of,
        "stores": entities.stores()?.len(),
        "products": entities.products()?.len(),
        "outstanding_rebalance_actions": entities.outstanding_rebalance_actions()?.len(),
        "open_routes": entities.open_routes()?.len(),
        "active_disruptions": entities.active_disruptions(as_of)?.len(),
        "inspections_requiring_action": entities.inspections_requiring_action()?.len(),
        "recent_explanations": entities.explanations_created_after(explanation_cutoff)?.len(),
    }))
}

/// Per-agent health derived from the metrics sink: an agent with at least
/// one sample inside the window is healthy, otherwise it gets a warning.
pub async fn agent_health(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match agent_health_body(services.entities()) {
        Ok(body) => Json(body).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

fn agent_health_body(entities: &dyn EntityStore) -> AgentResult<serde_json::Value> {
    let as_of = Utc::now();
    let from = as_of - Duration::minutes(HEALTH_WINDOW_MINUTES);

    let mut agents = Vec::with_capacity(names::ALL.len());
    for name in names::ALL {
        let samples = entities.metrics_in_range(name, None, from, as_of)?;

        let response_times: Vec<f64> = samples
            .iter()
            .filter(|m| m.metric_type == MetricType::ResponseTime)
            .map(|m| m.value)
            .collect();
        let avg_response_time_ms = if response_times.is_empty() {
            None
        } else {
            Some(response_times.iter().sum::<f64>() / response_times.len() as f64)
        };

        let status = if samples.is_empty() { "warning" } else { "healthy" };
        agents.push(serde_json::json!({
            "agent": name,
            "status": status,
            "samples": samples.len(),
            "last_seen": samples.last().map(|m| m.timestamp),
            "avg_response_time_ms": avg_response_time_ms,
        }));
    }

    Ok(serde_json::json!({
        "as_of": as_of,
        "window_minutes": HEALTH_WINDOW_MINUTES,
        "agents": agents,
    }))
}
