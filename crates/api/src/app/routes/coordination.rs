use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use supplymesh_coordinator::{run_workflow_simulation, Coordinator};
use supplymesh_core::CoordinationId;
use supplymesh_storage::EntityStore;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(coordinate))
        .route("/:id", get(get_coordination))
        .route("/simulate", post(simulate_workflow))
}

/// Run one coordination: sequence the named agents and persist the
/// timeline. Returns the outcome with the coordination id.
pub async fn coordinate(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CoordinateRequest>,
) -> axum::response::Response {
    let as_of = dto::as_of_or_now(body.as_of);
    match Coordinator::default().run(services.entities(), body.request, as_of) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

pub async fn get_coordination(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CoordinationId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid coordination id")
        }
    };
    match services.entities().coordination(id) {
        Ok(coordination) => Json(coordination).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

/// Run the canonical end-to-end workflow against the first seeded store and
/// product: forecast, rebalance, route, disruption, inspection,
/// coordination, explanation.
pub async fn simulate_workflow(
    Extension(services): Extension<Arc<AppServices>>,
    body: Option<Json<dto::SweepTriggerRequest>>,
) -> axum::response::Response {
    let as_of = dto::as_of_or_now(body.and_then(|Json(b)| b.as_of));
    match run_workflow_simulation(services.entities(), as_of) {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}
