//! Queue surface: fire-and-forget task submission and status lookup.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use supplymesh_queue::TaskId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit_task))
        .route("/stats", get(queue_stats))
        .route("/:id", get(get_task))
}

/// Accept a named task for asynchronous execution. Returns 202 with the
/// task id; the outcome is available from the lookup endpoint once a worker
/// has run it.
pub async fn submit_task(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SubmitTaskRequest>,
) -> axum::response::Response {
    match services.submit_task(&body.name, body.args) {
        Ok(id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "task_id": id })),
        )
            .into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

pub async fn get_task(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: Uuid = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid task id"),
    };
    match services.task(TaskId(id)) {
        Ok(Some(task)) => Json(task).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "no such task"),
        Err(e) => errors::agent_error_to_response(e),
    }
}

pub async fn queue_stats(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.queue_stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}
