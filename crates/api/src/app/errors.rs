use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use supplymesh_core::AgentError;

/// Map the pipeline error taxonomy onto HTTP statuses. The first three
/// buckets are caller faults; only `Unhandled` is a server fault.
pub fn agent_error_to_response(err: AgentError) -> axum::response::Response {
    match err {
        AgentError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        AgentError::UniquenessViolation(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        AgentError::InvalidState(msg) => json_error(StatusCode::CONFLICT, "invalid_state", msg),
        AgentError::Unhandled(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
