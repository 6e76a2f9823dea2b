use axum::{routing::get, Router};

pub mod agents;
pub mod catalog;
pub mod coordination;
pub mod system;
pub mod tasks;

/// Router for everything below `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(system::dashboard))
        .nest("/stores", catalog::stores_router())
        .nest("/products", catalog::products_router())
        .nest("/agents", agents::router())
        .nest("/coordination", coordination::router())
        .nest("/tasks", tasks::router())
}
