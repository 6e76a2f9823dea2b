use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use supplymesh_core::{ProductId, StoreId};
use supplymesh_domain::{Product, Store};
use supplymesh_storage::EntityStore;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn stores_router() -> Router {
    Router::new()
        .route("/", post(create_store).get(list_stores))
        .route("/:id", get(get_store))
}

pub fn products_router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product))
}

pub async fn create_store(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateStoreRequest>,
) -> axum::response::Response {
    let store = Store::new(body.name, body.store_type, body.capacity, Utc::now());
    match services.entities().insert_store(store) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": id })),
        )
            .into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

pub async fn list_stores(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.entities().stores() {
        Ok(stores) => Json(stores).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

pub async fn get_store(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: StoreId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid store id"),
    };
    match services.entities().store(id) {
        Ok(store) => Json(store).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let product = match Product::new(
        body.name,
        body.category,
        body.unit_price,
        body.unit_weight_kg,
        body.shelf_life_days,
        body.min_stock_level,
        body.max_stock_level,
        Utc::now(),
    ) {
        Ok(p) => p,
        Err(e) => return errors::agent_error_to_response(e),
    };
    match services.entities().insert_product(product) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": id })),
        )
            .into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.entities().products() {
        Ok(products) => Json(products).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };
    match services.entities().product(id) {
        Ok(product) => Json(product).into_response(),
        Err(e) => errors::agent_error_to_response(e),
    }
}
