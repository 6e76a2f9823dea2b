use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use supplymesh_core::{ProductId, RebalanceActionId, StoreId};
use supplymesh_coordinator::CoordinationRequest;
use supplymesh_domain::StoreType;

/// Anchor timestamp for a triggered run: the caller's `as_of` when supplied,
/// the request wall clock otherwise.
pub fn as_of_or_now(as_of: Option<DateTime<Utc>>) -> DateTime<Utc> {
    as_of.unwrap_or_else(Utc::now)
}

// -------------------------
// Catalog
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub store_type: StoreType,
    pub capacity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub unit_price: u64,
    pub unit_weight_kg: f64,
    pub shelf_life_days: Option<u32>,
    pub min_stock_level: u32,
    pub max_stock_level: u32,
}

// -------------------------
// Agent triggers
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ForecastTriggerRequest {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub as_of: Option<DateTime<Utc>>,
}

/// Body for the unparameterized sweeps (rebalancer, disruption monitor).
#[derive(Debug, Default, Deserialize)]
pub struct SweepTriggerRequest {
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RoutePlanRequest {
    pub rebalance_action_id: RebalanceActionId,
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct VisionInspectRequest {
    pub store_id: StoreId,
    pub image_reference: String,
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub query: String,
    #[serde(default)]
    pub context: JsonValue,
    pub as_of: Option<DateTime<Utc>>,
}

// -------------------------
// Coordination
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CoordinateRequest {
    #[serde(flatten)]
    pub request: CoordinationRequest,
    pub as_of: Option<DateTime<Utc>>,
}

// -------------------------
// Queue
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitTaskRequest {
    pub name: String,
    #[serde(default)]
    pub args: JsonValue,
}
