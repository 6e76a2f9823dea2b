use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplymesh_core::StoreId;

/// Role of a location in the supply-chain network.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    Store,
    Warehouse,
    FulfillmentCenter,
    DistributionCenter,
}

impl StoreType {
    /// Whether this location can act as the source of a rebalance transfer.
    pub fn is_source_candidate(&self) -> bool {
        matches!(self, StoreType::Warehouse | StoreType::FulfillmentCenter)
    }
}

/// A physical location. Immutable after creation except the `active` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub store_type: StoreType,
    pub capacity: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub fn new(
        name: impl Into<String>,
        store_type: StoreType,
        capacity: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: StoreId::new(),
            name: name.into(),
            store_type,
            capacity,
            active: true,
            created_at,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
