//! Strongly-typed identifiers for every persisted entity.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgentError;

macro_rules! entity_id {
    ($(#[$doc:meta])* $t:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in
            /// tests for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = AgentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| AgentError::unhandled(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

entity_id!(
    /// Identifier of a store, warehouse, or fulfillment/distribution center.
    StoreId, "StoreId"
);
entity_id!(
    /// Identifier of a catalog product.
    ProductId, "ProductId"
);
entity_id!(
    /// Identifier of a demand forecast.
    ForecastId, "ForecastId"
);
entity_id!(
    /// Identifier of a stock rebalance action.
    RebalanceActionId, "RebalanceActionId"
);
entity_id!(
    /// Identifier of a planned transfer route.
    RouteId, "RouteId"
);
entity_id!(
    /// Identifier of an external disruption.
    DisruptionId, "DisruptionId"
);
entity_id!(
    /// Identifier of a vision inspection.
    InspectionId, "InspectionId"
);
entity_id!(
    /// Identifier of a generated explanation.
    ExplanationId, "ExplanationId"
);
entity_id!(
    /// Identifier of a coordination run.
    CoordinationId, "CoordinationId"
);
entity_id!(
    /// Identifier of an agent metric sample.
    MetricId, "MetricId"
);
