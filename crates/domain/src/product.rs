use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplymesh_core::{AgentError, AgentResult, ProductId};

/// Catalog product. Immutable reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    /// Price in the smallest currency unit (e.g. cents).
    pub unit_price: u64,
    pub unit_weight_kg: f64,
    pub shelf_life_days: Option<u32>,
    pub min_stock_level: u32,
    pub max_stock_level: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        unit_price: u64,
        unit_weight_kg: f64,
        shelf_life_days: Option<u32>,
        min_stock_level: u32,
        max_stock_level: u32,
        created_at: DateTime<Utc>,
    ) -> AgentResult<Self> {
        if min_stock_level > max_stock_level {
            return Err(AgentError::invalid_state(format!(
                "min stock level {min_stock_level} exceeds max {max_stock_level}"
            )));
        }
        Ok(Self {
            id: ProductId::new(),
            name: name.into(),
            category: category.into(),
            unit_price,
            unit_weight_kg,
            shelf_life_days,
            min_stock_level,
            max_stock_level,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_thresholds_must_be_ordered() {
        let err = Product::new("Milk", "dairy", 250, 1.0, Some(7), 100, 10, Utc::now());
        assert!(matches!(err, Err(AgentError::InvalidState(_))));
    }
}
