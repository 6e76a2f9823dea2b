use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use supplymesh_core::{AgentError, AgentResult, ForecastId, ProductId, StoreId};

/// Uniqueness key of a forecast: daily granularity per (store, product).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastKey {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub forecast_date: NaiveDate,
}

/// A demand prediction. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub id: ForecastId,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub forecast_date: NaiveDate,
    pub predicted_demand: u32,
    pub confidence: f64,
    pub horizon_days: u32,
    /// Opaque bag of external context (weather, events, traffic).
    pub external_factors: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl Forecast {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store_id: StoreId,
        product_id: ProductId,
        forecast_date: NaiveDate,
        predicted_demand: u32,
        confidence: f64,
        horizon_days: u32,
        external_factors: JsonValue,
        created_at: DateTime<Utc>,
    ) -> AgentResult<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(AgentError::invalid_state(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        Ok(Self {
            id: ForecastId::new(),
            store_id,
            product_id,
            forecast_date,
            predicted_demand,
            confidence,
            horizon_days,
            external_factors,
            created_at,
        })
    }

    pub fn key(&self) -> ForecastKey {
        ForecastKey {
            store_id: self.store_id,
            product_id: self.product_id,
            forecast_date: self.forecast_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn confidence_is_bounded() {
        let err = Forecast::new(
            StoreId::new(),
            ProductId::new(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            40,
            1.2,
            7,
            json!({}),
            Utc::now(),
        );
        assert!(matches!(err, Err(AgentError::InvalidState(_))));
    }

    #[test]
    fn key_is_daily_per_store_and_product() {
        let store = StoreId::new();
        let product = ProductId::new();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let a = Forecast::new(store, product, date, 10, 0.8, 7, json!({}), Utc::now()).unwrap();
        let b = Forecast::new(store, product, date, 90, 0.9, 7, json!({}), Utc::now()).unwrap();
        assert_eq!(a.key(), b.key());
        assert_ne!(a.id, b.id);
    }
}
