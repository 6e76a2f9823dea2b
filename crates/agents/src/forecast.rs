//! Demand forecast agent.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use supplymesh_core::{AgentResult, ProductId, StoreId, TaskOutcome};
use supplymesh_domain::{Forecast, Metric};
use supplymesh_storage::EntityStore;

use crate::agent::{Agent, names};
use crate::models::{BaselineDemandModel, DemandModel, hash_fraction_in};

/// Forecast horizon recorded on every row.
const HORIZON_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ForecastInput {
    pub store_id: StoreId,
    pub product_id: ProductId,
}

/// Computes a demand estimate for one (store, product) pair and writes
/// exactly one Forecast row at daily granularity. A second run for the same
/// pair on the same day fails with a uniqueness violation rather than
/// overwriting.
pub struct ForecastAgent<M = BaselineDemandModel> {
    model: M,
}

impl Default for ForecastAgent {
    fn default() -> Self {
        Self {
            model: BaselineDemandModel,
        }
    }
}

impl<M: DemandModel> ForecastAgent<M> {
    pub fn with_model(model: M) -> Self {
        Self { model }
    }
}

impl<M: DemandModel> Agent for ForecastAgent<M> {
    type Input = ForecastInput;

    fn name(&self) -> &'static str {
        names::FORECAST
    }

    fn execute(
        &self,
        store: &dyn EntityStore,
        input: ForecastInput,
        as_of: DateTime<Utc>,
    ) -> AgentResult<TaskOutcome> {
        store.store(input.store_id)?;
        store.product(input.product_id)?;

        let forecast_date = as_of.date_naive();
        let prediction = self
            .model
            .predict(input.store_id, input.product_id, forecast_date);

        let forecast = Forecast::new(
            input.store_id,
            input.product_id,
            forecast_date,
            prediction.demand,
            prediction.confidence,
            HORIZON_DAYS,
            prediction.external_factors,
            as_of,
        )?;
        let forecast_id = store.insert_forecast(forecast)?;

        let latency = hash_fraction_in(
            &[forecast_id.as_uuid().as_bytes(), b"latency"],
            200.0,
            500.0,
        );
        store.append_metric(Metric::response_time(self.name(), latency, as_of))?;

        info!(
            agent = %self.name(),
            forecast_id = %forecast_id,
            demand = prediction.demand,
            "forecast created"
        );

        Ok(TaskOutcome::success(json!({
            "forecast_id": forecast_id,
            "predicted_demand": prediction.demand,
            "confidence": prediction.confidence,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplymesh_core::AgentError;
    use supplymesh_domain::{Product, Store, StoreType};
    use supplymesh_storage::InMemoryEntityStore;

    fn seeded() -> (InMemoryEntityStore, StoreId, ProductId) {
        let store = InMemoryEntityStore::new();
        let location = Store::new("HSR Layout", StoreType::Store, 1000, Utc::now());
        let store_id = location.id;
        store.insert_store(location).unwrap();

        let product = Product::new("Milk 1L", "dairy", 250, 1.0, Some(7), 10, 100, Utc::now())
            .unwrap();
        let product_id = product.id;
        store.insert_product(product).unwrap();

        (store, store_id, product_id)
    }

    #[test]
    fn writes_one_forecast_and_one_metric() {
        let (store, store_id, product_id) = seeded();
        let agent = ForecastAgent::default();
        let as_of = Utc::now();

        let outcome = agent
            .execute(
                &store,
                ForecastInput {
                    store_id,
                    product_id,
                },
                as_of,
            )
            .unwrap();
        assert!(outcome.is_success());
        assert!(outcome.get("forecast_id").is_some());

        let window = store.forecasts_in_window(as_of - chrono::Duration::hours(1), 0).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].horizon_days, HORIZON_DAYS);

        let metrics = store
            .metrics_in_range(names::FORECAST, None, as_of - chrono::Duration::hours(1), as_of)
            .unwrap();
        assert_eq!(metrics.len(), 1);
    }

    #[test]
    fn second_run_same_day_is_a_uniqueness_violation() {
        let (store, store_id, product_id) = seeded();
        let agent = ForecastAgent::default();
        let as_of = Utc::now();
        let input = ForecastInput {
            store_id,
            product_id,
        };

        agent.execute(&store, input, as_of).unwrap();
        let err = agent.execute(&store, input, as_of).unwrap_err();
        assert!(matches!(err, AgentError::UniquenessViolation(_)));
    }

    #[test]
    fn unknown_store_is_not_found() {
        let (store, _store_id, product_id) = seeded();
        let agent = ForecastAgent::default();

        let err = agent
            .execute(
                &store,
                ForecastInput {
                    store_id: StoreId::new(),
                    product_id,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
    }
}
