//! Stock rebalancer agent.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, info};

use supplymesh_core::{AgentError, AgentResult, TaskOutcome};
use supplymesh_domain::{Forecast, Metric, RebalanceAction, Store, StoreType, Urgency};
use supplymesh_storage::EntityStore;

use crate::agent::{Agent, names};

/// Forecasts older than this are not acted on.
const TRAILING_WINDOW: Duration = Duration::hours(24);
/// Predicted demand at or above this triggers a transfer.
const HIGH_DEMAND_THRESHOLD: u32 = 50;
/// Every transfer moves at least this many units.
const MIN_TRANSFER_QUANTITY: u32 = 20;

/// Scans recent high-demand forecasts and proposes stock transfers.
///
/// At most one outstanding action may exist per (target store, product)
/// pair; the store's transactional claim enforces that, so concurrent runs
/// over overlapping forecasts cannot double-book a transfer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebalancerAgent;

impl RebalancerAgent {
    /// Pick a source: any active warehouse or fulfillment center other than
    /// the target. None is a skip, not an error.
    fn pick_source(
        &self,
        store: &dyn EntityStore,
        forecast: &Forecast,
    ) -> AgentResult<Option<Store>> {
        let mut candidates = store.stores_by_type(StoreType::Warehouse)?;
        candidates.extend(store.stores_by_type(StoreType::FulfillmentCenter)?);
        Ok(candidates
            .into_iter()
            .find(|s| s.active && s.id != forecast.store_id))
    }
}

impl Agent for RebalancerAgent {
    type Input = ();

    fn name(&self) -> &'static str {
        names::REBALANCER
    }

    fn execute(
        &self,
        store: &dyn EntityStore,
        _input: (),
        as_of: DateTime<Utc>,
    ) -> AgentResult<TaskOutcome> {
        let window_start = as_of - TRAILING_WINDOW;
        let forecasts = store.forecasts_in_window(window_start, HIGH_DEMAND_THRESHOLD)?;

        let mut actions_created: u32 = 0;
        for forecast in &forecasts {
            if store.has_outstanding_rebalance(forecast.store_id, forecast.product_id)? {
                continue;
            }

            let Some(source) = self.pick_source(store, forecast)? else {
                debug!(
                    agent = %self.name(),
                    forecast_id = %forecast.id,
                    "no source store available, skipping"
                );
                continue;
            };

            let action = RebalanceAction::new(
                source.id,
                forecast.store_id,
                forecast.product_id,
                forecast.predicted_demand.max(MIN_TRANSFER_QUANTITY),
                Urgency::Medium,
                format!(
                    "High demand forecast: {} units predicted",
                    forecast.predicted_demand
                ),
                as_of,
            )?;

            match store.insert_rebalance_action(action) {
                Ok(action_id) => {
                    actions_created += 1;
                    info!(
                        agent = %self.name(),
                        action_id = %action_id,
                        target = %forecast.store_id,
                        product = %forecast.product_id,
                        "rebalance action created"
                    );
                }
                // Lost the claim to a concurrent run. The work is done.
                Err(AgentError::UniquenessViolation(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        store.append_metric(Metric::throughput(
            self.name(),
            actions_created,
            "actions",
            as_of,
        ))?;

        Ok(TaskOutcome::success(json!({
            "actions_created": actions_created,
        })))
    }
}
