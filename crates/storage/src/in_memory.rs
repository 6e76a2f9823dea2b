//! In-memory entity store.
//!
//! All tables sit behind a single `RwLock`, so every multi-record operation
//! (rebalance claim, route-and-approve) is naturally atomic: either all of
//! its writes are visible or none are.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use supplymesh_core::{
    AgentError, AgentResult, CoordinationId, DisruptionId, ExplanationId, ForecastId, InspectionId,
    MetricId, ProductId, RebalanceActionId, RouteId, StoreId,
};
use supplymesh_domain::{
    ActionStatus, Coordination, Disruption, Explanation, Forecast, ForecastKey, Inspection, Metric,
    MetricType, Product, RebalanceAction, Route, RouteStatus, Store, StoreType,
};

use crate::entity_store::EntityStore;

/// A row plus its insertion sequence number (creation order).
#[derive(Debug, Clone)]
struct Row<T> {
    seq: u64,
    value: T,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    stores: HashMap<StoreId, Row<Store>>,
    products: HashMap<ProductId, Row<Product>>,
    forecasts: HashMap<ForecastId, Row<Forecast>>,
    forecast_keys: HashMap<ForecastKey, ForecastId>,
    actions: HashMap<RebalanceActionId, Row<RebalanceAction>>,
    routes: HashMap<RouteId, Row<Route>>,
    disruptions: HashMap<DisruptionId, Row<Disruption>>,
    inspections: HashMap<InspectionId, Row<Inspection>>,
    explanations: HashMap<ExplanationId, Row<Explanation>>,
    coordinations: HashMap<CoordinationId, Row<Coordination>>,
    metrics: Vec<Metric>,
}

impl Inner {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Any non-cancelled route tied to the action.
    fn live_route_of(&self, action_id: RebalanceActionId) -> Option<RouteId> {
        self.routes
            .values()
            .filter(|r| r.value.rebalance_action_id == action_id)
            .filter(|r| r.value.status != RouteStatus::Cancelled)
            .map(|r| r.value.id)
            .next()
    }

    fn outstanding_exists(&self, target: StoreId, product: ProductId) -> bool {
        self.actions.values().any(|r| {
            r.value.target_store == target
                && r.value.product_id == product
                && r.value.status.is_outstanding()
        })
    }
}

/// In-memory entity store. Intended for tests and single-process deployments;
/// not optimized for large row counts.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    inner: RwLock<Inner>,
}

fn sorted<T: Clone>(rows: impl Iterator<Item = Row<T>>) -> Vec<T> {
    let mut rows: Vec<Row<T>> = rows.collect();
    rows.sort_by_key(|r| r.seq);
    rows.into_iter().map(|r| r.value).collect()
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AgentResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| AgentError::unhandled("entity store lock poisoned"))
    }

    fn write(&self) -> AgentResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| AgentError::unhandled("entity store lock poisoned"))
    }
}

impl EntityStore for InMemoryEntityStore {
    fn insert_store(&self, store: Store) -> AgentResult<StoreId> {
        let mut inner = self.write()?;
        let id = store.id;
        let seq = inner.next_seq();
        inner.stores.insert(id, Row { seq, value: store });
        Ok(id)
    }

    fn store(&self, id: StoreId) -> AgentResult<Store> {
        self.read()?
            .stores
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| AgentError::not_found(format!("store {id}")))
    }

    fn stores(&self) -> AgentResult<Vec<Store>> {
        Ok(sorted(self.read()?.stores.values().cloned()))
    }

    fn stores_by_type(&self, store_type: StoreType) -> AgentResult<Vec<Store>> {
        Ok(sorted(
            self.read()?
                .stores
                .values()
                .filter(|r| r.value.store_type == store_type)
                .cloned(),
        ))
    }

    fn set_store_active(&self, id: StoreId, active: bool) -> AgentResult<()> {
        let mut inner = self.write()?;
        let row = inner
            .stores
            .get_mut(&id)
            .ok_or_else(|| AgentError::not_found(format!("store {id}")))?;
        row.value.set_active(active);
        Ok(())
    }

    fn insert_product(&self, product: Product) -> AgentResult<ProductId> {
        let mut inner = self.write()?;
        let id = product.id;
        let seq = inner.next_seq();
        inner.products.insert(id, Row { seq, value: product });
        Ok(id)
    }

    fn product(&self, id: ProductId) -> AgentResult<Product> {
        self.read()?
            .products
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| AgentError::not_found(format!("product {id}")))
    }

    fn products(&self) -> AgentResult<Vec<Product>> {
        Ok(sorted(self.read()?.products.values().cloned()))
    }

    fn insert_forecast(&self, forecast: Forecast) -> AgentResult<ForecastId> {
        let mut inner = self.write()?;
        let key = forecast.key();
        if inner.forecast_keys.contains_key(&key) {
            return Err(AgentError::uniqueness(format!(
                "forecast for store {} / product {} on {} already exists",
                key.store_id, key.product_id, key.forecast_date
            )));
        }
        let id = forecast.id;
        let seq = inner.next_seq();
        inner.forecast_keys.insert(key, id);
        inner.forecasts.insert(id, Row { seq, value: forecast });
        Ok(id)
    }

    fn forecast(&self, id: ForecastId) -> AgentResult<Forecast> {
        self.read()?
            .forecasts
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| AgentError::not_found(format!("forecast {id}")))
    }

    fn forecasts_in_window(
        &self,
        created_after: DateTime<Utc>,
        min_demand: u32,
    ) -> AgentResult<Vec<Forecast>> {
        Ok(sorted(
            self.read()?
                .forecasts
                .values()
                .filter(|r| r.value.created_at >= created_after)
                .filter(|r| r.value.predicted_demand >= min_demand)
                .cloned(),
        ))
    }

    fn insert_rebalance_action(&self, action: RebalanceAction) -> AgentResult<RebalanceActionId> {
        let mut inner = self.write()?;
        // Claim: check and insert under the same write lock.
        if inner.outstanding_exists(action.target_store, action.product_id) {
            return Err(AgentError::uniqueness(format!(
                "outstanding rebalance action already exists for store {} / product {}",
                action.target_store, action.product_id
            )));
        }
        let id = action.id;
        let seq = inner.next_seq();
        inner.actions.insert(id, Row { seq, value: action });
        Ok(id)
    }

    fn rebalance_action(&self, id: RebalanceActionId) -> AgentResult<RebalanceAction> {
        self.read()?
            .actions
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| AgentError::not_found(format!("rebalance action {id}")))
    }

    fn update_rebalance_action(&self, action: &RebalanceAction) -> AgentResult<()> {
        let mut inner = self.write()?;
        let row = inner
            .actions
            .get_mut(&action.id)
            .ok_or_else(|| AgentError::not_found(format!("rebalance action {}", action.id)))?;
        row.value = action.clone();
        Ok(())
    }

    fn outstanding_rebalance_actions(&self) -> AgentResult<Vec<RebalanceAction>> {
        Ok(sorted(
            self.read()?
                .actions
                .values()
                .filter(|r| r.value.status.is_outstanding())
                .cloned(),
        ))
    }

    fn has_outstanding_rebalance(&self, target: StoreId, product: ProductId) -> AgentResult<bool> {
        Ok(self.read()?.outstanding_exists(target, product))
    }

    fn insert_route_and_approve(&self, route: Route) -> AgentResult<RouteId> {
        let mut inner = self.write()?;
        let action_id = route.rebalance_action_id;
        let action_row = inner
            .actions
            .get(&action_id)
            .ok_or_else(|| AgentError::not_found(format!("rebalance action {action_id}")))?;
        if action_row.value.status != ActionStatus::Pending {
            return Err(AgentError::invalid_state(format!(
                "rebalance action {action_id} is {:?}, not pending",
                action_row.value.status
            )));
        }
        if inner.live_route_of(action_id).is_some() {
            return Err(AgentError::invalid_state(format!(
                "rebalance action {action_id} already has a route"
            )));
        }

        let mut approved = action_row.value.clone();
        approved.approve()?;

        let route_id = route.id;
        let seq = inner.next_seq();
        inner.routes.insert(route_id, Row { seq, value: route });
        if let Some(row) = inner.actions.get_mut(&action_id) {
            row.value = approved;
        }
        Ok(route_id)
    }

    fn supersede_route(&self, route: Route) -> AgentResult<RouteId> {
        let mut inner = self.write()?;
        let action_id = route.rebalance_action_id;
        if !inner.actions.contains_key(&action_id) {
            return Err(AgentError::not_found(format!("rebalance action {action_id}")));
        }
        if let Some(old_id) = inner.live_route_of(action_id) {
            if let Some(row) = inner.routes.get_mut(&old_id) {
                row.value.cancel()?;
            }
        }
        let route_id = route.id;
        let seq = inner.next_seq();
        inner.routes.insert(route_id, Row { seq, value: route });
        Ok(route_id)
    }

    fn route(&self, id: RouteId) -> AgentResult<Route> {
        self.read()?
            .routes
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| AgentError::not_found(format!("route {id}")))
    }

    fn route_for_action(&self, action_id: RebalanceActionId) -> AgentResult<Option<Route>> {
        let inner = self.read()?;
        Ok(inner
            .live_route_of(action_id)
            .and_then(|id| inner.routes.get(&id))
            .map(|r| r.value.clone()))
    }

    fn update_route(&self, route: &Route) -> AgentResult<()> {
        let mut inner = self.write()?;
        let row = inner
            .routes
            .get_mut(&route.id)
            .ok_or_else(|| AgentError::not_found(format!("route {}", route.id)))?;
        row.value = route.clone();
        Ok(())
    }

    fn open_routes(&self) -> AgentResult<Vec<Route>> {
        Ok(sorted(
            self.read()?
                .routes
                .values()
                .filter(|r| matches!(r.value.status, RouteStatus::Planned | RouteStatus::Active))
                .cloned(),
        ))
    }

    fn insert_disruption(&self, disruption: Disruption) -> AgentResult<DisruptionId> {
        let mut inner = self.write()?;
        let id = disruption.id;
        let seq = inner.next_seq();
        inner.disruptions.insert(id, Row { seq, value: disruption });
        Ok(id)
    }

    fn disruption(&self, id: DisruptionId) -> AgentResult<Disruption> {
        self.read()?
            .disruptions
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| AgentError::not_found(format!("disruption {id}")))
    }

    fn update_disruption(&self, disruption: &Disruption) -> AgentResult<()> {
        let mut inner = self.write()?;
        let row = inner
            .disruptions
            .get_mut(&disruption.id)
            .ok_or_else(|| AgentError::not_found(format!("disruption {}", disruption.id)))?;
        row.value = disruption.clone();
        Ok(())
    }

    fn attach_route_to_disruption(
        &self,
        disruption_id: DisruptionId,
        route_id: RouteId,
    ) -> AgentResult<()> {
        let mut inner = self.write()?;
        if !inner.routes.contains_key(&route_id) {
            return Err(AgentError::not_found(format!("route {route_id}")));
        }
        let row = inner
            .disruptions
            .get_mut(&disruption_id)
            .ok_or_else(|| AgentError::not_found(format!("disruption {disruption_id}")))?;
        row.value.attach_route(route_id);
        Ok(())
    }

    fn active_disruptions(&self, as_of: DateTime<Utc>) -> AgentResult<Vec<Disruption>> {
        Ok(sorted(
            self.read()?
                .disruptions
                .values()
                .filter(|r| r.value.is_active(as_of))
                .cloned(),
        ))
    }

    fn insert_inspection(&self, inspection: Inspection) -> AgentResult<InspectionId> {
        let mut inner = self.write()?;
        let id = inspection.id;
        let seq = inner.next_seq();
        inner.inspections.insert(id, Row { seq, value: inspection });
        Ok(id)
    }

    fn inspection(&self, id: InspectionId) -> AgentResult<Inspection> {
        self.read()?
            .inspections
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| AgentError::not_found(format!("inspection {id}")))
    }

    fn inspections_requiring_action(&self) -> AgentResult<Vec<Inspection>> {
        Ok(sorted(
            self.read()?
                .inspections
                .values()
                .filter(|r| r.value.action_required)
                .cloned(),
        ))
    }

    fn insert_explanation(&self, explanation: Explanation) -> AgentResult<ExplanationId> {
        let mut inner = self.write()?;
        let id = explanation.id;
        let seq = inner.next_seq();
        inner.explanations.insert(id, Row { seq, value: explanation });
        Ok(id)
    }

    fn explanation(&self, id: ExplanationId) -> AgentResult<Explanation> {
        self.read()?
            .explanations
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| AgentError::not_found(format!("explanation {id}")))
    }

    fn explanations_created_after(&self, cutoff: DateTime<Utc>) -> AgentResult<Vec<Explanation>> {
        Ok(sorted(
            self.read()?
                .explanations
                .values()
                .filter(|r| r.value.created_at >= cutoff)
                .cloned(),
        ))
    }

    fn insert_coordination(&self, coordination: Coordination) -> AgentResult<CoordinationId> {
        let mut inner = self.write()?;
        let id = coordination.id;
        let seq = inner.next_seq();
        inner.coordinations.insert(id, Row { seq, value: coordination });
        Ok(id)
    }

    fn coordination(&self, id: CoordinationId) -> AgentResult<Coordination> {
        self.read()?
            .coordinations
            .get(&id)
            .map(|r| r.value.clone())
            .ok_or_else(|| AgentError::not_found(format!("coordination {id}")))
    }

    fn update_coordination(&self, coordination: &Coordination) -> AgentResult<()> {
        let mut inner = self.write()?;
        let row = inner
            .coordinations
            .get_mut(&coordination.id)
            .ok_or_else(|| AgentError::not_found(format!("coordination {}", coordination.id)))?;
        row.value = coordination.clone();
        Ok(())
    }

    fn append_metric(&self, metric: Metric) -> AgentResult<MetricId> {
        let mut inner = self.write()?;
        let id = metric.id;
        inner.metrics.push(metric);
        Ok(id)
    }

    fn metrics_in_range(
        &self,
        agent_name: &str,
        metric_type: Option<MetricType>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AgentResult<Vec<Metric>> {
        let inner = self.read()?;
        let mut samples: Vec<Metric> = inner
            .metrics
            .iter()
            .filter(|m| m.agent_name == agent_name)
            .filter(|m| metric_type.is_none_or(|t| m.metric_type == t))
            .filter(|m| m.timestamp >= from && m.timestamp <= to)
            .cloned()
            .collect();
        samples.sort_by_key(|m| m.timestamp);
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use serde_json::json;
    use supplymesh_domain::{DisruptionEvent, Severity, TrafficConditions, Urgency};

    fn store_of(kind: StoreType, s: &InMemoryEntityStore) -> Store {
        let store = Store::new("loc", kind, 1000, Utc::now());
        s.insert_store(store.clone()).unwrap();
        store
    }

    fn product(s: &InMemoryEntityStore) -> Product {
        let p = Product::new("Milk", "dairy", 250, 1.0, Some(7), 10, 100, Utc::now()).unwrap();
        s.insert_product(p.clone()).unwrap();
        p
    }

    fn pending_action(s: &InMemoryEntityStore) -> RebalanceAction {
        let target = store_of(StoreType::Store, s);
        let source = store_of(StoreType::Warehouse, s);
        let p = product(s);
        let action = RebalanceAction::new(
            source.id,
            target.id,
            p.id,
            40,
            Urgency::Medium,
            "test",
            Utc::now(),
        )
        .unwrap();
        s.insert_rebalance_action(action.clone()).unwrap();
        action
    }

    fn route_for(action: &RebalanceAction) -> Route {
        Route::new(
            action.id,
            action.source_store,
            action.target_store,
            12.0,
            0.5,
            18_000,
            TrafficConditions::Light,
            Utc::now(),
        )
    }

    #[test]
    fn missing_rows_are_not_found() {
        let s = InMemoryEntityStore::new();
        assert!(matches!(s.store(StoreId::new()), Err(AgentError::NotFound(_))));
        assert!(matches!(s.product(ProductId::new()), Err(AgentError::NotFound(_))));
        assert!(matches!(
            s.rebalance_action(RebalanceActionId::new()),
            Err(AgentError::NotFound(_))
        ));
    }

    #[test]
    fn duplicate_forecast_triple_is_rejected() {
        let s = InMemoryEntityStore::new();
        let target = store_of(StoreType::Store, &s);
        let p = product(&s);
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let first =
            Forecast::new(target.id, p.id, date, 80, 0.9, 7, json!({}), Utc::now()).unwrap();
        s.insert_forecast(first).unwrap();

        let second =
            Forecast::new(target.id, p.id, date, 30, 0.5, 7, json!({}), Utc::now()).unwrap();
        assert!(matches!(
            s.insert_forecast(second),
            Err(AgentError::UniquenessViolation(_))
        ));

        // A different day is fine.
        let next_day = Forecast::new(
            target.id,
            p.id,
            date.succ_opt().unwrap(),
            80,
            0.9,
            7,
            json!({}),
            Utc::now(),
        )
        .unwrap();
        s.insert_forecast(next_day).unwrap();
    }

    #[test]
    fn rebalance_claim_blocks_second_outstanding_action() {
        let s = InMemoryEntityStore::new();
        let action = pending_action(&s);

        let dup = RebalanceAction::new(
            action.source_store,
            action.target_store,
            action.product_id,
            99,
            Urgency::High,
            "dup",
            Utc::now(),
        )
        .unwrap();
        assert!(matches!(
            s.insert_rebalance_action(dup.clone()),
            Err(AgentError::UniquenessViolation(_))
        ));

        // Completing the first frees the key.
        let mut done = action;
        done.approve().unwrap();
        done.start().unwrap();
        done.complete(Utc::now()).unwrap();
        s.update_rebalance_action(&done).unwrap();
        s.insert_rebalance_action(dup).unwrap();
    }

    #[test]
    fn route_and_approve_is_atomic_and_one_to_one() {
        let s = InMemoryEntityStore::new();
        let action = pending_action(&s);

        let route_id = s.insert_route_and_approve(route_for(&action)).unwrap();
        assert_eq!(
            s.rebalance_action(action.id).unwrap().status,
            ActionStatus::Approved
        );
        assert_eq!(s.route_for_action(action.id).unwrap().unwrap().id, route_id);

        // Second plan for the same action: the action is no longer pending.
        let err = s.insert_route_and_approve(route_for(&action)).unwrap_err();
        assert!(matches!(err, AgentError::InvalidState(_)));
        assert!(s.open_routes().unwrap().len() == 1);
    }

    #[test]
    fn superseding_cancels_the_previous_route() {
        let s = InMemoryEntityStore::new();
        let action = pending_action(&s);
        let first = s.insert_route_and_approve(route_for(&action)).unwrap();

        let second = s.supersede_route(route_for(&action)).unwrap();
        assert_eq!(s.route(first).unwrap().status, RouteStatus::Cancelled);
        assert_eq!(s.route_for_action(action.id).unwrap().unwrap().id, second);
        assert_eq!(s.open_routes().unwrap().len(), 1);
    }

    #[test]
    fn active_disruptions_respect_as_of() {
        let s = InMemoryEntityStore::new();
        let now = Utc::now();
        let open = Disruption::new(
            DisruptionEvent::Weather,
            "Heavy rainfall expected",
            "desc",
            Severity::Medium,
            now - Duration::hours(1),
            None,
            now,
        );
        let closed = Disruption::new(
            DisruptionEvent::Strike,
            "Transport workers strike",
            "desc",
            Severity::High,
            now - Duration::hours(3),
            Some(now - Duration::minutes(10)),
            now,
        );
        s.insert_disruption(open.clone()).unwrap();
        s.insert_disruption(closed).unwrap();

        let active = s.active_disruptions(now).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, open.id);

        // Rewinding as_of before the strike ended reports both.
        let active = s.active_disruptions(now - Duration::minutes(30)).unwrap();
        assert_eq!(active.len(), 2);
    }

    #[test]
    fn listing_follows_creation_order() {
        let s = InMemoryEntityStore::new();
        let a = store_of(StoreType::Warehouse, &s);
        let b = store_of(StoreType::Warehouse, &s);
        let c = store_of(StoreType::Warehouse, &s);
        let listed: Vec<StoreId> = s
            .stores_by_type(StoreType::Warehouse)
            .unwrap()
            .into_iter()
            .map(|st| st.id)
            .collect();
        assert_eq!(listed, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn metric_range_query_filters_by_agent_type_and_window() {
        let s = InMemoryEntityStore::new();
        let now = Utc::now();
        s.append_metric(Metric::response_time("ForecastAgent", 250.0, now)).unwrap();
        s.append_metric(Metric::throughput("ForecastAgent", 3, "forecasts", now)).unwrap();
        s.append_metric(Metric::response_time("ExplainerAgent", 2000.0, now)).unwrap();
        s.append_metric(Metric::response_time(
            "ForecastAgent",
            400.0,
            now - Duration::hours(2),
        ))
        .unwrap();

        let samples = s
            .metrics_in_range(
                "ForecastAgent",
                Some(MetricType::ResponseTime),
                now - Duration::hours(1),
                now,
            )
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 250.0);

        let all_types = s
            .metrics_in_range("ForecastAgent", None, now - Duration::hours(3), now)
            .unwrap();
        assert_eq!(all_types.len(), 3);
    }
}
