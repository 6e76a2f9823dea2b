//! Entity store abstraction.

use chrono::{DateTime, Utc};

use supplymesh_core::{
    AgentResult, CoordinationId, DisruptionId, ExplanationId, ForecastId, InspectionId, MetricId,
    ProductId, RebalanceActionId, RouteId, StoreId,
};
use supplymesh_domain::{
    Coordination, Disruption, Explanation, Forecast, Inspection, Metric, MetricType, Product,
    RebalanceAction, Route, Store, StoreType,
};

/// Durable records for the pipeline.
///
/// Agents and the coordinator hold no state of their own; everything they
/// know is read through this trait or passed in as task input. Listing
/// methods return rows in creation (insertion-sequence) order.
pub trait EntityStore: Send + Sync {
    // --- stores ---

    fn insert_store(&self, store: Store) -> AgentResult<StoreId>;
    fn store(&self, id: StoreId) -> AgentResult<Store>;
    fn stores(&self) -> AgentResult<Vec<Store>>;
    fn stores_by_type(&self, store_type: StoreType) -> AgentResult<Vec<Store>>;
    /// `active` is the only mutable Store field.
    fn set_store_active(&self, id: StoreId, active: bool) -> AgentResult<()>;

    // --- products ---

    fn insert_product(&self, product: Product) -> AgentResult<ProductId>;
    fn product(&self, id: ProductId) -> AgentResult<Product>;
    fn products(&self) -> AgentResult<Vec<Product>>;

    // --- forecasts ---

    /// Fails with `UniquenessViolation` if a forecast already exists for the
    /// same (store, product, forecast_date) triple.
    fn insert_forecast(&self, forecast: Forecast) -> AgentResult<ForecastId>;
    fn forecast(&self, id: ForecastId) -> AgentResult<Forecast>;
    /// Forecasts created after `created_after` with demand >= `min_demand`.
    fn forecasts_in_window(
        &self,
        created_after: DateTime<Utc>,
        min_demand: u32,
    ) -> AgentResult<Vec<Forecast>>;

    // --- rebalance actions ---

    /// Transactional claim: fails with `UniquenessViolation` if any
    /// outstanding (non-terminal) action already exists for the same
    /// (target_store, product) pair. Check and insert are atomic.
    fn insert_rebalance_action(&self, action: RebalanceAction) -> AgentResult<RebalanceActionId>;
    fn rebalance_action(&self, id: RebalanceActionId) -> AgentResult<RebalanceAction>;
    fn update_rebalance_action(&self, action: &RebalanceAction) -> AgentResult<()>;
    fn outstanding_rebalance_actions(&self) -> AgentResult<Vec<RebalanceAction>>;
    fn has_outstanding_rebalance(&self, target: StoreId, product: ProductId) -> AgentResult<bool>;

    // --- routes ---

    /// Create the route for a pending action and advance the action to
    /// `approved`, as one atomic operation. Fails with `InvalidState` if the
    /// action is not pending or already has a live route.
    fn insert_route_and_approve(&self, route: Route) -> AgentResult<RouteId>;
    /// Replace the live route of an action: cancels any non-terminal route
    /// tied to `route.rebalance_action_id` and inserts `route`. Supersedes,
    /// never duplicates.
    fn supersede_route(&self, route: Route) -> AgentResult<RouteId>;
    fn route(&self, id: RouteId) -> AgentResult<Route>;
    fn route_for_action(&self, action_id: RebalanceActionId) -> AgentResult<Option<Route>>;
    fn update_route(&self, route: &Route) -> AgentResult<()>;
    /// Routes in `planned` or `active` status.
    fn open_routes(&self) -> AgentResult<Vec<Route>>;

    // --- disruptions ---

    fn insert_disruption(&self, disruption: Disruption) -> AgentResult<DisruptionId>;
    fn disruption(&self, id: DisruptionId) -> AgentResult<Disruption>;
    fn update_disruption(&self, disruption: &Disruption) -> AgentResult<()>;
    fn attach_route_to_disruption(
        &self,
        disruption_id: DisruptionId,
        route_id: RouteId,
    ) -> AgentResult<()>;
    fn active_disruptions(&self, as_of: DateTime<Utc>) -> AgentResult<Vec<Disruption>>;

    // --- inspections ---

    fn insert_inspection(&self, inspection: Inspection) -> AgentResult<InspectionId>;
    fn inspection(&self, id: InspectionId) -> AgentResult<Inspection>;
    fn inspections_requiring_action(&self) -> AgentResult<Vec<Inspection>>;

    // --- explanations ---

    fn insert_explanation(&self, explanation: Explanation) -> AgentResult<ExplanationId>;
    fn explanation(&self, id: ExplanationId) -> AgentResult<Explanation>;
    fn explanations_created_after(&self, cutoff: DateTime<Utc>) -> AgentResult<Vec<Explanation>>;

    // --- coordinations ---

    fn insert_coordination(&self, coordination: Coordination) -> AgentResult<CoordinationId>;
    fn coordination(&self, id: CoordinationId) -> AgentResult<Coordination>;
    fn update_coordination(&self, coordination: &Coordination) -> AgentResult<()>;

    // --- metrics sink ---

    /// Append-only; there is deliberately no update or delete.
    fn append_metric(&self, metric: Metric) -> AgentResult<MetricId>;
    /// Samples for one agent in `[from, to]`, optionally filtered by type,
    /// in timestamp order.
    fn metrics_in_range(
        &self,
        agent_name: &str,
        metric_type: Option<MetricType>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AgentResult<Vec<Metric>>;
}
