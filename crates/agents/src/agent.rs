//! The uniform agent contract.

use chrono::{DateTime, Utc};

use supplymesh_core::{AgentResult, TaskOutcome};
use supplymesh_storage::EntityStore;

/// Canonical agent names, as recorded in metrics, explanations, and
/// coordination timelines.
pub mod names {
    pub const FORECAST: &str = "ForecastAgent";
    pub const REBALANCER: &str = "RebalancerAgent";
    pub const ROUTE_PLANNER: &str = "RoutePlannerAgent";
    pub const DISRUPTION_MONITOR: &str = "DisruptionMonitorAgent";
    pub const VISION_INSPECTOR: &str = "VisionInspectorAgent";
    pub const EXPLAINER: &str = "ExplainerAgent";
    pub const COORDINATOR: &str = "Coordinator";

    pub const ALL: [&str; 7] = [
        FORECAST,
        REBALANCER,
        ROUTE_PLANNER,
        DISRUPTION_MONITOR,
        VISION_INSPECTOR,
        EXPLAINER,
        COORDINATOR,
    ];
}

/// A stateless unit of work over the entity store.
///
/// Agents hold no state between invocations; everything they need is read
/// from the store or carried in `Input`. `as_of` anchors every time-windowed
/// query the agent makes, so runs are reproducible in tests.
pub trait Agent: Send + Sync {
    type Input;

    fn name(&self) -> &'static str;

    fn execute(
        &self,
        store: &dyn EntityStore,
        input: Self::Input,
        as_of: DateTime<Utc>,
    ) -> AgentResult<TaskOutcome>;
}
