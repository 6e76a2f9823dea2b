//! The six pipeline agents.
//!
//! Each agent is a stateless unit of work: it reads and writes the entity
//! store, emits one metric sample per run, and returns a structured
//! [`TaskOutcome`](supplymesh_core::TaskOutcome). The heavy computation each
//! agent stands in for (demand models, routing, vision, text generation) is
//! injected behind a capability trait in [`models`], so the pipeline contract
//! can be exercised with deterministic implementations.

pub mod agent;
pub mod disruption_monitor;
pub mod explainer;
pub mod forecast;
pub mod models;
pub mod rebalancer;
pub mod route_planner;
pub mod tasks;
pub mod vision_inspector;

pub use agent::{Agent, names};
pub use disruption_monitor::DisruptionMonitorAgent;
pub use explainer::{ExplainerAgent, ExplainerInput};
pub use forecast::{ForecastAgent, ForecastInput};
pub use rebalancer::RebalancerAgent;
pub use route_planner::{RoutePlannerAgent, RoutePlannerInput};
pub use vision_inspector::{VisionInspectorAgent, VisionInspectorInput};
