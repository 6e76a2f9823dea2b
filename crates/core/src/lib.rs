//! `supplymesh-core`: shared foundation for the agent pipeline.
//!
//! This crate contains the pieces every other crate agrees on: strongly-typed
//! identifiers, the error taxonomy, and the structured outcome every task
//! invocation returns. No entity definitions and no I/O live here.

pub mod error;
pub mod id;
pub mod outcome;

pub use error::{AgentError, AgentResult};
pub use id::{
    CoordinationId, DisruptionId, ExplanationId, ForecastId, InspectionId, MetricId, ProductId,
    RebalanceActionId, RouteId, StoreId,
};
pub use outcome::TaskOutcome;
