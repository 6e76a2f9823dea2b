//! Multi-agent coordination.
//!
//! The [`Coordinator`] sequences a declared list of agents into one
//! auditable Coordination record; [`workflow`] is the canonical end-to-end
//! run threading every agent's output into the next one's input.

pub mod coordinator;
pub mod workflow;

pub use coordinator::{AcknowledgeSteps, CoordinationRequest, Coordinator, StepExecutor};
pub use workflow::{WorkflowReport, run_workflow_simulation};
