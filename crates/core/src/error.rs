//! Error taxonomy shared by agents, the coordinator, and the entity store.

use thiserror::Error;

/// Result type used across the pipeline.
pub type AgentResult<T> = Result<T, AgentError>;

/// Pipeline-level error.
///
/// Every fault surfaced to a caller falls into one of these four buckets;
/// the HTTP layer maps the first three to 4xx and `Unhandled` to 5xx.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// A referenced record (store, product, action, ...) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create attempt would duplicate a unique key (forecast triple,
    /// outstanding rebalance action for a target/product pair).
    #[error("uniqueness violation: {0}")]
    UniquenessViolation(String),

    /// The target record is not in a state that permits the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Anything else: internal faults, captured panics, bad payloads.
    #[error("internal error: {0}")]
    Unhandled(String),
}

impl AgentError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn uniqueness(msg: impl Into<String>) -> Self {
        Self::UniquenessViolation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn unhandled(msg: impl Into<String>) -> Self {
        Self::Unhandled(msg.into())
    }
}
