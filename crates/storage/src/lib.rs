//! `supplymesh-storage`: the entity store.
//!
//! The one shared mutable resource in the pipeline. All cross-record
//! invariants live here as atomic operations:
//!
//! - a Forecast's (store, product, date) triple is unique;
//! - at most one outstanding RebalanceAction per (target, product): the
//!   outstanding check and the insert happen under one write lock, so
//!   concurrent rebalancer runs cannot race a duplicate in;
//! - at most one live Route per RebalanceAction, with route creation and the
//!   pending → approved flip committed together;
//! - Metric rows are append-only.

pub mod entity_store;
pub mod in_memory;

pub use entity_store::EntityStore;
pub use in_memory::InMemoryEntityStore;
