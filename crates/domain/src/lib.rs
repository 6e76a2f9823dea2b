//! `supplymesh-domain`: the entities of the supply-chain pipeline.
//!
//! One module per entity. Status transitions live on the entity types so a
//! record can never be observed in a state its own methods would refuse;
//! cross-record constraints (unique keys, 1:1 ties) are owned by the entity
//! store.

pub mod coordination;
pub mod disruption;
pub mod explanation;
pub mod forecast;
pub mod inspection;
pub mod metric;
pub mod product;
pub mod rebalance;
pub mod route;
pub mod store;

pub use coordination::{Coordination, CoordinationEvent, CoordinationStatus, Priority, StepStatus, TimelineStep};
pub use disruption::{Disruption, DisruptionEvent, Severity};
pub use explanation::{ConfidenceLevel, Explanation};
pub use forecast::{Forecast, ForecastKey};
pub use inspection::{AnomalyTag, DetectedObject, Inspection, InspectionPriority, InspectionType};
pub use metric::{Metric, MetricType};
pub use product::Product;
pub use rebalance::{ActionStatus, RebalanceAction, Urgency};
pub use route::{Route, RouteStatus, TrafficConditions};
pub use store::{Store, StoreType};
