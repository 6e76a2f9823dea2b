use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplymesh_core::MetricId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    ResponseTime,
    Accuracy,
    Throughput,
    ErrorRate,
    SuccessRate,
    ResourceUsage,
}

/// One performance sample. Append-only: never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: MetricId,
    pub agent_name: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    pub fn new(
        agent_name: impl Into<String>,
        metric_type: MetricType,
        value: f64,
        unit: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MetricId::new(),
            agent_name: agent_name.into(),
            metric_type,
            value,
            unit: unit.into(),
            timestamp,
        }
    }

    /// Response-time sample in milliseconds.
    pub fn response_time(agent_name: impl Into<String>, ms: f64, at: DateTime<Utc>) -> Self {
        Self::new(agent_name, MetricType::ResponseTime, ms, "ms", at)
    }

    /// Throughput sample (count of things produced in one run).
    pub fn throughput(
        agent_name: impl Into<String>,
        count: u32,
        unit: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(agent_name, MetricType::Throughput, f64::from(count), unit, at)
    }
}
