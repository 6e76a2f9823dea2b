use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplymesh_core::{DisruptionId, RouteId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisruptionEvent {
    Weather,
    Traffic,
    Strike,
    Accident,
    Festival,
    SportsEvent,
    Infrastructure,
    Other,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// An external event affecting zero or more routes.
///
/// A missing `end_time` means the disruption is still open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disruption {
    pub id: DisruptionId,
    pub event_type: DisruptionEvent,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub affected_routes: Vec<RouteId>,
    pub created_at: DateTime<Utc>,
}

impl Disruption {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_type: DisruptionEvent,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DisruptionId::new(),
            event_type,
            title: title.into(),
            description: description.into(),
            severity,
            start_time,
            end_time,
            affected_routes: Vec::new(),
            created_at,
        }
    }

    /// Active at `at` iff `start_time <= at` and `end_time` is unset or
    /// `end_time >= at`. Both boundaries count as active.
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && self.end_time.is_none_or(|end| end >= at)
    }

    pub fn attach_route(&mut self, route_id: RouteId) {
        if !self.affected_routes.contains(&route_id) {
            self.affected_routes.push(route_id);
        }
    }

    pub fn close(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
    }
}
