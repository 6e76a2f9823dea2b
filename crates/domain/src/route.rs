use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use supplymesh_core::{AgentError, AgentResult, RebalanceActionId, RouteId, StoreId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    Active,
    Delayed,
    Completed,
    Cancelled,
}

impl RouteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RouteStatus::Completed | RouteStatus::Cancelled)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficConditions {
    Light,
    Medium,
    Heavy,
}

/// A planned transfer route, tied 1:1 to its rebalance action.
///
/// The entity store enforces the 1:1 tie; a replanned route supersedes (and
/// cancels) the previous one rather than duplicating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub rebalance_action_id: RebalanceActionId,
    pub start_store: StoreId,
    pub end_store: StoreId,
    pub distance_km: f64,
    pub duration_hours: f64,
    /// Cost in the smallest currency unit.
    pub cost: u64,
    pub traffic: TrafficConditions,
    pub status: RouteStatus,
    /// Opaque alternative-route descriptions.
    pub alternatives: Vec<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl Route {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rebalance_action_id: RebalanceActionId,
        start_store: StoreId,
        end_store: StoreId,
        distance_km: f64,
        duration_hours: f64,
        cost: u64,
        traffic: TrafficConditions,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RouteId::new(),
            rebalance_action_id,
            start_store,
            end_store,
            distance_km,
            duration_hours,
            cost,
            traffic,
            status: RouteStatus::Planned,
            alternatives: Vec::new(),
            created_at,
        }
    }

    fn transition(&mut self, allowed_from: &[RouteStatus], to: RouteStatus) -> AgentResult<()> {
        if !allowed_from.contains(&self.status) {
            return Err(AgentError::invalid_state(format!(
                "route {} is {:?}, cannot move to {:?}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }

    pub fn activate(&mut self) -> AgentResult<()> {
        self.transition(&[RouteStatus::Planned, RouteStatus::Delayed], RouteStatus::Active)
    }

    pub fn delay(&mut self) -> AgentResult<()> {
        self.transition(&[RouteStatus::Planned, RouteStatus::Active], RouteStatus::Delayed)
    }

    pub fn complete(&mut self) -> AgentResult<()> {
        self.transition(&[RouteStatus::Active, RouteStatus::Delayed], RouteStatus::Completed)
    }

    pub fn cancel(&mut self) -> AgentResult<()> {
        if self.status.is_terminal() {
            return Err(AgentError::invalid_state(format!(
                "route {} already terminal ({:?})",
                self.id, self.status
            )));
        }
        self.status = RouteStatus::Cancelled;
        Ok(())
    }
}
