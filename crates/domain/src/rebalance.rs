use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplymesh_core::{AgentError, AgentResult, ProductId, RebalanceActionId, StoreId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle of a rebalance action.
///
/// `pending → approved → in_progress → completed`, with `rejected` reachable
/// from any non-terminal state. `Rejected` and `Completed` are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Approved,
    Rejected,
    InProgress,
    Completed,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Rejected | ActionStatus::Completed)
    }

    /// An outstanding action blocks new actions for the same (target, product).
    pub fn is_outstanding(&self) -> bool {
        !self.is_terminal()
    }
}

/// A stock transfer proposed by the rebalancer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub id: RebalanceActionId,
    pub source_store: StoreId,
    pub target_store: StoreId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub urgency: Urgency,
    pub reason: String,
    pub status: ActionStatus,
    /// Cost in the smallest currency unit, once estimated.
    pub estimated_cost: Option<u64>,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, only when the action completes successfully.
    pub completed_at: Option<DateTime<Utc>>,
}

impl RebalanceAction {
    pub fn new(
        source_store: StoreId,
        target_store: StoreId,
        product_id: ProductId,
        quantity: u32,
        urgency: Urgency,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> AgentResult<Self> {
        if source_store == target_store {
            return Err(AgentError::invalid_state(
                "rebalance source and target must differ",
            ));
        }
        if quantity == 0 {
            return Err(AgentError::invalid_state("rebalance quantity must be > 0"));
        }
        Ok(Self {
            id: RebalanceActionId::new(),
            source_store,
            target_store,
            product_id,
            quantity,
            urgency,
            reason: reason.into(),
            status: ActionStatus::Pending,
            estimated_cost: None,
            created_at,
            completed_at: None,
        })
    }

    fn transition(&mut self, from: ActionStatus, to: ActionStatus) -> AgentResult<()> {
        if self.status != from {
            return Err(AgentError::invalid_state(format!(
                "action {} is {:?}, expected {:?}",
                self.id, self.status, from
            )));
        }
        self.status = to;
        Ok(())
    }

    /// `pending → approved`. Driven by the route planner.
    pub fn approve(&mut self) -> AgentResult<()> {
        self.transition(ActionStatus::Pending, ActionStatus::Approved)
    }

    /// `approved → in_progress`.
    pub fn start(&mut self) -> AgentResult<()> {
        self.transition(ActionStatus::Approved, ActionStatus::InProgress)
    }

    /// `in_progress → completed`. The only transition that sets `completed_at`.
    pub fn complete(&mut self, at: DateTime<Utc>) -> AgentResult<()> {
        self.transition(ActionStatus::InProgress, ActionStatus::Completed)?;
        self.completed_at = Some(at);
        Ok(())
    }

    /// Reject from any non-terminal state. Terminal, but not a success:
    /// `completed_at` stays unset.
    pub fn reject(&mut self) -> AgentResult<()> {
        if self.status.is_terminal() {
            return Err(AgentError::invalid_state(format!(
                "action {} already terminal ({:?})",
                self.id, self.status
            )));
        }
        self.status = ActionStatus::Rejected;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> RebalanceAction {
        RebalanceAction::new(
            StoreId::new(),
            StoreId::new(),
            ProductId::new(),
            40,
            Urgency::Medium,
            "test",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn happy_path_sets_completed_at_exactly_once() {
        let mut a = action();
        assert_eq!(a.status, ActionStatus::Pending);
        a.approve().unwrap();
        a.start().unwrap();
        assert!(a.completed_at.is_none());
        let done = Utc::now();
        a.complete(done).unwrap();
        assert_eq!(a.completed_at, Some(done));
        assert!(a.complete(Utc::now()).is_err());
        assert_eq!(a.completed_at, Some(done));
    }

    #[test]
    fn rejection_is_terminal_without_completed_at() {
        let mut a = action();
        a.reject().unwrap();
        assert!(a.status.is_terminal());
        assert!(a.completed_at.is_none());
        assert!(a.approve().is_err());
        assert!(a.reject().is_err());
    }

    #[test]
    fn skipping_states_is_rejected() {
        let mut a = action();
        assert!(a.start().is_err());
        assert!(a.complete(Utc::now()).is_err());
    }

    #[test]
    fn self_transfer_is_invalid() {
        let store = StoreId::new();
        let err = RebalanceAction::new(
            store,
            store,
            ProductId::new(),
            10,
            Urgency::Low,
            "loop",
            Utc::now(),
        );
        assert!(matches!(err, Err(AgentError::InvalidState(_))));
    }
}
