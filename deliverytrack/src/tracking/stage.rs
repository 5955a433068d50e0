//! Route stage state machine.
//!
//! # State Machine
//!
//! ```text
//! ToRestaurant --[advance / status picked_up]--> ToCustomer
//! ToCustomer   --[advance / status delivered]--> Completed
//! ToRestaurant --[status delivered]-----------> Completed
//! Completed    --> (terminal)
//! ```
//!
//! Stages only move forward. Reaching `Completed` raises the completion
//! signal once; the session manager stops the session on it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::order::OrderStatus;

/// Which leg of the delivery is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStage {
    ToRestaurant,
    ToCustomer,
    Completed,
}

impl RouteStage {
    /// The stage an order status implies.
    ///
    /// Cancelled orders keep the first leg; cancellation ends the session
    /// without completing it.
    pub fn for_status(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending | OrderStatus::Accepted | OrderStatus::Cancelled => {
                RouteStage::ToRestaurant
            }
            OrderStatus::PickedUp => RouteStage::ToCustomer,
            OrderStatus::Delivered => RouteStage::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStage::ToRestaurant => "to_restaurant",
            RouteStage::ToCustomer => "to_customer",
            RouteStage::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RouteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RouteStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "to_restaurant" => Ok(RouteStage::ToRestaurant),
            "to_customer" => Ok(RouteStage::ToCustomer),
            "completed" => Ok(RouteStage::Completed),
            other => Err(format!("unknown route stage '{}'", other)),
        }
    }
}

/// Rejected stage transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The machine is already completed.
    #[error("Route is already completed")]
    Terminal,

    /// The requested stage is behind the current one.
    #[error("Cannot move route stage back from {from} to {to}")]
    Backwards { from: RouteStage, to: RouteStage },
}

/// Result of feeding the machine an action or a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageUpdate {
    /// `Some((from, to))` when the stage moved.
    pub transition: Option<(RouteStage, RouteStage)>,
    /// True exactly once: on the update that reached `Completed`.
    pub completed: bool,
}

impl StageUpdate {
    fn unchanged() -> Self {
        Self {
            transition: None,
            completed: false,
        }
    }
}

/// Forward-only route stage tracker.
#[derive(Debug, Clone)]
pub struct RouteStageMachine {
    stage: RouteStage,
    completion_signalled: bool,
}

impl Default for RouteStageMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteStageMachine {
    /// Start on the way to the restaurant.
    pub fn new() -> Self {
        Self::resume(RouteStage::ToRestaurant)
    }

    /// Start at the stage the order status implies.
    pub fn for_status(status: OrderStatus) -> Self {
        Self::resume(RouteStage::for_status(status))
    }

    /// Continue from a persisted stage. A persisted `Completed` stage has
    /// already been signalled.
    pub fn resume(stage: RouteStage) -> Self {
        Self {
            stage,
            completion_signalled: stage == RouteStage::Completed,
        }
    }

    pub fn stage(&self) -> RouteStage {
        self.stage
    }

    pub fn is_completed(&self) -> bool {
        self.stage == RouteStage::Completed
    }

    /// Explicitly move to `target` (e.g. the deliverer tapped "picked up").
    ///
    /// Re-requesting the current stage is accepted as a no-op.
    pub fn advance(&mut self, target: RouteStage) -> Result<StageUpdate, StageError> {
        if target == self.stage {
            return Ok(StageUpdate::unchanged());
        }
        if self.stage == RouteStage::Completed {
            return Err(StageError::Terminal);
        }
        if target < self.stage {
            return Err(StageError::Backwards {
                from: self.stage,
                to: target,
            });
        }
        Ok(self.move_to(target))
    }

    /// Mirror an order status. Statuses implying an earlier stage are
    /// ignored.
    pub fn apply_status(&mut self, status: OrderStatus) -> StageUpdate {
        let target = RouteStage::for_status(status);
        if target <= self.stage {
            return StageUpdate::unchanged();
        }
        self.move_to(target)
    }

    fn move_to(&mut self, target: RouteStage) -> StageUpdate {
        let from = self.stage;
        self.stage = target;

        let completed = target == RouteStage::Completed && !self.completion_signalled;
        if completed {
            self.completion_signalled = true;
        }

        StageUpdate {
            transition: Some((from, target)),
            completed,
        }
    }
}
