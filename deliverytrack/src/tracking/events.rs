//! Lifecycle events published by the session manager.

use std::fmt;

use serde::Serialize;

use super::order::OrderStatus;
use super::stage::RouteStage;

/// Broadcast channel capacity for tracking events.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `stop_tracking` was called.
    Requested,
    /// A new session was started.
    Replaced,
    /// The order reached `delivered` or the route completed.
    Delivered,
    /// The order was cancelled remotely.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Requested => "requested",
            StopReason::Replaced => "replaced",
            StopReason::Delivered => "delivered",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Something happened to the active session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackingEvent {
    Started {
        order_id: String,
        /// True when re-attached from persisted state.
        resumed: bool,
    },
    PositionUpdated {
        order_id: String,
        distance_remaining: f64,
        estimated_time_remaining: f64,
    },
    StageChanged {
        order_id: String,
        from: RouteStage,
        to: RouteStage,
    },
    StatusMirrored {
        order_id: String,
        status: OrderStatus,
    },
    Stopped {
        order_id: String,
        reason: StopReason,
    },
}

impl TrackingEvent {
    pub fn order_id(&self) -> &str {
        match self {
            TrackingEvent::Started { order_id, .. }
            | TrackingEvent::PositionUpdated { order_id, .. }
            | TrackingEvent::StageChanged { order_id, .. }
            | TrackingEvent::StatusMirrored { order_id, .. }
            | TrackingEvent::Stopped { order_id, .. } => order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_tagged() {
        let event = TrackingEvent::Stopped {
            order_id: "order-1".into(),
            reason: StopReason::Delivered,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "stopped");
        assert_eq!(json["reason"], "delivered");
        assert_eq!(event.order_id(), "order-1");
    }
}
