//! Errors surfaced by the tracking session manager.

use thiserror::Error;

use crate::location::LocationError;
use crate::storage::StorageError;

/// Failures that stop a session from starting or resuming.
///
/// Remote sync problems never appear here; they are logged and swallowed.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Location permission was not granted.
    #[error("Location permission denied")]
    PermissionDenied,

    /// No initial position could be obtained.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    /// The order document could not be read or does not exist.
    #[error("Order {order_id} unavailable: {reason}")]
    OrderUnavailable { order_id: String, reason: String },

    /// The order is already delivered or cancelled.
    #[error("Order {order_id} is already {status}")]
    OrderClosed { order_id: String, status: String },

    /// A restaurant or address could not be turned into coordinates.
    #[error("Could not resolve coordinates for {what}: {reason}")]
    CoordinateResolution { what: String, reason: String },

    /// Local persistence failed.
    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TrackingError {
    /// A sentence suitable for showing to the deliverer.
    pub fn user_message(&self) -> String {
        match self {
            TrackingError::PermissionDenied => {
                "Location access is required to share your delivery progress. \
                 Enable location permission and try again."
                    .to_string()
            }
            TrackingError::LocationUnavailable(_) => {
                "Your location could not be determined. Move somewhere with a clearer signal and try again."
                    .to_string()
            }
            TrackingError::OrderUnavailable { .. } => {
                "The order could not be loaded. Check your connection and try again.".to_string()
            }
            TrackingError::OrderClosed { status, .. } => {
                format!("This order is already {} and can no longer be tracked.", status)
            }
            TrackingError::CoordinateResolution { what, .. } => {
                format!("The location of {} could not be found.", what)
            }
            TrackingError::Storage(_) => {
                "Tracking state could not be saved on this device.".to_string()
            }
        }
    }
}

impl From<LocationError> for TrackingError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::PermissionDenied => TrackingError::PermissionDenied,
            LocationError::Unavailable(reason) => TrackingError::LocationUnavailable(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_error_conversion() {
        assert!(matches!(
            TrackingError::from(LocationError::PermissionDenied),
            TrackingError::PermissionDenied
        ));
        assert!(matches!(
            TrackingError::from(LocationError::Unavailable("no gps".into())),
            TrackingError::LocationUnavailable(r) if r == "no gps"
        ));
    }

    #[test]
    fn test_user_messages_are_actionable() {
        let closed = TrackingError::OrderClosed {
            order_id: "order-1".into(),
            status: "delivered".into(),
        };
        assert!(closed.user_message().contains("already delivered"));
        assert!(TrackingError::PermissionDenied.user_message().contains("permission"));
        assert_eq!(closed.to_string(), "Order order-1 is already delivered");
    }
}
