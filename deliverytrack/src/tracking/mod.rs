//! Delivery tracking.
//!
//! The [`TrackingSessionManager`] owns one [`TrackingSession`] at a time.
//! Each location fix updates the session, the [`LocationSampleStore`] keeps
//! the recent trail, and the [`RouteStageMachine`] follows the order from
//! the restaurant to the customer. State is persisted locally and mirrored
//! to the remote store, where a [`CustomerTrackingSubscriber`] can watch it.

mod error;
mod events;
mod manager;
mod order;
mod persisted;
mod samples;
mod session;
mod stage;
mod subscriber;

pub use error::TrackingError;
pub use events::{StopReason, TrackingEvent, EVENT_CHANNEL_CAPACITY};
pub use manager::TrackingSessionManager;
pub use order::{Order, OrderStatus};
pub use persisted::{
    PersistedTracking, CURRENT_DELIVERY_KEY, LOCATION_UPDATES_KEY, TRACKING_ENABLED_KEY,
};
pub use samples::{LocationSample, LocationSampleStore, DEFAULT_SAMPLE_CAPACITY};
pub use session::{CurrentLocation, NamedLocation, PositionUpdate, TrackingSession};
pub use stage::{RouteStage, RouteStageMachine, StageError, StageUpdate};
pub use subscriber::CustomerTrackingSubscriber;
