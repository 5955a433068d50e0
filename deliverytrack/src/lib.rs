//! DeliveryTrack - live tracking for campus food deliveries
//!
//! This library follows a deliverer from the restaurant to the customer:
//! it computes distance and ETA, approximates a walking/driving path through
//! campus landmarks, keeps the session in a local store that survives
//! restarts, and mirrors it to a shared remote store that customers watch.
//!
//! # Modules
//!
//! - [`geo`] - distance, bearing, travel time and ETA formatting
//! - [`route`] - straight-line and landmark route approximation
//! - [`location`] - device location capability and a simulated provider
//! - [`lookup`] - restaurant and address coordinate resolution
//! - [`storage`] - local key-value persistence
//! - [`sync`] - remote document store and the tracking sync bridge
//! - [`tracking`] - session manager, stage machine, samples, subscriber
//! - [`config`] - tunables and `config.ini` handling
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod geo;
pub mod location;
pub mod logging;
pub mod lookup;
pub mod route;
pub mod storage;
pub mod sync;
pub mod tracking;

pub use config::TrackingConfig;
pub use tracking::{TrackingError, TrackingSession, TrackingSessionManager};
