//! Device location capability.
//!
//! The tracking manager never polls for position. It asks a
//! [`LocationProvider`] for one initial fix and then for a watch stream;
//! the stream is an `mpsc` receiver, and dropping it unsubscribes.

mod simulated;

pub use simulated::{SimulatedLocationHandle, SimulatedLocationProvider};

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::geo::GeoPoint;

/// Default minimum movement (metres) before the watcher emits a fix.
pub const DEFAULT_WATCH_DISTANCE_M: f64 = 10.0;

/// Default maximum interval between watcher fixes.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(10);

/// Errors from the location provider.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocationError {
    /// The user has not granted location access.
    #[error("Location permission denied")]
    PermissionDenied,

    /// No fix could be obtained.
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// A position reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    /// Horizontal accuracy in metres.
    pub accuracy: Option<f64>,
    /// Heading in degrees.
    pub heading: Option<f64>,
    /// Ground speed in m/s.
    pub speed: Option<f64>,
}

impl LocationFix {
    /// A fix at `point` stamped with the current time.
    pub fn new(point: GeoPoint) -> Self {
        Self::at(point, Utc::now())
    }

    /// A fix at `point` with an explicit timestamp.
    pub fn at(point: GeoPoint, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            timestamp,
            accuracy: None,
            heading: None,
            speed: None,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// When the watcher should emit: after `distance_m` of movement or after
/// `interval`, whichever comes first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub distance_m: f64,
    pub interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            distance_m: DEFAULT_WATCH_DISTANCE_M,
            interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

/// Device location capability.
pub trait LocationProvider: Send + Sync {
    /// Check (and, where the platform allows, request) location permission.
    fn ensure_permission(&self) -> BoxFuture<'_, Result<(), LocationError>>;

    /// Obtain a single current fix.
    fn current_fix(&self) -> BoxFuture<'_, Result<LocationFix, LocationError>>;

    /// Start watching position. Fixes arrive on the returned receiver until
    /// it is dropped.
    fn watch(&self, options: WatchOptions) -> Result<mpsc::Receiver<LocationFix>, LocationError>;
}
