//! Channel-driven location provider for tests and simulation.
//!
//! Positions are injected through a [`SimulatedLocationHandle`]. Each watcher
//! applies its own [`WatchOptions`] gate against the fix timestamps, so the
//! emitted stream matches what a device watcher configured the same way
//! would deliver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{LocationError, LocationFix, LocationProvider, WatchOptions};
use crate::geo::distance_km;

/// Buffered fixes per watcher before new ones are dropped.
const WATCH_CHANNEL_CAPACITY: usize = 64;

struct Watcher {
    tx: mpsc::Sender<LocationFix>,
    options: WatchOptions,
    last_emitted: Option<LocationFix>,
}

impl Watcher {
    fn should_emit(&self, fix: &LocationFix) -> bool {
        let Some(last) = self.last_emitted else {
            return true;
        };
        let moved_m = distance_km(last.point(), fix.point()) * 1000.0;
        if moved_m >= self.options.distance_m {
            return true;
        }
        let interval = ChronoDuration::from_std(self.options.interval).unwrap_or(ChronoDuration::MAX);
        fix.timestamp - last.timestamp >= interval
    }
}

struct Inner {
    permission_granted: AtomicBool,
    current: Mutex<Option<LocationFix>>,
    watchers: Mutex<Vec<Watcher>>,
}

/// Simulated device location.
#[derive(Clone)]
pub struct SimulatedLocationProvider {
    inner: Arc<Inner>,
}

/// Control side of a [`SimulatedLocationProvider`].
#[derive(Clone)]
pub struct SimulatedLocationHandle {
    inner: Arc<Inner>,
}

impl Default for SimulatedLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLocationProvider {
    /// Create a provider with permission granted and no fix yet.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                permission_granted: AtomicBool::new(true),
                current: Mutex::new(None),
                watchers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Handle for injecting positions.
    pub fn handle(&self) -> SimulatedLocationHandle {
        SimulatedLocationHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SimulatedLocationHandle {
    /// Grant or revoke location permission.
    pub fn set_permission(&self, granted: bool) {
        self.inner.permission_granted.store(granted, Ordering::SeqCst);
    }

    /// Move the device. Returns how many watchers received the fix.
    pub fn move_to(&self, fix: LocationFix) -> usize {
        *self.inner.current.lock() = Some(fix);

        let mut watchers = self.inner.watchers.lock();
        watchers.retain(|w| !w.tx.is_closed());

        let mut delivered = 0;
        for watcher in watchers.iter_mut() {
            if !watcher.should_emit(&fix) {
                continue;
            }
            match watcher.tx.try_send(fix) {
                Ok(()) => {
                    watcher.last_emitted = Some(fix);
                    delivered += 1;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Simulated watcher dropped a fix");
                }
            }
        }
        delivered
    }

    /// Number of live watchers.
    pub fn watcher_count(&self) -> usize {
        let mut watchers = self.inner.watchers.lock();
        watchers.retain(|w| !w.tx.is_closed());
        watchers.len()
    }
}

impl LocationProvider for SimulatedLocationProvider {
    fn ensure_permission(&self) -> BoxFuture<'_, Result<(), LocationError>> {
        Box::pin(async move {
            if self.inner.permission_granted.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(LocationError::PermissionDenied)
            }
        })
    }

    fn current_fix(&self) -> BoxFuture<'_, Result<LocationFix, LocationError>> {
        Box::pin(async move {
            if !self.inner.permission_granted.load(Ordering::SeqCst) {
                return Err(LocationError::PermissionDenied);
            }
            (*self.inner.current.lock())
                .ok_or_else(|| LocationError::Unavailable("no position reported yet".to_string()))
        })
    }

    fn watch(&self, options: WatchOptions) -> Result<mpsc::Receiver<LocationFix>, LocationError> {
        if !self.inner.permission_granted.load(Ordering::SeqCst) {
            return Err(LocationError::PermissionDenied);
        }
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        self.inner.watchers.lock().push(Watcher {
            tx,
            options,
            last_emitted: None,
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn fix(lat: f64, lon: f64, secs: i64) -> LocationFix {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        LocationFix::at(GeoPoint::new(lat, lon), base + ChronoDuration::seconds(secs))
    }

    #[tokio::test]
    async fn test_current_fix_requires_position() {
        let provider = SimulatedLocationProvider::new();
        assert!(matches!(
            provider.current_fix().await,
            Err(LocationError::Unavailable(_))
        ));

        provider.handle().move_to(fix(36.1452, -86.8028, 0));
        let current = provider.current_fix().await.unwrap();
        assert_eq!(current.latitude, 36.1452);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let provider = SimulatedLocationProvider::new();
        let handle = provider.handle();
        handle.move_to(fix(36.1452, -86.8028, 0));
        handle.set_permission(false);

        assert_eq!(
            provider.ensure_permission().await,
            Err(LocationError::PermissionDenied)
        );
        assert_eq!(
            provider.current_fix().await,
            Err(LocationError::PermissionDenied)
        );
        assert!(provider.watch(WatchOptions::default()).is_err());
    }

    #[tokio::test]
    async fn test_watch_gate_distance_or_interval() {
        let provider = SimulatedLocationProvider::new();
        let handle = provider.handle();
        let mut rx = provider
            .watch(WatchOptions {
                distance_m: 10.0,
                interval: Duration::from_secs(10),
            })
            .unwrap();

        // First fix always passes
        assert_eq!(handle.move_to(fix(36.14520, -86.8028, 0)), 1);
        // ~1 m later, 2 s later: gated
        assert_eq!(handle.move_to(fix(36.14521, -86.8028, 2)), 0);
        // ~22 m away: passes on distance
        assert_eq!(handle.move_to(fix(36.14540, -86.8028, 3)), 1);
        // Same spot, 10 s after last emission: passes on time
        assert_eq!(handle.move_to(fix(36.14540, -86.8028, 13)), 1);

        let mut received = Vec::new();
        while let Ok(f) = rx.try_recv() {
            received.push(f);
        }
        assert_eq!(received.len(), 3);
    }

    #[tokio::test]
    async fn test_dropped_receiver_unsubscribes() {
        let provider = SimulatedLocationProvider::new();
        let handle = provider.handle();
        let rx = provider.watch(WatchOptions::default()).unwrap();
        assert_eq!(handle.watcher_count(), 1);

        drop(rx);
        assert_eq!(handle.watcher_count(), 0);
        assert_eq!(handle.move_to(fix(36.1452, -86.8028, 0)), 0);
    }
}
