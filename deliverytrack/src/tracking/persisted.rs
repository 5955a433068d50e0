//! Typed access to the locally persisted tracking state.
//!
//! Three keys survive a restart:
//!
//! | Key                         | Value                              |
//! |-----------------------------|------------------------------------|
//! | `current_delivery`          | serialized [`TrackingSession`]     |
//! | `location_updates`          | serialized `Vec<LocationSample>`   |
//! | `delivery_tracking_enabled` | `"true"` / `"false"`               |
//!
//! Malformed values read as absent.

use std::sync::Arc;

use super::samples::LocationSample;
use super::session::TrackingSession;
use crate::storage::{LocalStore, StorageError};

pub const CURRENT_DELIVERY_KEY: &str = "current_delivery";
pub const LOCATION_UPDATES_KEY: &str = "location_updates";
pub const TRACKING_ENABLED_KEY: &str = "delivery_tracking_enabled";

/// Tracking view over a [`LocalStore`].
#[derive(Clone)]
pub struct PersistedTracking {
    store: Arc<dyn LocalStore>,
}

impl PersistedTracking {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// The persisted session, if one parses.
    pub fn load_session(&self) -> Result<Option<TrackingSession>, StorageError> {
        let Some(raw) = self.store.get(CURRENT_DELIVERY_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed persisted delivery");
                Ok(None)
            }
        }
    }

    pub fn save_session(&self, session: &TrackingSession) -> Result<(), StorageError> {
        let raw = serde_json::to_string(session)?;
        self.store.set(CURRENT_DELIVERY_KEY, &raw)
    }

    /// Persisted samples, oldest first. Malformed data reads as empty.
    pub fn load_samples(&self) -> Result<Vec<LocationSample>, StorageError> {
        let Some(raw) = self.store.get(LOCATION_UPDATES_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(samples) => Ok(samples),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed persisted location samples");
                Ok(Vec::new())
            }
        }
    }

    pub fn save_samples(&self, samples: &[LocationSample]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(samples)?;
        self.store.set(LOCATION_UPDATES_KEY, &raw)
    }

    /// Whether tracking was active when the state was last written.
    pub fn is_enabled(&self) -> Result<bool, StorageError> {
        Ok(self.store.get(TRACKING_ENABLED_KEY)?.as_deref() == Some("true"))
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        self.store
            .set(TRACKING_ENABLED_KEY, if enabled { "true" } else { "false" })
    }

    /// Drop the session and samples and clear the enabled flag.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(CURRENT_DELIVERY_KEY)?;
        self.store.remove(LOCATION_UPDATES_KEY)?;
        self.set_enabled(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoPoint, TravelMode};
    use crate::location::LocationFix;
    use crate::storage::MemoryLocalStore;
    use crate::tracking::order::OrderStatus;
    use crate::tracking::session::NamedLocation;

    fn persisted() -> (Arc<MemoryLocalStore>, PersistedTracking) {
        let store = Arc::new(MemoryLocalStore::new());
        let persisted = PersistedTracking::new(store.clone());
        (store, persisted)
    }

    fn session() -> TrackingSession {
        TrackingSession::new(
            "order-1",
            "deliverer-1",
            OrderStatus::Accepted,
            NamedLocation::new(GeoPoint::new(36.1452, -86.8028), "Rand"),
            NamedLocation::new(GeoPoint::new(36.1450, -86.8010), "Branscomb"),
            &LocationFix::new(GeoPoint::new(36.1440, -86.8000)),
            TravelMode::Driving,
        )
    }

    #[test]
    fn test_session_roundtrip() {
        let (_, persisted) = persisted();
        assert!(persisted.load_session().unwrap().is_none());

        persisted.save_session(&session()).unwrap();
        let loaded = persisted.load_session().unwrap().unwrap();
        assert_eq!(loaded.order_id, "order-1");
    }

    #[test]
    fn test_malformed_session_reads_as_absent() {
        let (store, persisted) = persisted();
        store.set(CURRENT_DELIVERY_KEY, "{not json").unwrap();
        assert!(persisted.load_session().unwrap().is_none());

        store.set(LOCATION_UPDATES_KEY, "42").unwrap();
        assert!(persisted.load_samples().unwrap().is_empty());
    }

    #[test]
    fn test_enabled_flag() {
        let (store, persisted) = persisted();
        assert!(!persisted.is_enabled().unwrap());

        persisted.set_enabled(true).unwrap();
        assert!(persisted.is_enabled().unwrap());
        assert_eq!(store.get(TRACKING_ENABLED_KEY).unwrap().as_deref(), Some("true"));

        store.set(TRACKING_ENABLED_KEY, "yes").unwrap();
        assert!(!persisted.is_enabled().unwrap());
    }

    #[test]
    fn test_clear_removes_everything() {
        let (store, persisted) = persisted();
        persisted.save_session(&session()).unwrap();
        persisted.save_samples(&[]).unwrap();
        persisted.set_enabled(true).unwrap();

        persisted.clear().unwrap();
        persisted.clear().unwrap();

        assert_eq!(store.get(CURRENT_DELIVERY_KEY).unwrap(), None);
        assert_eq!(store.get(LOCATION_UPDATES_KEY).unwrap(), None);
        assert!(!persisted.is_enabled().unwrap());
    }
}
