//! Campus landmark catalog.
//!
//! Landmarks are named coordinates the route heuristic may thread a path
//! through. The catalog is either the built-in campus set or a JSON file of
//! [`Waypoint`]s; either way it is loaded once and then served from memory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::waypoint::{Waypoint, WaypointKind};
use super::RouteError;

/// Built-in campus landmarks.
pub fn builtin_landmarks() -> &'static [Waypoint] {
    static LANDMARKS: OnceLock<Vec<Waypoint>> = OnceLock::new();
    LANDMARKS.get_or_init(|| {
        use WaypointKind::*;
        vec![
            Waypoint::landmark("Rand Dining Center", 36.1459, -86.8030, Restaurant),
            Waypoint::landmark("Commons Dining Hall", 36.1420, -86.7970, Restaurant),
            Waypoint::landmark("Kissam Kitchen", 36.1490, -86.8020, Restaurant),
            Waypoint::landmark("Branscomb Quad", 36.1437, -86.8068, Dorm),
            Waypoint::landmark("Highland Quad", 36.1405, -86.8075, Dorm),
            Waypoint::landmark("Hank Ingram House", 36.1425, -86.7962, Dorm),
            Waypoint::landmark("Carmichael Towers", 36.1465, -86.8085, Dorm),
            Waypoint::landmark("West End & 21st Ave", 36.1505, -86.8000, Intersection),
            Waypoint::landmark("Vanderbilt Pl & 24th Ave", 36.1480, -86.8060, Intersection),
            Waypoint::landmark("Peabody Esplanade", 36.1412, -86.7990, Intersection),
        ]
    })
}

#[derive(Debug, Clone)]
enum LandmarkSource {
    Builtin,
    File(PathBuf),
    Static(Arc<[Waypoint]>),
}

/// Lazily loaded, cached landmark set.
#[derive(Debug)]
pub struct LandmarkCatalog {
    source: LandmarkSource,
    cached: Mutex<Option<Arc<[Waypoint]>>>,
}

impl Default for LandmarkCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LandmarkCatalog {
    /// Catalog backed by [`builtin_landmarks`].
    pub fn builtin() -> Self {
        Self {
            source: LandmarkSource::Builtin,
            cached: Mutex::new(None),
        }
    }

    /// Catalog read from a JSON array of waypoints on first use.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: LandmarkSource::File(path.into()),
            cached: Mutex::new(None),
        }
    }

    /// Catalog over an explicit set of waypoints.
    pub fn from_waypoints(waypoints: Vec<Waypoint>) -> Self {
        Self {
            source: LandmarkSource::Static(waypoints.into()),
            cached: Mutex::new(None),
        }
    }

    /// Load the landmark set, reading the backing source only once.
    ///
    /// A failed file read is not cached; the next call retries.
    pub fn load(&self) -> Result<Arc<[Waypoint]>, RouteError> {
        let mut cached = self.cached.lock();
        if let Some(landmarks) = cached.as_ref() {
            return Ok(Arc::clone(landmarks));
        }

        let landmarks: Arc<[Waypoint]> = match &self.source {
            LandmarkSource::Builtin => builtin_landmarks().into(),
            LandmarkSource::Static(waypoints) => Arc::clone(waypoints),
            LandmarkSource::File(path) => read_catalog_file(path)?.into(),
        };

        tracing::debug!(count = landmarks.len(), "Landmark catalog loaded");
        *cached = Some(Arc::clone(&landmarks));
        Ok(landmarks)
    }
}

fn read_catalog_file(path: &Path) -> Result<Vec<Waypoint>, RouteError> {
    let content = std::fs::read_to_string(path).map_err(|source| RouteError::CatalogRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| RouteError::CatalogParse {
        path: path.to_path_buf(),
        source,
    })
}
