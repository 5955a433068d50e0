//! Waypoint and route value types.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// What a waypoint represents on campus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointKind {
    Restaurant,
    Dorm,
    Intersection,
}

impl std::fmt::Display for WaypointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WaypointKind::Restaurant => "restaurant",
            WaypointKind::Dorm => "dorm",
            WaypointKind::Intersection => "intersection",
        };
        f.write_str(s)
    }
}

/// A point along a route, or a named landmark in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: WaypointKind,
}

impl Waypoint {
    /// Create an unnamed waypoint.
    pub fn new(point: GeoPoint, kind: WaypointKind) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            name: None,
            kind,
        }
    }

    /// Create a named landmark.
    pub fn landmark(name: impl Into<String>, latitude: f64, longitude: f64, kind: WaypointKind) -> Self {
        Self {
            latitude,
            longitude,
            name: Some(name.into()),
            kind,
        }
    }

    /// The waypoint's coordinate.
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// An approximated path between two coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub waypoints: Vec<Waypoint>,
    /// Path length in kilometres.
    pub distance_km: f64,
    /// Estimated duration in minutes.
    pub duration_min: f64,
}

impl Route {
    /// Names of the landmarks this route passes through, in order.
    pub fn landmark_names(&self) -> Vec<&str> {
        self.waypoints
            .iter()
            .filter_map(|w| w.name.as_deref())
            .collect()
    }
}
