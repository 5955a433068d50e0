//! Route approximation without a routing API.
//!
//! Produces an ordered waypoint path between two coordinates, either by
//! straight-line interpolation or by threading the path through campus
//! landmarks that lie roughly ahead of the deliverer.
//!
//! # Landmark heuristic
//!
//! ```text
//! direct < short_route_km ──► straight line, 3 interpolated points
//!        │
//!        ▼
//! nearest landmark to start / end (kept if within landmark_radius_km)
//!        │
//!        ▼
//! cone filter: |bearing(start,end) - bearing(start,L)| < cone_half_angle_deg
//!              and d(start,L) + d(L,end) < direct * detour_factor
//!        │
//!        ▼
//! sort by distance from start, then start … nearest_to_end, end
//! ```
//!
//! This is a greedy filter, not a shortest path. A landmark close to the
//! start can sit slightly behind the direct line, so routes may backtrack.
//! Any failure while building the landmark path falls back to a straight
//! line with 5 interpolated points.

mod landmarks;
mod waypoint;

pub use landmarks::{builtin_landmarks, LandmarkCatalog};
pub use waypoint::{Route, Waypoint, WaypointKind};

use std::path::PathBuf;

use thiserror::Error;

use crate::geo::{bearing_deg, distance_km, travel_time_min, GeoPoint, TravelMode};

/// Routes shorter than this (km) skip the landmark heuristic.
pub const DEFAULT_SHORT_ROUTE_KM: f64 = 0.3;

/// Maximum distance (km) between an endpoint and its nearest landmark.
pub const DEFAULT_LANDMARK_RADIUS_KM: f64 = 1.0;

/// Half-angle (degrees) of the forward cone landmarks must fall within.
pub const DEFAULT_CONE_HALF_ANGLE_DEG: f64 = 45.0;

/// Allowed path length through a landmark relative to the direct distance.
pub const DEFAULT_DETOUR_FACTOR: f64 = 1.3;

/// Interpolated points used by [`RouteApproximator::direct_route`].
pub const DEFAULT_DIRECT_POINTS: usize = 5;

/// Interpolated points for routes below the short-route threshold.
const SHORT_ROUTE_POINTS: usize = 3;

/// Interpolated points for the fallback straight line.
const FALLBACK_POINTS: usize = 5;

/// Errors raised while building a landmark route.
///
/// These never reach callers of [`RouteApproximator::campus_route`]; they
/// select the straight-line fallback.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The landmark catalog file could not be read.
    #[error("Failed to read landmark catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The landmark catalog file is not a JSON array of waypoints.
    #[error("Failed to parse landmark catalog {path}: {source}")]
    CatalogParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Route geometry produced a non-finite value.
    #[error("Route geometry is not finite")]
    NonFinite,
}

/// Tunables for the landmark heuristic.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub short_route_km: f64,
    pub landmark_radius_km: f64,
    pub cone_half_angle_deg: f64,
    pub detour_factor: f64,
    pub direct_points: usize,
    /// Optional JSON catalog replacing the built-in landmarks.
    pub landmarks_file: Option<PathBuf>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            short_route_km: DEFAULT_SHORT_ROUTE_KM,
            landmark_radius_km: DEFAULT_LANDMARK_RADIUS_KM,
            cone_half_angle_deg: DEFAULT_CONE_HALF_ANGLE_DEG,
            detour_factor: DEFAULT_DETOUR_FACTOR,
            direct_points: DEFAULT_DIRECT_POINTS,
            landmarks_file: None,
        }
    }
}

/// `n` evenly spaced points strictly between `start` and `end`.
///
/// Interpolation is linear in latitude/longitude; every point is tagged
/// [`WaypointKind::Intersection`].
pub fn interpolate(start: GeoPoint, end: GeoPoint, n: usize) -> Vec<Waypoint> {
    let steps = (n + 1) as f64;
    (1..=n)
        .map(|i| {
            let t = i as f64 / steps;
            let point = GeoPoint::new(
                start.latitude + (end.latitude - start.latitude) * t,
                start.longitude + (end.longitude - start.longitude) * t,
            );
            Waypoint::new(point, WaypointKind::Intersection)
        })
        .collect()
}

/// Absolute difference between two bearings, folded into `[0, 180]`.
pub fn bearing_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Builds approximated routes over a landmark catalog.
#[derive(Debug, Default)]
pub struct RouteApproximator {
    config: RouteConfig,
    catalog: LandmarkCatalog,
}

impl RouteApproximator {
    /// Create an approximator; the catalog comes from `config.landmarks_file`
    /// when set, otherwise the built-in campus set.
    pub fn new(config: RouteConfig) -> Self {
        let catalog = match &config.landmarks_file {
            Some(path) => LandmarkCatalog::from_file(path),
            None => LandmarkCatalog::builtin(),
        };
        Self { config, catalog }
    }

    /// Create an approximator over an explicit catalog.
    pub fn with_catalog(config: RouteConfig, catalog: LandmarkCatalog) -> Self {
        Self { config, catalog }
    }

    /// The heuristic configuration.
    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// The landmark catalog.
    pub fn catalog(&self) -> &LandmarkCatalog {
        &self.catalog
    }

    /// Straight-line route with `direct_points` interpolated waypoints.
    ///
    /// The waypoints do not include the endpoints; those are `from`/`to`.
    pub fn direct_route(&self, start: GeoPoint, end: GeoPoint) -> Route {
        let direct = distance_km(start, end);
        Route {
            from: start,
            to: end,
            waypoints: interpolate(start, end, self.config.direct_points),
            distance_km: direct,
            duration_min: travel_time_min(direct, TravelMode::Driving),
        }
    }

    /// Campus route through qualifying landmarks.
    ///
    /// The returned waypoints always start with `start` and end with `end`.
    pub fn campus_route(&self, start: GeoPoint, end: GeoPoint) -> Route {
        let direct = distance_km(start, end);

        if direct < self.config.short_route_km {
            return straight_route(start, end, SHORT_ROUTE_POINTS, direct);
        }

        match self.landmark_route(start, end, direct) {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    from = %start,
                    to = %end,
                    "Landmark routing failed, using straight line"
                );
                straight_route(start, end, FALLBACK_POINTS, direct)
            }
        }
    }

    fn landmark_route(&self, start: GeoPoint, end: GeoPoint, direct: f64) -> Result<Route, RouteError> {
        if !start.is_finite() || !end.is_finite() || !direct.is_finite() {
            return Err(RouteError::NonFinite);
        }

        let landmarks = self.catalog.load()?;
        let radius = self.config.landmark_radius_km;

        let nearest_to_start = nearest_landmark(&landmarks, start).filter(|&(_, d)| d < radius);
        let nearest_to_end = nearest_landmark(&landmarks, end).filter(|&(_, d)| d < radius);
        let nearest_to_start = nearest_to_start.map(|(i, _)| i);
        let nearest_to_end = nearest_to_end.map(|(i, _)| i);

        let route_bearing = bearing_deg(start, end);
        let detour_budget = direct * self.config.detour_factor;

        let mut chosen: Vec<usize> = nearest_to_start.into_iter().collect();
        for (i, landmark) in landmarks.iter().enumerate() {
            if Some(i) == nearest_to_start || Some(i) == nearest_to_end {
                continue;
            }
            let point = landmark.point();
            let diff = bearing_difference(route_bearing, bearing_deg(start, point));
            if diff >= self.config.cone_half_angle_deg {
                continue;
            }
            let via = distance_km(start, point) + distance_km(point, end);
            if via < detour_budget {
                chosen.push(i);
            }
        }

        chosen.sort_by(|&a, &b| {
            let da = distance_km(start, landmarks[a].point());
            let db = distance_km(start, landmarks[b].point());
            da.total_cmp(&db)
        });

        let mut waypoints = Vec::with_capacity(chosen.len() + 3);
        waypoints.push(Waypoint::new(start, WaypointKind::Intersection));
        waypoints.extend(chosen.iter().map(|&i| landmarks[i].clone()));
        if let Some(i) = nearest_to_end {
            if !chosen.contains(&i) {
                waypoints.push(landmarks[i].clone());
            }
        }
        waypoints.push(Waypoint::new(end, WaypointKind::Intersection));

        let total = path_length_km(&waypoints);
        if !total.is_finite() {
            return Err(RouteError::NonFinite);
        }

        tracing::debug!(
            direct_km = direct,
            total_km = total,
            landmarks = waypoints.len() - 2,
            "Campus route computed"
        );

        Ok(Route {
            from: start,
            to: end,
            waypoints,
            distance_km: total,
            duration_min: travel_time_min(total, TravelMode::Driving),
        })
    }
}

/// Sum of consecutive segment distances along a waypoint list.
pub fn path_length_km(waypoints: &[Waypoint]) -> f64 {
    waypoints
        .windows(2)
        .map(|pair| distance_km(pair[0].point(), pair[1].point()))
        .sum()
}

fn straight_route(start: GeoPoint, end: GeoPoint, points: usize, direct: f64) -> Route {
    let mut waypoints = Vec::with_capacity(points + 2);
    waypoints.push(Waypoint::new(start, WaypointKind::Intersection));
    waypoints.extend(interpolate(start, end, points));
    waypoints.push(Waypoint::new(end, WaypointKind::Intersection));

    Route {
        from: start,
        to: end,
        waypoints,
        distance_km: direct,
        duration_min: travel_time_min(direct, TravelMode::Driving),
    }
}

fn nearest_landmark(landmarks: &[Waypoint], target: GeoPoint) -> Option<(usize, f64)> {
    landmarks
        .iter()
        .enumerate()
        .map(|(i, l)| (i, distance_km(target, l.point())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESTAURANT: GeoPoint = GeoPoint {
        latitude: 36.1452,
        longitude: -86.8028,
    };
    const CUSTOMER: GeoPoint = GeoPoint {
        latitude: 36.1450,
        longitude: -86.8010,
    };

    #[test]
    fn test_interpolate_count_and_spacing() {
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(4.0, 8.0);
        let points = interpolate(start, end, 3);

        assert_eq!(points.len(), 3);
        assert!((points[0].latitude - 1.0).abs() < 1e-12);
        assert!((points[1].latitude - 2.0).abs() < 1e-12);
        assert!((points[2].latitude - 3.0).abs() < 1e-12);
        assert!((points[1].longitude - 4.0).abs() < 1e-12);
        assert!(points.iter().all(|p| p.kind == WaypointKind::Intersection));
    }

    #[test]
    fn test_interpolate_strictly_between() {
        let points = interpolate(RESTAURANT, CUSTOMER, 7);
        assert_eq!(points.len(), 7);
        for p in &points {
            assert!(p.point() != RESTAURANT);
            assert!(p.point() != CUSTOMER);
            assert!(p.longitude > RESTAURANT.longitude && p.longitude < CUSTOMER.longitude);
        }
    }

    #[test]
    fn test_interpolate_zero_points() {
        assert!(interpolate(RESTAURANT, CUSTOMER, 0).is_empty());
    }

    #[test]
    fn test_bearing_difference_folds() {
        assert_eq!(bearing_difference(10.0, 350.0), 20.0);
        assert_eq!(bearing_difference(350.0, 10.0), 20.0);
        assert_eq!(bearing_difference(90.0, 270.0), 180.0);
        assert_eq!(bearing_difference(45.0, 45.0), 0.0);
    }

    #[test]
    fn test_direct_route_uses_fixed_count() {
        let approximator = RouteApproximator::default();
        let route = approximator.direct_route(RESTAURANT, CUSTOMER);
        assert_eq!(route.waypoints.len(), DEFAULT_DIRECT_POINTS);
        assert_eq!(route.from, RESTAURANT);
        assert_eq!(route.to, CUSTOMER);
    }

    #[test]
    fn test_short_route_is_straight() {
        let approximator = RouteApproximator::default();
        let route = approximator.campus_route(RESTAURANT, CUSTOMER);
        let direct = distance_km(RESTAURANT, CUSTOMER);

        assert_eq!(route.waypoints.len(), 2 + SHORT_ROUTE_POINTS);
        assert_eq!(route.waypoints.first().unwrap().point(), RESTAURANT);
        assert_eq!(route.waypoints.last().unwrap().point(), CUSTOMER);
        assert!((route.distance_km - direct).abs() < 1e-9);
        // Collinear points, so the polyline length matches too
        assert!((path_length_km(&route.waypoints) - direct).abs() < 1e-4);
        assert!(route.landmark_names().is_empty());
    }

    #[test]
    fn test_failed_catalog_falls_back_to_straight_line() {
        let config = RouteConfig {
            landmarks_file: Some(PathBuf::from("/nonexistent/landmarks.json")),
            ..Default::default()
        };
        let approximator = RouteApproximator::new(config);
        let start = GeoPoint::new(36.1400, -86.8100);
        let end = GeoPoint::new(36.1500, -86.7950);
        let route = approximator.campus_route(start, end);

        assert_eq!(route.waypoints.len(), 2 + FALLBACK_POINTS);
        assert!((route.distance_km - distance_km(start, end)).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_input_falls_back() {
        let approximator = RouteApproximator::default();
        let route = approximator.campus_route(GeoPoint::new(f64::NAN, 0.0), CUSTOMER);
        assert_eq!(route.waypoints.len(), 2 + FALLBACK_POINTS);
        assert!(route.distance_km.is_nan());
    }

    #[test]
    fn test_duration_matches_driving_speed() {
        let approximator = RouteApproximator::default();
        let start = GeoPoint::new(36.1400, -86.8100);
        let end = GeoPoint::new(36.1500, -86.7950);
        let route = approximator.campus_route(start, end);
        let expected = travel_time_min(route.distance_km, TravelMode::Driving);
        assert!((route.duration_min - expected).abs() < 1e-9);
    }
}
