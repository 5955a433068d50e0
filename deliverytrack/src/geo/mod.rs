//! Geodesic math for delivery tracking.
//!
//! Pure functions over WGS84 latitude/longitude pairs: great-circle distance,
//! initial bearing, travel time per [`TravelMode`], and ETA formatting.
//!
//! None of these functions validate their input. Non-finite coordinates
//! propagate as `NaN`; callers validate coordinates before they reach here.

mod eta;

pub use eta::{eta, format_eta, format_eta_from};

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Walking speed in km/h.
pub const WALKING_SPEED_KMH: f64 = 4.5;

/// Biking speed in km/h.
pub const BIKING_SPEED_KMH: f64 = 15.0;

/// Driving speed in km/h (campus roads, also the default).
pub const DRIVING_SPEED_KMH: f64 = 20.0;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another point in kilometres.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_km(*self, *other)
    }

    /// Initial bearing to another point in degrees.
    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        bearing_deg(*self, *other)
    }

    /// Whether both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// How the deliverer is moving, used to pick an average speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Walking,
    Biking,
    #[default]
    Driving,
}

impl TravelMode {
    /// Average speed for this mode in km/h.
    pub fn speed_kmh(&self) -> f64 {
        match self {
            TravelMode::Walking => WALKING_SPEED_KMH,
            TravelMode::Biking => BIKING_SPEED_KMH,
            TravelMode::Driving => DRIVING_SPEED_KMH,
        }
    }

    /// Parse from a config/CLI string. Unknown strings yield `None`.
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "walking" | "walk" => Some(TravelMode::Walking),
            "biking" | "bike" | "cycling" => Some(TravelMode::Biking),
            "driving" | "drive" => Some(TravelMode::Driving),
            _ => None,
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TravelMode::Walking => "walking",
            TravelMode::Biking => "biking",
            TravelMode::Driving => "driving",
        };
        f.write_str(s)
    }
}

/// Calculate the great-circle distance between two points.
///
/// Uses the haversine formula with a spherical Earth of radius
/// [`EARTH_RADIUS_KM`].
///
/// # Example
///
/// ```
/// use deliverytrack::geo::{distance_km, GeoPoint};
///
/// let d = distance_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
/// assert!((d - 111.19).abs() < 0.1);
/// ```
pub fn distance_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Calculate the initial compass bearing from one point to another.
///
/// Returns degrees in `[0, 360)`, where 0 = North, 90 = East.
pub fn bearing_deg(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let y = delta_lon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);

    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Travel time in minutes for a distance at the average speed of `mode`.
pub fn travel_time_min(distance_km: f64, mode: TravelMode) -> f64 {
    distance_km / mode.speed_kmh() * 60.0
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
    fn test_distance_identical_points_is_zero() {
        assert_eq!(distance_km(RESTAURANT, RESTAURANT), 0.0);
    }

    #[test]
    fn test_one_degree_latitude() {
        let d = distance_km(GeoPoint::new(36.0, -86.8), GeoPoint::new(37.0, -86.8));
        assert!((d - 111.0).abs() < 1.11, "Expected ~111 km, got {}", d);
    }

    #[test]
    fn test_campus_distance() {
        // ~160 m between the two campus points
        let d = distance_km(RESTAURANT, CUSTOMER);
        assert!(d > 0.14 && d < 0.18, "Expected ~0.16 km, got {}", d);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!((bearing_deg(origin, GeoPoint::new(1.0, 0.0)) - 0.0).abs() < 0.1);
        assert!((bearing_deg(origin, GeoPoint::new(0.0, 1.0)) - 90.0).abs() < 0.1);
        assert!((bearing_deg(origin, GeoPoint::new(-1.0, 0.0)) - 180.0).abs() < 0.1);
        assert!((bearing_deg(origin, GeoPoint::new(0.0, -1.0)) - 270.0).abs() < 0.1);
    }

    #[test]
    fn test_bearing_identical_points() {
        let b = bearing_deg(RESTAURANT, RESTAURANT);
        assert!((0.0..360.0).contains(&b));
    }

    #[test]
    fn test_travel_time_by_mode() {
        assert!((travel_time_min(20.0, TravelMode::Driving) - 60.0).abs() < 1e-9);
        assert!((travel_time_min(15.0, TravelMode::Biking) - 60.0).abs() < 1e-9);
        assert!((travel_time_min(4.5, TravelMode::Walking) - 60.0).abs() < 1e-9);
        assert!(travel_time_min(1.0, TravelMode::Walking) > travel_time_min(1.0, TravelMode::Driving));
    }

    #[test]
    fn test_nan_propagates() {
        let d = distance_km(GeoPoint::new(f64::NAN, 0.0), GeoPoint::new(1.0, 0.0));
        assert!(d.is_nan());
    }

    #[test]
    fn test_travel_mode_from_config_str() {
        assert_eq!(TravelMode::from_config_str("Walking"), Some(TravelMode::Walking));
        assert_eq!(TravelMode::from_config_str(" bike "), Some(TravelMode::Biking));
        assert_eq!(TravelMode::from_config_str("driving"), Some(TravelMode::Driving));
        assert_eq!(TravelMode::from_config_str("hover"), None);
        assert_eq!(TravelMode::default(), TravelMode::Driving);
    }

    #[test]
    fn test_travel_mode_serde_names() {
        let json = serde_json::to_string(&TravelMode::Biking).unwrap();
        assert_eq!(json, "\"biking\"");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn point() -> impl Strategy<Value = GeoPoint> {
            (-89.0..89.0_f64, -180.0..180.0_f64).prop_map(|(lat, lon)| GeoPoint::new(lat, lon))
        }

        proptest! {
            #[test]
            fn test_distance_to_self_is_zero(p in point()) {
                prop_assert!(distance_km(p, p).abs() < 1e-9);
            }

            #[test]
            fn test_distance_is_symmetric(a in point(), b in point()) {
                let ab = distance_km(a, b);
                let ba = distance_km(b, a);
                prop_assert!((ab - ba).abs() < 1e-6, "{} != {}", ab, ba);
            }

            #[test]
            fn test_bearing_in_range(a in point(), b in point()) {
                let bearing = bearing_deg(a, b);
                prop_assert!((0.0..360.0).contains(&bearing), "bearing {} out of range", bearing);
            }

            #[test]
            fn test_travel_time_increasing(d in 0.0..500.0_f64, extra in 0.001..100.0_f64) {
                for mode in [TravelMode::Walking, TravelMode::Biking, TravelMode::Driving] {
                    prop_assert!(travel_time_min(d + extra, mode) > travel_time_min(d, mode));
                }
            }

            #[test]
            fn test_walking_slower_than_driving(d in 0.001..500.0_f64) {
                prop_assert!(travel_time_min(d, TravelMode::Walking) > travel_time_min(d, TravelMode::Driving));
            }
        }
    }
}
