//! The tracking session record.
//!
//! One [`TrackingSession`] exists per active delivery. It is the value
//! persisted locally under `current_delivery` and merge-written to
//! `delivery_tracking/{orderId}`, so its serde shape is the wire format:
//! camelCase keys, snake_case enum values, RFC 3339 timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::OrderStatus;
use super::stage::RouteStage;
use crate::geo::{distance_km, travel_time_min, GeoPoint, TravelMode};
use crate::location::LocationFix;
use crate::route::Route;

/// A resolved coordinate with the address it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl NamedLocation {
    pub fn new(point: GeoPoint, address: impl Into<String>) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            address: address.into(),
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Last known deliverer position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl CurrentLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

impl From<&LocationFix> for CurrentLocation {
    fn from(fix: &LocationFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            timestamp: fix.timestamp,
        }
    }
}

/// State of one tracked delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSession {
    pub order_id: String,
    pub deliverer_id: String,
    pub status: OrderStatus,
    pub route_stage: RouteStage,
    pub restaurant_location: NamedLocation,
    pub customer_location: NamedLocation,
    pub current_location: CurrentLocation,
    #[serde(default)]
    pub route: Option<Route>,
    /// Kilometres to the current destination.
    pub distance_remaining: f64,
    /// Minutes to the current destination.
    pub estimated_time_remaining: f64,
    pub last_updated: DateTime<Utc>,
}

impl TrackingSession {
    /// Build a fresh session from the initial fix.
    ///
    /// The stage follows the order status; derived distance and time are
    /// computed against the stage's destination.
    pub fn new(
        order_id: impl Into<String>,
        deliverer_id: impl Into<String>,
        status: OrderStatus,
        restaurant_location: NamedLocation,
        customer_location: NamedLocation,
        fix: &LocationFix,
        mode: TravelMode,
    ) -> Self {
        let mut session = Self {
            order_id: order_id.into(),
            deliverer_id: deliverer_id.into(),
            status,
            route_stage: RouteStage::for_status(status),
            restaurant_location,
            customer_location,
            current_location: CurrentLocation::from(fix),
            route: None,
            distance_remaining: 0.0,
            estimated_time_remaining: 0.0,
            last_updated: fix.timestamp,
        };
        session.recompute_derived(mode);
        session
    }

    /// The destination implied by the route stage.
    pub fn destination(&self) -> GeoPoint {
        match self.route_stage {
            RouteStage::ToRestaurant => self.restaurant_location.point(),
            RouteStage::ToCustomer | RouteStage::Completed => self.customer_location.point(),
        }
    }

    /// Record a new position and refresh the derived fields.
    pub fn apply_position(&mut self, fix: &LocationFix, mode: TravelMode) {
        self.current_location = CurrentLocation::from(fix);
        self.recompute_derived(mode);
        self.touch(fix.timestamp);
    }

    /// Recompute distance and time remaining together.
    pub fn recompute_derived(&mut self, mode: TravelMode) {
        let distance = distance_km(self.current_location.point(), self.destination());
        self.distance_remaining = distance;
        self.estimated_time_remaining = travel_time_min(distance, mode);
    }

    /// Bump `last_updated`; it never moves backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_updated {
            self.last_updated = now;
        }
    }

    /// Replace the route.
    pub fn set_route(&mut self, route: Route) {
        self.route = Some(route);
    }

    /// The reduced per-sample mirror write.
    pub fn position_update(&self) -> PositionUpdate {
        PositionUpdate::from(self)
    }
}

/// The fields written to the remote mirror after every sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    #[serde(skip)]
    pub order_id: String,
    pub current_location: CurrentLocation,
    pub distance_remaining: f64,
    pub estimated_time_remaining: f64,
    pub last_updated: DateTime<Utc>,
}

impl From<&TrackingSession> for PositionUpdate {
    fn from(session: &TrackingSession) -> Self {
        Self {
            order_id: session.order_id.clone(),
            current_location: session.current_location,
            distance_remaining: session.distance_remaining,
            estimated_time_remaining: session.estimated_time_remaining,
            last_updated: session.last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn session(status: OrderStatus) -> TrackingSession {
        TrackingSession::new(
            "order-1",
            "deliverer-1",
            status,
            NamedLocation::new(GeoPoint::new(36.1452, -86.8028), "Rand Dining Center"),
            NamedLocation::new(GeoPoint::new(36.1450, -86.8010), "Branscomb Quad"),
            &LocationFix::at(GeoPoint::new(36.1452, -86.8028), t0()),
            TravelMode::Driving,
        )
    }

    #[test]
    fn test_accepted_order_heads_to_restaurant() {
        let s = session(OrderStatus::Accepted);
        assert_eq!(s.route_stage, RouteStage::ToRestaurant);
        assert!(s.distance_remaining < 1e-9);
        assert!(s.estimated_time_remaining < 1e-9);
    }

    #[test]
    fn test_picked_up_order_heads_to_customer() {
        let s = session(OrderStatus::PickedUp);
        assert_eq!(s.route_stage, RouteStage::ToCustomer);
        assert!((s.distance_remaining - 0.162).abs() < 0.01);
        assert!(
            (s.estimated_time_remaining - travel_time_min(s.distance_remaining, TravelMode::Driving)).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_derived_fields_follow_position() {
        let mut s = session(OrderStatus::Accepted);
        let fix = LocationFix::at(GeoPoint::new(36.1450, -86.8010), t0() + Duration::seconds(30));
        s.apply_position(&fix, TravelMode::Walking);

        let expected = distance_km(fix.point(), s.restaurant_location.point());
        assert_eq!(s.distance_remaining, expected);
        assert_eq!(s.estimated_time_remaining, travel_time_min(expected, TravelMode::Walking));
        assert_eq!(s.last_updated, fix.timestamp);
    }

    #[test]
    fn test_last_updated_never_moves_backwards() {
        let mut s = session(OrderStatus::Accepted);
        s.touch(t0() + Duration::seconds(60));
        s.touch(t0());
        assert_eq!(s.last_updated, t0() + Duration::seconds(60));

        let stale = LocationFix::at(GeoPoint::new(36.1451, -86.8020), t0() - Duration::seconds(5));
        s.apply_position(&stale, TravelMode::Driving);
        assert_eq!(s.last_updated, t0() + Duration::seconds(60));
        assert_eq!(s.current_location.timestamp, stale.timestamp);
    }

    #[test]
    fn test_wire_format_keys() {
        let json = serde_json::to_value(session(OrderStatus::PickedUp)).unwrap();
        assert_eq!(json["orderId"], "order-1");
        assert_eq!(json["routeStage"], "to_customer");
        assert_eq!(json["status"], "picked_up");
        assert_eq!(json["restaurantLocation"]["address"], "Rand Dining Center");
        assert!(json["currentLocation"]["timestamp"].is_string());
        assert!(json.get("estimatedTimeRemaining").is_some());

        let back: TrackingSession = serde_json::from_value(json).unwrap();
        assert_eq!(back.route_stage, RouteStage::ToCustomer);
        assert_eq!(back.last_updated, t0());
        assert!(back.route.is_none());
    }

    #[test]
    fn test_position_update_shape() {
        let json = serde_json::to_value(session(OrderStatus::Accepted).position_update()).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys.len(),
            4,
            "unexpected keys in position update: {:?}",
            keys
        );
        assert!(json.get("orderId").is_none());
        assert!(json.get("currentLocation").is_some());
        assert!(json.get("lastUpdated").is_some());
    }
}
