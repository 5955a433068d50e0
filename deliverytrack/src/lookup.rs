//! Coordinate lookup for restaurants and delivery addresses.
//!
//! Orders carry a restaurant id and a free-text delivery address. The
//! tracking manager resolves both to coordinates once, at session start,
//! through a [`CoordinateLookup`].

use std::collections::HashMap;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::geo::GeoPoint;
use crate::route::{Waypoint, WaypointKind};

/// Errors from a coordinate lookup backend.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The backend could not be reached.
    #[error("Coordinate lookup unavailable: {0}")]
    Unavailable(String),
}

/// Resolves restaurant ids and addresses to coordinates.
///
/// `Ok(None)` means the backend answered but does not know the key.
pub trait CoordinateLookup: Send + Sync {
    fn restaurant(&self, restaurant_id: &str) -> BoxFuture<'_, Result<Option<GeoPoint>, LookupError>>;

    fn address(&self, address: &str) -> BoxFuture<'_, Result<Option<GeoPoint>, LookupError>>;
}

/// Table-backed lookup.
///
/// Addresses match case-insensitively, first exactly and then by the longest
/// known place name contained in the address ("Room 204, Branscomb Quad").
#[derive(Debug, Clone, Default)]
pub struct StaticCoordinateLookup {
    restaurants: HashMap<String, GeoPoint>,
    places: HashMap<String, GeoPoint>,
}

impl StaticCoordinateLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed places from a landmark catalog: dorms and intersections become
    /// address places, restaurants are registered under their name too.
    pub fn from_landmarks(landmarks: &[Waypoint]) -> Self {
        let mut lookup = Self::new();
        for landmark in landmarks {
            let Some(name) = landmark.name.as_deref() else {
                continue;
            };
            if landmark.kind == WaypointKind::Restaurant {
                lookup = lookup.with_restaurant(name, landmark.point());
            }
            lookup = lookup.with_place(name, landmark.point());
        }
        lookup
    }

    pub fn with_restaurant(mut self, restaurant_id: impl Into<String>, point: GeoPoint) -> Self {
        self.restaurants.insert(restaurant_id.into(), point);
        self
    }

    pub fn with_place(mut self, name: &str, point: GeoPoint) -> Self {
        self.places.insert(normalize(name), point);
        self
    }

    fn resolve_address(&self, address: &str) -> Option<GeoPoint> {
        let needle = normalize(address);
        if needle.is_empty() {
            return None;
        }
        if let Some(point) = self.places.get(&needle) {
            return Some(*point);
        }
        self.places
            .iter()
            .filter(|(name, _)| needle.contains(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, point)| *point)
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl CoordinateLookup for StaticCoordinateLookup {
    fn restaurant(&self, restaurant_id: &str) -> BoxFuture<'_, Result<Option<GeoPoint>, LookupError>> {
        let found = self.restaurants.get(restaurant_id).copied();
        Box::pin(async move { Ok(found) })
    }

    fn address(&self, address: &str) -> BoxFuture<'_, Result<Option<GeoPoint>, LookupError>> {
        let found = self.resolve_address(address);
        Box::pin(async move { Ok(found) })
    }
}
