//! Raw location sample history.
//!
//! Keeps the most recent location samples of the active delivery in a
//! fixed-capacity FIFO. The buffer is persisted alongside the session so a
//! restarted process still has the recent trail.
//!
//! # Design
//!
//! - Stores the last 50 samples by default
//! - Oldest sample is evicted first
//! - Never rate limits; the location watcher already gates by distance/time

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::location::LocationFix;

/// Default maximum samples to retain.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 50;

/// A single raw position sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl LocationSample {
    /// Create a sample from a device fix.
    pub fn from_fix(fix: &LocationFix, order_id: &str) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            timestamp: fix.timestamp,
            order_id: order_id.to_string(),
            accuracy: fix.accuracy,
            heading: fix.heading,
            speed: fix.speed,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Fixed-capacity FIFO of location samples (oldest first).
///
/// # Usage
///
/// ```ignore
/// let mut store = LocationSampleStore::new();
///
/// // Record samples as they arrive
/// store.push(LocationSample::from_fix(&fix, "order-1"));
///
/// // Read the recent trail
/// for sample in store.recent(10) {
///     println!("{}, {}", sample.latitude, sample.longitude);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LocationSampleStore {
    samples: VecDeque<LocationSample>,
    capacity: usize,
}

impl Default for LocationSampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSampleStore {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SAMPLE_CAPACITY)
    }

    /// Create a store holding at most `capacity` samples (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild from a persisted list (oldest first), keeping the newest
    /// `capacity` entries.
    pub fn from_samples(samples: Vec<LocationSample>, capacity: usize) -> Self {
        let mut store = Self::with_capacity(capacity);
        for sample in samples {
            store.push(sample);
        }
        store
    }

    /// Append a sample, evicting the oldest beyond capacity.
    pub fn push(&mut self, sample: LocationSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// The most recent `n` samples, most recent last.
    pub fn recent(&self, n: usize) -> Vec<LocationSample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).cloned().collect()
    }

    /// All samples, oldest first.
    pub fn to_vec(&self) -> Vec<LocationSample> {
        self.samples.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&LocationSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Iterate over samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LocationSample> {
        self.samples.iter()
    }
}
