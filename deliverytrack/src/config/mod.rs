//! Configuration.
//!
//! [`TrackingConfig`] holds the tunables the session manager runs with.
//! [`ConfigFile`] maps them to and from `~/.deliverytrack/config.ini`.

mod file;

pub use file::{config_file_path, ConfigFile, ConfigFileError, StorageSettings};

use std::path::PathBuf;
use std::time::Duration;

use crate::geo::TravelMode;
use crate::location::WatchOptions;
use crate::route::RouteConfig;
use crate::tracking::DEFAULT_SAMPLE_CAPACITY;

/// Default interval between full session pushes.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// Session manager tunables.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Interval of the full remote push.
    pub sync_interval: Duration,
    /// Location watcher gate.
    pub watch: WatchOptions,
    /// Location samples retained per session.
    pub sample_capacity: usize,
    /// Speed used for time-remaining estimates.
    pub travel_mode: TravelMode,
    pub route: RouteConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            watch: WatchOptions::default(),
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            travel_mode: TravelMode::default(),
            route: RouteConfig::default(),
        }
    }
}

/// The configuration directory (`~/.deliverytrack`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".deliverytrack")
}
