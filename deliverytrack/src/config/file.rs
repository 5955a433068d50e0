//! Configuration file handling for ~/.deliverytrack/config.ini.
//!
//! A missing file yields defaults. Every key is optional; values present in
//! the file overlay the defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use super::{config_directory, TrackingConfig};
use crate::geo::TravelMode;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[storage]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// Directory of the file-backed local store.
    pub directory: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            directory: config_directory().join("state"),
        }
    }
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub tracking: TrackingConfig,
    pub storage: StorageSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.deliverytrack/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigFileError::ReadError(ini::Error::Parse(e)))?;
        parse_ini(&ini)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        std::fs::write(path, self.to_config_string())
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Commented INI representation.
    pub fn to_config_string(&self) -> String {
        let t = &self.tracking;
        let r = &t.route;
        let landmarks_file = r
            .landmarks_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        format!(
            r#"[tracking]
; Seconds between full pushes of the session to the remote mirror
sync_interval_secs = {}
; Minimum movement in metres before a new location sample is taken
watch_distance_m = {}
; Maximum seconds between location samples
watch_interval_secs = {}
; Location samples kept for the active delivery
sample_capacity = {}
; Speed used for time estimates: walking, biking or driving
travel_mode = {}

[route]
; Routes shorter than this (km) are drawn as a straight line
short_route_km = {}
; Maximum distance (km) from an endpoint to its nearest landmark
landmark_radius_km = {}
; Landmarks must lie within this angle (degrees) of the direct bearing
cone_half_angle_deg = {}
; Maximum detour through a landmark relative to the direct distance
detour_factor = {}
; Interpolated points on a direct route
direct_points = {}
; Optional JSON landmark catalog replacing the built-in campus landmarks
landmarks_file = {}

[storage]
; Directory holding the local tracking state
directory = {}
"#,
            t.sync_interval.as_secs(),
            t.watch.distance_m,
            t.watch.interval.as_secs(),
            t.sample_capacity,
            t.travel_mode,
            r.short_route_km,
            r.landmark_radius_km,
            r.cone_half_angle_deg,
            r.detour_factor,
            r.direct_points,
            landmarks_file,
            self.storage.directory.display(),
        )
    }
}

/// Get the path to the config file (~/.deliverytrack/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [tracking] section
    if let Some(section) = ini.section(Some("tracking")) {
        if let Some(secs) = parse_positive::<u64>(section, "tracking", "sync_interval_secs")? {
            config.tracking.sync_interval = Duration::from_secs(secs);
        }
        if let Some(v) = parse_non_negative(section, "tracking", "watch_distance_m")? {
            config.tracking.watch.distance_m = v;
        }
        if let Some(secs) = parse_positive::<u64>(section, "tracking", "watch_interval_secs")? {
            config.tracking.watch.interval = Duration::from_secs(secs);
        }
        if let Some(v) = parse_positive::<usize>(section, "tracking", "sample_capacity")? {
            config.tracking.sample_capacity = v;
        }
        if let Some(v) = section.get("travel_mode") {
            config.tracking.travel_mode =
                TravelMode::from_config_str(v).ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "tracking".to_string(),
                    key: "travel_mode".to_string(),
                    value: v.to_string(),
                    reason: "must be one of: walking, biking, driving".to_string(),
                })?;
        }
    }

    // [route] section
    if let Some(section) = ini.section(Some("route")) {
        let route = &mut config.tracking.route;
        if let Some(v) = parse_non_negative(section, "route", "short_route_km")? {
            route.short_route_km = v;
        }
        if let Some(v) = parse_non_negative(section, "route", "landmark_radius_km")? {
            route.landmark_radius_km = v;
        }
        if let Some(v) = parse_non_negative(section, "route", "cone_half_angle_deg")? {
            if v > 180.0 {
                return Err(invalid("route", "cone_half_angle_deg", &v.to_string(), "must be at most 180"));
            }
            route.cone_half_angle_deg = v;
        }
        if let Some(v) = parse_non_negative(section, "route", "detour_factor")? {
            if v < 1.0 {
                return Err(invalid("route", "detour_factor", &v.to_string(), "must be at least 1.0"));
            }
            route.detour_factor = v;
        }
        if let Some(v) = parse_positive::<usize>(section, "route", "direct_points")? {
            route.direct_points = v;
        }
        if let Some(v) = section.get("landmarks_file") {
            let v = v.trim();
            if !v.is_empty() {
                route.landmarks_file = Some(expand_tilde(v));
            }
        }
    }

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.storage.directory = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_positive<T>(section: &Properties, name: &str, key: &str) -> Result<Option<T>, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = section.get(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(Some(v)),
        _ => Err(invalid(name, key, raw, "must be a positive integer")),
    }
}

fn parse_non_negative(section: &Properties, name: &str, key: &str) -> Result<Option<f64>, ConfigFileError> {
    let Some(raw) = section.get(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
        _ => Err(invalid(name, key, raw, "must be a non-negative number")),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
