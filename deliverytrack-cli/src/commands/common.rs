//! Common types and utilities shared across CLI commands.

use std::path::Path;

use clap::ValueEnum;
use deliverytrack::config::ConfigFile;
use deliverytrack::geo::{GeoPoint, TravelMode};

use crate::error::CliError;

/// Travel mode selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum TravelModeArg {
    /// On foot (4.5 km/h)
    Walking,
    /// Bicycle (15 km/h)
    Biking,
    /// Car or scooter (20 km/h)
    Driving,
}

impl From<TravelModeArg> for TravelMode {
    fn from(arg: TravelModeArg) -> Self {
        match arg {
            TravelModeArg::Walking => TravelMode::Walking,
            TravelModeArg::Biking => TravelMode::Biking,
            TravelModeArg::Driving => TravelMode::Driving,
        }
    }
}

/// Resolve the travel mode: CLI takes precedence, then config.
pub fn resolve_mode(cli_mode: Option<TravelModeArg>, config: &ConfigFile) -> TravelMode {
    cli_mode
        .map(TravelMode::from)
        .unwrap_or(config.tracking.travel_mode)
}

/// Parse a `lat,lon` pair.
pub fn parse_point(s: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'lat,lon', got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {} out of range [-90, 90]", lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude {} out of range [-180, 180]", lon));
    }
    Ok(GeoPoint::new(lat, lon))
}

/// Load the config file from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(
            parse_point("36.1452,-86.8028").unwrap(),
            GeoPoint::new(36.1452, -86.8028)
        );
        assert_eq!(
            parse_point(" 36.1452 , -86.8028 ").unwrap(),
            GeoPoint::new(36.1452, -86.8028)
        );
    }

    #[test]
    fn test_parse_point_rejects_bad_input() {
        assert!(parse_point("36.1452").is_err());
        assert!(parse_point("north,-86.8").is_err());
        assert!(parse_point("91,0").is_err());
        assert!(parse_point("0,181").is_err());
    }

    #[test]
    fn test_resolve_mode_prefers_cli() {
        let config = ConfigFile::default();
        assert_eq!(resolve_mode(None, &config), TravelMode::Driving);
        assert_eq!(
            resolve_mode(Some(TravelModeArg::Walking), &config),
            TravelMode::Walking
        );
    }

    #[test]
    fn test_load_config_from_missing_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = load_config(Some(&temp.path().join("config.ini"))).unwrap();
        assert_eq!(config.tracking.sample_capacity, 50);
    }
}
