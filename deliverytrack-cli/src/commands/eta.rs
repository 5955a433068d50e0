//! `eta` command: travel time and formatted arrival estimate.

use chrono::Utc;
use clap::Args;
use console::style;
use deliverytrack::config::ConfigFile;
use deliverytrack::geo::{distance_km, eta, format_eta_from, travel_time_min, GeoPoint};

use super::common::{parse_point, resolve_mode, TravelModeArg};
use crate::error::CliError;

/// Arguments for `deliverytrack eta`.
#[derive(Debug, Args)]
pub struct EtaArgs {
    /// Distance to cover in kilometres
    #[arg(long, conflicts_with_all = ["from", "to"], required_unless_present_all = ["from", "to"])]
    pub distance_km: Option<f64>,

    /// Start coordinate as lat,lon (with --to, instead of --distance-km)
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true, requires = "to")]
    pub from: Option<GeoPoint>,

    /// End coordinate as lat,lon
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true, requires = "from")]
    pub to: Option<GeoPoint>,

    /// Travel mode
    #[arg(long, value_enum)]
    pub mode: Option<TravelModeArg>,
}

/// Run the eta command.
pub fn run(args: EtaArgs, config: &ConfigFile) -> Result<(), CliError> {
    let distance = match (args.distance_km, args.from, args.to) {
        (Some(d), _, _) => d,
        (None, Some(from), Some(to)) => distance_km(from, to),
        _ => {
            return Err(CliError::Input(
                "Provide --distance-km or both --from and --to".to_string(),
            ))
        }
    };
    if !distance.is_finite() || distance < 0.0 {
        return Err(CliError::Input(format!(
            "Distance must be a non-negative number, got {}",
            distance
        )));
    }

    let mode = resolve_mode(args.mode, config);
    let now = Utc::now();
    let arrival = eta(now, distance, mode);

    println!("{} {:.3} km", style("Distance:").bold(), distance);
    println!(
        "{} {:.1} min {}",
        style("Travel time:").bold(),
        travel_time_min(distance, mode),
        style(format!("({}, {} km/h)", mode, mode.speed_kmh())).dim()
    );
    println!(
        "{} {} (at {})",
        style("ETA:").bold(),
        style(format_eta_from(arrival, now)).green(),
        arrival.with_timezone(&chrono::Local).format("%H:%M")
    );
    Ok(())
}
