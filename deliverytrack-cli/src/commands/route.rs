//! `route` command: print an approximated path between two coordinates.

use chrono::Utc;
use clap::Args;
use console::style;
use deliverytrack::geo::{eta, format_eta_from, travel_time_min, GeoPoint};
use deliverytrack::route::{Route, RouteApproximator};

use super::common::{parse_point, resolve_mode, TravelModeArg};
use crate::error::CliError;

/// Arguments for `deliverytrack route`.
#[derive(Debug, Args)]
pub struct RouteArgs {
    /// Start coordinate as lat,lon
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub from: GeoPoint,

    /// End coordinate as lat,lon
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub to: GeoPoint,

    /// Interpolate a straight line instead of threading landmarks
    #[arg(long)]
    pub direct: bool,

    /// Travel mode for the time estimate
    #[arg(long, value_enum)]
    pub mode: Option<TravelModeArg>,

    /// Print the route as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the route command.
pub fn run(args: RouteArgs, config: &deliverytrack::config::ConfigFile) -> Result<(), CliError> {
    let router = RouteApproximator::new(config.tracking.route.clone());
    let route = if args.direct {
        router.direct_route(args.from, args.to)
    } else {
        router.campus_route(args.from, args.to)
    };

    if args.json {
        let json = serde_json::to_string_pretty(&route).map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    let mode = resolve_mode(args.mode, config);
    print_route(&route);
    println!();

    let now = Utc::now();
    println!(
        "{} {:.3} km, about {:.1} min {}",
        style("Distance:").bold(),
        route.distance_km,
        travel_time_min(route.distance_km, mode),
        style(format!("({})", mode)).dim()
    );
    println!(
        "{} {}",
        style("ETA:").bold(),
        format_eta_from(eta(now, route.distance_km, mode), now)
    );
    Ok(())
}

fn print_route(route: &Route) {
    println!(
        "{} {} -> {}",
        style("Route").cyan().bold(),
        route.from,
        route.to
    );
    for (i, waypoint) in route.waypoints.iter().enumerate() {
        match waypoint.name.as_deref() {
            Some(name) => println!(
                "  {:>2}. {}  {} {}",
                i + 1,
                waypoint.point(),
                style(name).green(),
                style(format!("[{}]", waypoint.kind)).dim()
            ),
            None => println!("  {:>2}. {}", i + 1, waypoint.point()),
        }
    }
}
