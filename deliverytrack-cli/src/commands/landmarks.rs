//! `landmarks` command: list the campus landmark catalog.

use std::path::PathBuf;

use clap::Args;
use console::style;
use deliverytrack::config::ConfigFile;
use deliverytrack::route::{LandmarkCatalog, WaypointKind};

use crate::error::CliError;

/// Arguments for `deliverytrack landmarks`.
#[derive(Debug, Args)]
pub struct LandmarksArgs {
    /// JSON catalog to list instead of the configured one
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Only list landmarks of this kind
    #[arg(long, value_parser = parse_kind)]
    pub kind: Option<WaypointKind>,
}

fn parse_kind(s: &str) -> Result<WaypointKind, String> {
    match s.trim().to_lowercase().as_str() {
        "restaurant" => Ok(WaypointKind::Restaurant),
        "dorm" => Ok(WaypointKind::Dorm),
        "intersection" => Ok(WaypointKind::Intersection),
        other => Err(format!(
            "unknown kind '{}' (expected restaurant, dorm or intersection)",
            other
        )),
    }
}

/// Run the landmarks command.
pub fn run(args: LandmarksArgs, config: &ConfigFile) -> Result<(), CliError> {
    let source = args.file.or_else(|| config.tracking.route.landmarks_file.clone());
    let (catalog, label) = match source {
        Some(path) => {
            let label = path.display().to_string();
            (LandmarkCatalog::from_file(path), label)
        }
        None => (LandmarkCatalog::builtin(), "built-in campus catalog".to_string()),
    };

    let landmarks = catalog.load().map_err(CliError::Landmarks)?;
    let shown: Vec<_> = landmarks
        .iter()
        .filter(|w| args.kind.map_or(true, |kind| w.kind == kind))
        .collect();

    println!(
        "{} {}",
        style(format!("{} landmarks", shown.len())).cyan().bold(),
        style(format!("({})", label)).dim()
    );
    for waypoint in shown {
        println!(
            "  {:<28} {:<14} {}",
            waypoint.name.as_deref().unwrap_or("(unnamed)"),
            waypoint.kind.to_string(),
            waypoint.point()
        );
    }
    Ok(())
}
