//! DeliveryTrack CLI - Command-line interface
//!
//! Route, ETA and landmark tools over the deliverytrack library, plus a
//! simulated end-to-end delivery.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use deliverytrack::logging::{default_log_dir, default_log_file, init_logging};

use commands::common::load_config;
use commands::config::ConfigCommands;
use commands::eta::EtaArgs;
use commands::landmarks::LandmarksArgs;
use commands::route::RouteArgs;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "deliverytrack")]
#[command(version, about = "Live delivery tracking for campus food orders", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.deliverytrack/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an approximated route between two coordinates
    Route(RouteArgs),

    /// Estimate travel time and arrival for a distance
    Eta(EtaArgs),

    /// List the campus landmark catalog
    Landmarks(LandmarksArgs),

    /// Run a simulated delivery from pickup to drop-off
    Simulate(SimulateArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Config { command } => commands::config::run(command, cli.config),
        Commands::Route(args) => commands::route::run(args, &load_config(cli.config.as_deref())?),
        Commands::Eta(args) => commands::eta::run(args, &load_config(cli.config.as_deref())?),
        Commands::Landmarks(args) => {
            commands::landmarks::run(args, &load_config(cli.config.as_deref())?)
        }
        Commands::Simulate(args) => {
            let config = load_config(cli.config.as_deref())?;
            let _guard = init_logging(&default_log_dir(), default_log_file())
                .map_err(|e| CliError::LoggingInit(e.to_string()))?;
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "DeliveryTrack simulation");
            commands::simulate::run(args, &config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "deliverytrack",
            "route",
            "--from",
            "-33.9249,18.4241",
            "--to",
            "-33.9300,18.4300",
        ])
        .unwrap();
        match cli.command {
            Commands::Route(args) => {
                assert_eq!(args.from.latitude, -33.9249);
                assert!(!args.direct);
            }
            _ => panic!("expected route command"),
        }
    }

    #[test]
    fn test_eta_requires_distance_or_points() {
        assert!(Cli::try_parse_from(["deliverytrack", "eta"]).is_err());
        assert!(Cli::try_parse_from(["deliverytrack", "eta", "--distance-km", "2.5"]).is_ok());
        assert!(Cli::try_parse_from([
            "deliverytrack",
            "eta",
            "--from",
            "36.14,-86.80",
            "--to",
            "36.15,-86.80",
            "--mode",
            "walking"
        ])
        .is_ok());
    }
}
