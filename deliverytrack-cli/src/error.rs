//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use deliverytrack::config::ConfigFileError;
use deliverytrack::route::RouteError;
use deliverytrack::TrackingError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Invalid command line input
    Input(String),
    /// Failed to create the Tokio runtime
    Runtime(std::io::Error),
    /// Landmark catalog could not be loaded
    Landmarks(RouteError),
    /// Tracking could not start
    Tracking(TrackingError),
    /// Failed to write output
    Output(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in config.ini or remove it to use the default.");
                eprintln!("Run 'deliverytrack config path' to locate the file.");
            }
            CliError::Landmarks(_) => {
                eprintln!();
                eprintln!("Check [route] landmarks_file in config.ini, or remove it to use the built-in campus landmarks.");
            }
            CliError::Tracking(e) => {
                eprintln!();
                eprintln!("{}", e.user_message());
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }

    fn exit_code(&self) -> i32 {
        match self {
            CliError::Input(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Input(msg) => write!(f, "{}", msg),
            CliError::Runtime(e) => write!(f, "Failed to create Tokio runtime: {}", e),
            CliError::Landmarks(e) => write!(f, "{}", e),
            CliError::Tracking(e) => write!(f, "Tracking failed: {}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Landmarks(e) => Some(e),
            CliError::Tracking(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<TrackingError> for CliError {
    fn from(e: TrackingError) -> Self {
        CliError::Tracking(e)
    }
}
