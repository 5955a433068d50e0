//! Configuration management CLI commands.
//!
//! Provides `config show`, `config init` and `config path` for inspecting
//! and creating `config.ini` from the command line.

use std::path::PathBuf;

use clap::Subcommand;
use deliverytrack::config::{config_file_path, ConfigFile};

use super::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as INI
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let path = config_path.unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Show => run_show(&path),
        ConfigCommands::Init { force } => run_init(&path, force),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn run_show(path: &std::path::Path) -> Result<(), CliError> {
    let config = load_config(Some(path))?;
    if !path.exists() {
        println!("; {} not found, showing defaults", path.display());
    }
    print!("{}", config.to_config_string());
    Ok(())
}

fn run_init(path: &std::path::Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Input(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        run(ConfigCommands::Init { force: false }, Some(path.clone())).unwrap();
        assert!(path.exists());

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.tracking.sample_capacity, 50);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[tracking]\nsample_capacity = 10\n").unwrap();

        let result = run(ConfigCommands::Init { force: false }, Some(path.clone()));
        assert!(matches!(result, Err(CliError::Input(_))));

        run(ConfigCommands::Init { force: true }, Some(path.clone())).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.tracking.sample_capacity, 50);
    }
}
