//! Command-line argument parsing.

use clap::*;

use crate::config::ConfigFile;
use crate::error::ConfigError;

#[derive(Parser, Clone)]
pub struct SharedOpts {
    #[clap(short, long, help = "Configuration file")]
    pub config: Option<String>,
    #[clap(short, long, help = "Enable debug-level logging")]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the forwarder (default if no subcommand is given).
    Serve {
        #[clap(flatten)]
        sopt: SharedOpts,
    },
    /// Load and validate the configuration file, then exit without binding a socket.
    CheckConfig {
        #[clap(flatten)]
        sopt: SharedOpts,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve {
            sopt: SharedOpts {
                config: None,
                debug: false,
            },
        }
    }
}

#[derive(Parser)]
#[command(arg_required_else_help(false))]
/// A filtering DNS forwarder.
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    fn command(&self) -> Commands {
        match &self.command {
            Some(Commands::Serve { sopt }) => Commands::Serve { sopt: sopt.clone() },
            Some(Commands::CheckConfig { sopt }) => Commands::CheckConfig { sopt: sopt.clone() },
            None => Commands::default(),
        }
    }

    pub fn config_path(&self) -> Option<String> {
        match self.command() {
            Commands::Serve { sopt } | Commands::CheckConfig { sopt } => sopt.config,
        }
    }

    pub fn debug(&self) -> bool {
        match self.command() {
            Commands::Serve { sopt } | Commands::CheckConfig { sopt } => sopt.debug,
        }
    }

    pub fn is_check_config(&self) -> bool {
        matches!(self.command, Some(Commands::CheckConfig { .. }))
    }
}

/// Loads config per the resolved CLI options, reporting the same error a
/// serving run would hit, for use by the `check-config` subcommand.
pub fn check_config(cli: &Cli) -> Result<ConfigFile, ConfigError> {
    ConfigFile::try_from(cli.config_path().as_deref())
}
