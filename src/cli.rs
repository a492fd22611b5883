//! Command-line interface parsing for ratechain
//!
//! This module handles parsing of CLI arguments using clap and folds the
//! command-line overrides into the loaded [`Settings`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::Settings;
use crate::data::{Base, InvalidBase};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The `--base` argument is not a usable currency code
    #[error(transparent)]
    InvalidBase(#[from] InvalidBase),
}

/// ratechain - exchange rates through a memory -> file -> remote cache chain
#[derive(Parser, Debug)]
#[command(name = "ratechain")]
#[command(about = "Exchange rates served through a memory, file and remote cache chain")]
#[command(version)]
pub struct Cli {
    /// Path to a YAML config file (default: ./ratechain.yaml if present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Open Exchange Rates app id
    #[arg(long, global = true, env = "OPENEXCHANGERATES_APP_ID", hide_env_values = true)]
    pub app_id: Option<String>,

    /// Template path for the per-currency cache files
    ///
    /// Files are written next to it as <name>-<base>.json
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve rates once and print them as JSON
    ///
    /// Examples:
    ///   ratechain get              # USD rates
    ///   ratechain get --base eur   # EUR rates
    Get {
        /// Base currency (default: USD)
        #[arg(short, long, value_name = "CODE")]
        base: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Serve GET /api/exchange-rates over HTTP
    Serve {
        /// Address to bind, e.g. 127.0.0.1:8080
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },
}

impl Cli {
    /// Applies command-line overrides on top of loaded settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(app_id) = &self.app_id {
            settings.app_id = app_id.clone();
        }
        if let Some(cache_file) = &self.cache_file {
            settings.cache_file = Some(cache_file.clone());
        }
        if let Command::Serve {
            listen: Some(listen),
        } = &self.command
        {
            settings.listen = listen.clone();
        }
    }
}

/// Parses the `--base` argument of `get`.
///
/// # Returns
/// * `Ok(Base)` - Normalized code, `USD` when absent
/// * `Err(CliError::InvalidBase)` - If the code contains anything but letters and digits
pub fn parse_base_arg(base: Option<&str>) -> Result<Base, CliError> {
    Ok(Base::parse(base)?)
}
