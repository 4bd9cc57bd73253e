pub mod config;
pub mod credentials;
pub mod endpoints;
pub mod listen;

use clap::{Parser, Subcommand};

/// pushwire: listen to a server-push directive channel.
#[derive(Debug, Parser)]
#[command(name = "pushwire", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and print every channel event as a JSON line (default when
    /// no subcommand is given).
    Listen {
        /// Log cached, re-derived and probed liveness every N seconds.
        #[arg(long)]
        status_interval: Option<u64>,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the region table and the endpoint the current config resolves to.
    Endpoints,
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Load config from `PUSHWIRE_CONFIG` (default `pushwire.toml`).
///
/// A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(pw_domain::Config, String)> {
    let config_path =
        std::env::var("PUSHWIRE_CONFIG").unwrap_or_else(|_| "pushwire.toml".into());

    let config = pw_domain::Config::load(&config_path)
        .map_err(|e| anyhow::anyhow!("loading {config_path}: {e}"))?;

    Ok((config, config_path))
}
