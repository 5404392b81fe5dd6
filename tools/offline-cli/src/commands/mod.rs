//! CLI command implementations.

pub mod config;
pub mod routes;
pub mod seed;
pub mod simulate;

use clap::{Args, Subcommand};

/// Arguments for the routes command.
#[derive(Args)]
pub struct RoutesArgs {
    /// URLs to route; relative URLs are resolved against the origin.
    #[arg(required_unless_present = "table")]
    pub urls: Vec<String>,

    /// Treat each URL as a navigation that accepts HTML.
    #[arg(long)]
    pub html: bool,

    /// Print the rule table instead of routing URLs.
    #[arg(long)]
    pub table: bool,
}

/// Arguments for the seed command.
#[derive(Args)]
pub struct SeedArgs {
    /// Print only the generation name.
    #[arg(long)]
    pub generation_only: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Validate configuration.
    Validate,
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Simulation script (TOML).
    pub script: String,

    /// Stop at the first failed request.
    #[arg(long)]
    pub fail_fast: bool,
}
