//! Shamba CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the USSD gateway and the session sweeper
//! - `simulate`: Drive a registration dialogue from the terminal
//! - `config`: Show, locate or validate the configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "shamba",
    about = "Shamba USSD farmer registration service",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP USSD gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Read configuration from this file instead of ~/.shamba/config.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Simulate a handset session in the terminal
    Simulate {
        /// Phone number to present as the end user
        #[arg(long, default_value = "+254700000000")]
        phone: String,

        /// Read configuration from this file instead of ~/.shamba/config.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,

        /// Use this file instead of ~/.shamba/config.toml
        #[arg(short, long, global = true)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port, config } => commands::serve::run(port, config).await?,
        Commands::Simulate { phone, config } => commands::simulate::run(phone, config).await?,
        Commands::Config { action, config } => match action {
            ConfigAction::Show => commands::config_cmd::show(config).await?,
            ConfigAction::Path => commands::config_cmd::path(config).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config).await?,
        },
    }

    Ok(())
}
