//! Skein: operator tooling for distributed blob-storage cluster maps and
//! inter-node wire frames.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use skein_core::{Config, LogFormat};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod frame_cli;
mod topology_cli;

use cli::{Cli, Commands, FrameSubcommand, TopologySubcommand};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config);
    debug!(config = ?cli.config, "Loaded configuration");

    match cli.command {
        Commands::Topology(cmd) => match cmd.command {
            TopologySubcommand::Validate(args) => topology_cli::handle_validate(args, &config),
            TopologySubcommand::Show(args) => topology_cli::handle_show(args, &config),
        },
        Commands::Frame(cmd) => match cmd.command {
            FrameSubcommand::Inspect(args) => frame_cli::handle_inspect(args),
            FrameSubcommand::Read(args) => frame_cli::handle_read(args, &config).await,
            FrameSubcommand::Encode(args) => frame_cli::handle_encode(args, &config),
        },
        Commands::Version => {
            println!("skein {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    // Command output goes to stdout; keep it clean.
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(filter).with(fmt_layer.json()).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
    }
}
