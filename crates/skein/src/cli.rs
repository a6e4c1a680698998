//! Command line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Skein: cluster map and wire tooling for distributed blob storage.
#[derive(Parser)]
#[command(name = "skein")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Cluster topology commands.
    Topology(TopologyCommand),
    /// Wire frame commands.
    Frame(FrameCommand),
    /// Print version information.
    Version,
}

/// Cluster topology commands.
#[derive(Args)]
pub struct TopologyCommand {
    /// Topology subcommand.
    #[command(subcommand)]
    pub command: TopologySubcommand,
}

/// Topology subcommands.
#[derive(Subcommand)]
pub enum TopologySubcommand {
    /// Check that a topology file would be accepted.
    Validate(TopologyFileArgs),
    /// Print the nodes and disks of a topology file.
    Show(ShowTopologyArgs),
}

/// Arguments naming a topology file.
#[derive(Args)]
pub struct TopologyFileArgs {
    /// JSON topology file.
    pub file: PathBuf,
}

/// Arguments for the topology show command.
#[derive(Args)]
pub struct ShowTopologyArgs {
    /// JSON topology file.
    pub file: PathBuf,

    /// Output format (text, json).
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Wire frame commands.
#[derive(Args)]
pub struct FrameCommand {
    /// Frame subcommand.
    #[command(subcommand)]
    pub command: FrameSubcommand,
}

/// Frame subcommands.
#[derive(Subcommand)]
pub enum FrameSubcommand {
    /// Decode one hex-encoded frame and print its header.
    Inspect(InspectFrameArgs),
    /// Decode every frame in a captured byte stream.
    Read(ReadFramesArgs),
    /// Wrap a hex payload in an envelope and print the frame in hex.
    Encode(EncodeFrameArgs),
}

/// Arguments for the frame inspect command.
#[derive(Args)]
pub struct InspectFrameArgs {
    /// Frame bytes in hex; whitespace is ignored.
    pub hex: String,

    /// Output format (text, json).
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the frame read command.
#[derive(Args)]
pub struct ReadFramesArgs {
    /// File holding back-to-back frames.
    pub file: PathBuf,

    /// Output format (text, json).
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the frame encode command.
#[derive(Args)]
pub struct EncodeFrameArgs {
    /// Message type code.
    #[arg(short = 't', long = "type")]
    pub type_code: u16,

    /// Payload version.
    #[arg(short, long, default_value_t = skein_wire::CURRENT_VERSION)]
    pub version: u16,

    /// Correlation id.
    #[arg(long, default_value_t = 0)]
    pub correlation_id: u32,

    /// Client id; defaults to `wire.client_id` from the configuration.
    #[arg(long)]
    pub client_id: Option<String>,

    /// Payload bytes in hex.
    #[arg(short, long, default_value = "")]
    pub payload: String,
}

/// Output format for CLI commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
