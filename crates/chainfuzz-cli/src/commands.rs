//! CLI command definitions using clap

use crate::config::{CliConfig, ColorChoice, Verbosity};
use chainfuzz::{NetworkKind, Seed, DEFAULT_BASE_PORT};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Flags shared by every entry point
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    pub color: ColorChoice,
}

impl GlobalArgs {
    /// Configuration implied by the flags
    #[must_use]
    pub fn config(&self) -> CliConfig {
        CliConfig::new()
            .with_verbosity(Verbosity::from_flags(self.quiet, self.verbose))
            .with_color(self.color)
    }
}

/// Chainfuzz: coverage tooling and node checks for fuzz campaigns
#[derive(Parser, Debug)]
#[command(name = "chainfuzz")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Global flags
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Work with coverage files written by campaigns
    Coverage(CoverageArgs),

    /// Development node utilities
    Node(NodeArgs),
}

/// Arguments for the coverage command
#[derive(Args, Debug)]
pub struct CoverageArgs {
    /// Coverage subcommand
    #[command(subcommand)]
    pub command: CoverageCommand,
}

/// Coverage subcommands
#[derive(Subcommand, Debug)]
pub enum CoverageCommand {
    /// Merge coverage files into one
    Merge {
        /// Coverage files to merge
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show hit counts per function
    Summary {
        /// Coverage file
        file: PathBuf,
    },
}

/// Arguments for the node command
#[derive(Args, Debug)]
pub struct NodeArgs {
    /// Node subcommand
    #[command(subcommand)]
    pub command: NodeCommand,
}

/// Node subcommands
#[derive(Subcommand, Debug)]
pub enum NodeCommand {
    /// Start a node, connect to it, print its block number and stop it
    Check {
        /// Node kind (anvil, ganache, hardhat)
        #[arg(long, default_value = "anvil", value_parser = parse_network)]
        network: NetworkKind,

        /// Port to bind
        #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
        port: u16,
    },

    /// List supported node kinds
    List,
}

/// Command line of a test binary built on the harness
#[derive(Parser, Debug)]
#[command(author, version, about = "Run Chainfuzz fuzz tests", long_about = None)]
pub struct HarnessCli {
    /// Global flags
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: HarnessCommand,
}

/// Harness subcommands
#[derive(Subcommand, Debug)]
pub enum HarnessCommand {
    /// List registered fuzz tests
    List,

    /// Run a fuzz campaign
    Run(RunArgs),
}

/// Arguments for a campaign run
#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Test to run, bare or module-qualified
    pub test: String,

    /// Number of worker processes
    #[arg(short = 'n', long, default_value_t = 1)]
    pub processes: usize,

    /// Seed for the next worker, as hex (repeatable)
    #[arg(long = "seed", value_parser = parse_seed)]
    pub seeds: Vec<Seed>,

    /// Directory receiving worker logs
    #[arg(long, default_value = ".chainfuzz-logs")]
    pub logs_dir: PathBuf,

    /// Only worker #0 talks to the terminal
    #[arg(long)]
    pub passive: bool,

    /// Node kind (anvil, ganache, hardhat)
    #[arg(long, default_value = "anvil", value_parser = parse_network)]
    pub network: NetworkKind,

    /// Number of workers collecting coverage
    #[arg(long, default_value_t = 0)]
    pub coverage: usize,

    /// Show per-function hit counts under the progress line
    #[arg(long)]
    pub verbose_coverage: bool,

    /// Port of worker #0's node
    #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
    pub base_port: u16,

    /// Directory receiving coverage files
    #[arg(long, default_value = ".")]
    pub coverage_dir: PathBuf,

    /// Detach if the attach prompt is not answered within this many seconds
    #[arg(long)]
    pub decision_timeout: Option<u64>,
}

fn parse_network(value: &str) -> Result<NetworkKind, String> {
    value.parse().map_err(|e: chainfuzz::FuzzError| e.to_string())
}

fn parse_seed(value: &str) -> Result<Seed, String> {
    Seed::from_hex(value).map_err(|e| e.to_string())
}
