//! Chainfuzz CLI Library
//!
//! Command-line surface of Chainfuzz: the harness that turns a test binary
//! into a campaign orchestrator (and, when re-executed, into a worker), plus
//! offline coverage tooling and node checks for the `chainfuzz` binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod harness;
mod output;

pub use commands::{
    Cli, Commands, CoverageArgs, CoverageCommand, GlobalArgs, HarnessCli, HarnessCommand,
    NodeArgs, NodeCommand, RunArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{campaign_summary, Reporter};
