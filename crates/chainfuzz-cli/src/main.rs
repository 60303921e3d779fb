//! Chainfuzz CLI: coverage files and development nodes
//!
//! ## Usage
//!
//! ```bash
//! chainfuzz coverage merge a.cov b.cov -o merged.cov   # Merge coverage files
//! chainfuzz coverage summary chainfuzz-coverage.cov    # Hits per function
//! chainfuzz node check --network anvil --port 8545     # Start, connect, stop
//! chainfuzz node list                                  # Supported node kinds
//! ```
//!
//! Campaigns themselves run from test binaries built on
//! `chainfuzz_cli::harness::main`.

use chainfuzz_cli::{
    handlers::{execute_check, execute_list_networks, execute_merge, execute_summary},
    Cli, CliResult, Commands, CoverageCommand, NodeCommand, Reporter,
};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = cli.global.config();
    config.apply();
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());

    match cli.command {
        Commands::Coverage(args) => match args.command {
            CoverageCommand::Merge { files, output } => execute_merge(&reporter, &files, &output),
            CoverageCommand::Summary { file } => execute_summary(&file),
        },
        Commands::Node(args) => match args.command {
            NodeCommand::Check { network, port } => {
                execute_check(&reporter, network, port).map(|_| ())
            }
            NodeCommand::List => {
                execute_list_networks();
                Ok(())
            }
        },
    }
}
