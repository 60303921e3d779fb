//! Entry point for test binaries.
//!
//! A fuzz test binary calls [`main`] with its registered tests. The same
//! binary is re-executed for every worker; the worker environment variable
//! selects worker mode before any argument parsing happens.
//!
//! ```ignore
//! fn main() -> std::process::ExitCode {
//!     chainfuzz_cli::harness::main(&[&FUZZ_TRANSFERS, &FUZZ_MINTS])
//! }
//! ```

use crate::commands::{HarnessCli, HarnessCommand};
use crate::config::CliConfig;
use crate::handlers::{execute_list, execute_run};
use crate::output::Reporter;
use chainfuzz::{run_worker_process, FuzzTest, WorkerExit, WorkerSpec};
use clap::Parser;
use std::process::ExitCode;
use tracing::error;

/// Every worker passed
pub const EXIT_SUCCESS: u8 = 0;
/// At least one worker reported a failure
pub const EXIT_TEST_FAILURE: u8 = 1;
/// The campaign could not run to completion
pub const EXIT_FATAL: u8 = 2;

/// Run as orchestrator or worker, depending on the environment
#[must_use]
pub fn main(tests: &[&FuzzTest]) -> ExitCode {
    match WorkerSpec::from_env() {
        Ok(Some((spec, control_addr))) => ExitCode::from(worker_main(tests, &spec, &control_addr)),
        Ok(None) => ExitCode::from(orchestrator_main(tests, HarnessCli::parse())),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn worker_main(tests: &[&FuzzTest], spec: &WorkerSpec, control_addr: &str) -> u8 {
    // stderr is the worker's log file unless it tees to the terminal
    CliConfig::new().apply();
    match run_worker_process(tests, spec, control_addr) {
        Ok(WorkerExit::Passed) => EXIT_SUCCESS,
        Ok(WorkerExit::Failed { .. }) => EXIT_TEST_FAILURE,
        Err(e) => {
            error!(worker = spec.index, error = %e, "worker aborted");
            EXIT_FATAL
        }
    }
}

/// Orchestrator side of [`main`], for an already parsed command line
pub fn orchestrator_main(tests: &[&FuzzTest], cli: HarnessCli) -> u8 {
    let config = cli.global.config();
    config.apply();
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());

    match cli.command {
        HarnessCommand::List => {
            execute_list(tests);
            EXIT_SUCCESS
        }
        HarnessCommand::Run(args) => match execute_run(&reporter, tests, &args) {
            Ok(report) if report.is_success() => EXIT_SUCCESS,
            Ok(_) => EXIT_TEST_FAILURE,
            Err(e) => {
                reporter.failure(&e.to_string());
                EXIT_FATAL
            }
        },
    }
}
