//! Chainfuzz: multi-process property-based fuzzing of smart contracts.
//!
//! A campaign runs one test function in N worker processes, each against
//! its own ephemeral development node, and collects failures and coverage
//! in the orchestrating process.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    orchestrator process                          │
//! │   Campaign ──► WorkerSpawner ──► ControlServer (loopback TCP)    │
//! │      │  ▲             │                 ▲                        │
//! │      │  └─ coverage ──┼─────────────────┤ WorkerMessage          │
//! │      └─ prompt ───────┼─ Decision ──────┤                        │
//! └───────────────────────┼─────────────────┼────────────────────────┘
//!                         ▼                 │
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  worker process #i:  node ─► ChainClient ─► FuzzTest body        │
//! │                      LogScope ─► <logs>/<module>.<test>_<i>.ansi │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use chainfuzz::prelude::*;
//!
//! #[fuzz_test]
//! fn fuzz_transfers(ctx: &mut FuzzContext, coverage: Option<CoverageProbe>) -> TestResult {
//!     let block = ctx.chain().block_number()?;
//!     ctx.watch("block", block);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod campaign;
pub mod chain;
pub mod coverage;
pub mod node;
pub mod protocol;
pub mod result;
pub mod seed;
pub mod test_fn;
pub mod worker;

pub use campaign::{
    Campaign, CampaignConfig, CampaignConfigBuilder, CampaignProgress, CampaignReport,
    DecisionPrompt, InProcessSpawner, ProcessSpawner, PromptOutcome, ScriptedPrompt,
    TerminalPrompt, WorkerOutcome, WorkerProcess, WorkerSpawner, WorkerSummary,
    DEFAULT_BASE_PORT,
};
pub use chain::{
    connect_with_retry, node_url, ChainBackend, ChainClient, ChainTransport, HttpTransport,
    LocalNodeBackend, RetryPolicy,
};
pub use coverage::{
    function_summary, merge, read_coverage_file, CoverageAggregator, CoverageProbe,
    CoverageSnapshot, FunctionCoverageRecord, IdeCoverage, IdePosition, MergedCoverage,
    FULL_COVERAGE_FILE, PER_TRANSACTION_COVERAGE_FILE,
};
pub use node::{NetworkKind, NodeHandle, NodeLauncher, NodeProcess};
pub use protocol::{
    EnvelopeOrigin, ExceptionEnvelope, Handshake, HandshakeState, OrchestratorMessage,
    StackFrame, WorkerMessage,
};
pub use result::{FuzzError, FuzzResult};
pub use seed::{pad_seeds, Seed, SEED_LEN};
pub use test_fn::{find_test, FuzzTest, IntoTestResult, TestBody, TestResult};
pub use worker::{
    run_worker, run_worker_process, FuzzContext, TestArg, TestArgs, WorkerExit, WorkerSpec,
};

#[cfg(feature = "derive")]
pub use chainfuzz_derive::fuzz_test;

/// Everything a fuzz test file usually needs
pub mod prelude {
    pub use super::coverage::{CoverageProbe, IdePosition};
    pub use super::node::NetworkKind;
    pub use super::result::{FuzzError, FuzzResult};
    pub use super::seed::Seed;
    pub use super::test_fn::{FuzzTest, TestResult};
    pub use super::worker::FuzzContext;
    pub use rand::Rng;

    #[cfg(feature = "derive")]
    pub use chainfuzz_derive::fuzz_test;
}
