//! Worker: runs one instance of a fuzz test against its own node.
//!
//! ```text
//! seed rng ─► launch node ─► connect (retry) ─► reset ─► open log scope
//!     ─► bind extras ─► run body ─┬─ ok ──► Exception(None), Finished
//!                                 └─ err ─► Exception(envelope), Finished
//!                                           ◄─ Decision{attach}
//!                                           [debugger]
//!                                           Finished
//! ─► stop node
//! ```

mod args;
mod capture;
mod context;
mod debugger;
mod log_scope;

pub use args::{ArgumentPlan, TestArg, TestArgs, RECOGNIZED_PARAMS};
pub use capture::catch;
pub use context::FuzzContext;
pub use debugger::DebugSession;
pub use log_scope::{log_file_name, LogMode, LogScope, LogSink, LOG_EXTENSION};

use crate::chain::{connect_with_retry, node_url, ChainBackend, LocalNodeBackend, RetryPolicy};
use crate::coverage::CoverageProbe;
use crate::node::{NetworkKind, NodeHandle};
use crate::protocol::{
    ExceptionEnvelope, Handshake, OrchestratorMessage, SocketUplink, Uplink, WorkerMessage,
};
use crate::result::{FuzzError, FuzzResult};
use crate::seed::Seed;
use crate::test_fn::{find_test, FuzzTest};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Environment variable carrying the JSON [`WorkerSpec`]
pub const WORKER_SPEC_ENV: &str = "CHAINFUZZ_WORKER_SPEC";

/// Environment variable naming the orchestrator's control socket
pub const CONTROL_ADDR_ENV: &str = "CHAINFUZZ_CONTROL_ADDR";

/// Everything a worker needs to know about its slot in the campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Worker index
    pub index: usize,
    /// Qualified name of the test to run
    pub test: String,
    /// Random seed
    pub seed: Seed,
    /// Node port
    pub port: u16,
    /// Log file
    pub log_path: PathBuf,
    /// Duplicate output to the terminal
    pub tee: bool,
    /// Node kind
    pub network: NetworkKind,
    /// Whether coverage is collected
    pub coverage: bool,
}

impl WorkerSpec {
    /// Log mode implied by `tee`
    #[must_use]
    pub fn log_mode(&self) -> LogMode {
        if self.tee {
            LogMode::Tee
        } else {
            LogMode::Redirect
        }
    }

    /// Read the worker spec and control address from the environment, if this
    /// process was spawned as a worker
    pub fn from_env() -> FuzzResult<Option<(Self, String)>> {
        let Ok(raw) = std::env::var(WORKER_SPEC_ENV) else {
            return Ok(None);
        };
        let spec: Self = serde_json::from_str(&raw)?;
        let addr = std::env::var(CONTROL_ADDR_ENV).map_err(|_| {
            FuzzError::configuration(format!("{WORKER_SPEC_ENV} is set but {CONTROL_ADDR_ENV} is not"))
        })?;
        Ok(Some((spec, addr)))
    }
}

/// How a worker ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The test body returned normally
    Passed,
    /// A failure was reported
    Failed {
        /// Whether the debugger was attached
        attached: bool,
    },
}

/// Run a worker in this process, connected to the orchestrator at `control_addr`
pub fn run_worker_process(
    tests: &[&FuzzTest],
    spec: &WorkerSpec,
    control_addr: &str,
) -> FuzzResult<WorkerExit> {
    let test = find_test(tests, &spec.test)?;
    let uplink: Arc<dyn Uplink> = Arc::new(SocketUplink::connect(control_addr, spec.index)?);
    run_worker(test, spec, uplink, &LocalNodeBackend, RetryPolicy::default())
}

/// Run one worker to completion.
///
/// The node is stopped only after the failure handshake, if any, resolved.
pub fn run_worker(
    test: &FuzzTest,
    spec: &WorkerSpec,
    uplink: Arc<dyn Uplink>,
    backend: &dyn ChainBackend,
    retry: RetryPolicy,
) -> FuzzResult<WorkerExit> {
    let name = test.qualified_name();
    debug!(worker = spec.index, seed = %spec.seed, test = %name, "worker starting");

    let mut node: Option<Box<dyn NodeHandle>> = None;
    let envelope = execute(test, spec, &uplink, backend, retry, &mut node).unwrap_or_else(|e| {
        error!(worker = spec.index, error = %e, "worker setup failed");
        Some(ExceptionEnvelope::from_harness_error(&name, &e))
    });

    let result = report(spec.index, envelope, uplink.as_ref());
    if let Some(mut node) = node {
        node.stop();
    }
    result
}

fn execute(
    test: &FuzzTest,
    spec: &WorkerSpec,
    uplink: &Arc<dyn Uplink>,
    backend: &dyn ChainBackend,
    retry: RetryPolicy,
    node_slot: &mut Option<Box<dyn NodeHandle>>,
) -> FuzzResult<Option<ExceptionEnvelope>> {
    let node = node_slot.insert(backend.launch(spec.network, spec.port)?);
    uplink.on_connection_lost(node.kill_switch());

    let chain = connect_with_retry(backend, &node_url(spec.port), retry, node.as_mut())?;
    match chain.reset(spec.network) {
        Ok(()) => {}
        Err(FuzzError::UnsupportedCapability { .. }) => {
            warn!("Development chain does not support resetting");
        }
        Err(e) => return Err(e),
    }

    let scope = LogScope::open(&spec.log_path, spec.log_mode())?;
    writeln!(
        scope.sink(),
        "chainfuzz worker #{} seed {} started {}",
        spec.index,
        spec.seed,
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
    )?;
    let plan = ArgumentPlan::resolve(test)?;
    let probe = if spec.coverage && plan.wants_coverage() {
        Some(CoverageProbe::new(chain.block_number()?, Arc::clone(uplink)))
    } else {
        None
    };
    let mut args = plan.build(probe);
    let mut ctx = FuzzContext::new(spec.index, spec.seed, chain, spec.network, scope.sink());

    let name = test.qualified_name();
    info!(test = %name, seed = %spec.seed, "running test body");
    let outcome = catch(|| (test.body)(&mut ctx, &mut args));
    drop(args);

    let envelope = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(ExceptionEnvelope::from_test_error(&name, &*e, ctx.watched())),
        Err(panic) => Some(ExceptionEnvelope::from_panic(&name, panic, ctx.watched())),
    };
    match &envelope {
        Some(envelope) => error!(%envelope, "test failed"),
        None => info!("test passed"),
    }
    scope.close();
    Ok(envelope)
}

fn report(
    index: usize,
    envelope: Option<ExceptionEnvelope>,
    uplink: &dyn Uplink,
) -> FuzzResult<WorkerExit> {
    let mut handshake = Handshake::new();
    let Some(envelope) = envelope else {
        uplink.send(WorkerMessage::Exception(None))?;
        uplink.send(WorkerMessage::Finished)?;
        handshake.finish()?;
        return Ok(WorkerExit::Passed);
    };

    handshake.raise()?;
    uplink.send(WorkerMessage::Exception(Some(envelope.clone())))?;
    uplink.send(WorkerMessage::Finished)?;
    handshake.await_decision()?;

    let attach = match uplink.recv()? {
        OrchestratorMessage::Decision { attach } => attach,
        OrchestratorMessage::Shutdown => false,
    };
    handshake.resolve(attach)?;
    debug!(worker = index, attach, "decision received");

    if attach {
        if let Err(e) = DebugSession::new(&envelope).run_on_terminal() {
            warn!(worker = index, error = %e, "debugger session ended with error");
        }
    }
    uplink.send(WorkerMessage::Finished)?;
    handshake.finish()?;
    Ok(WorkerExit::Failed { attached: attach })
}
